//! Tests for the controller event hub
//!
//! These exercise the wait/signal discipline with real threads: interrupt
//! delivery, exception priority, single-slot back-pressure, and utility
//! thread registration.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ouro_core::controller::{run_utility_thread, EventHub, Interrupter};
use ouro_core::error::OuroError;
use ouro_core::types::{DebugEvent, Exception, ExceptionKind, ThreadId};

fn fake_exception(thread: u64, word: u64) -> Exception
{
    Exception {
        thread: ThreadId::from(thread),
        kind: ExceptionKind::Breakpoint,
        data: vec![word],
    }
}

#[test]
fn test_interrupt_wakes_waiting_controller()
{
    let _ = ouro_utils::init_logging();

    let hub = Arc::new(EventHub::new());
    let counter = Arc::new(AtomicUsize::new(0));

    let waiter_hub = Arc::clone(&hub);
    let waiter = thread::spawn(move || waiter_hub.wait_for_event());

    let interrupt_counter = Arc::clone(&counter);
    hub.post_interrupt(move || {
        interrupt_counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    let event = waiter.join().unwrap().unwrap();
    assert_eq!(event, DebugEvent::Interrupted);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_exception_takes_priority_over_pending_interrupt()
{
    let hub = EventHub::new();
    assert!(hub.deposit_exception(fake_exception(7, 0xbeef)));
    hub.post_interrupt(|| {}).unwrap();

    // The exception is drained first; the interrupt survives for the next
    // call.
    let event = hub.wait_for_event().unwrap();
    match event {
        DebugEvent::Exception(exception) => {
            assert_eq!(exception.thread, ThreadId::from(7));
            assert_eq!(exception.kind, ExceptionKind::Breakpoint);
            assert_eq!(exception.data, vec![0xbeef]);
        }
        DebugEvent::Interrupted => panic!("exception should have priority"),
    }

    assert_eq!(hub.wait_for_event().unwrap(), DebugEvent::Interrupted);
}

#[test]
fn test_single_slot_back_pressure_blocks_second_deposit()
{
    let hub = Arc::new(EventHub::new());
    assert!(hub.deposit_exception(fake_exception(1, 100)));

    let (done_tx, done_rx) = mpsc::channel();
    let depositor_hub = Arc::clone(&hub);
    let depositor = thread::spawn(move || {
        let accepted = depositor_hub.deposit_exception(fake_exception(1, 200));
        done_tx.send(accepted).unwrap();
    });

    // The slot is full, so the second deposit must still be blocked.
    assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());

    // Draining the first event unblocks the depositor; order is preserved.
    let first = hub.wait_for_event().unwrap();
    assert_eq!(first, DebugEvent::Exception(fake_exception(1, 100)));
    assert!(done_rx.recv_timeout(Duration::from_secs(5)).unwrap());

    let second = hub.wait_for_event().unwrap();
    assert_eq!(second, DebugEvent::Exception(fake_exception(1, 200)));
    depositor.join().unwrap();
}

#[test]
fn test_interrupt_handler_runs_on_interrupt_path_only()
{
    let hub = EventHub::new();
    hub.post_interrupt(|| {}).unwrap();

    let mut handler_ran = false;
    let event = hub.wait_for_event_with(|| handler_ran = true).unwrap();
    assert_eq!(event, DebugEvent::Interrupted);
    assert!(handler_ran);

    // On the exception path the handler must not run.
    assert!(hub.deposit_exception(fake_exception(2, 0)));
    let mut handler_ran = false;
    let event = hub.wait_for_event_with(|| handler_ran = true).unwrap();
    assert!(matches!(event, DebugEvent::Exception(_)));
    assert!(!handler_ran);
}

#[test]
fn test_slot_reusable_after_drain()
{
    let hub = EventHub::new();
    assert!(hub.deposit_exception(fake_exception(3, 1)));
    assert!(matches!(hub.wait_for_event().unwrap(), DebugEvent::Exception(_)));
    // The slot is empty again; a new deposit must not block.
    assert!(hub.deposit_exception(fake_exception(3, 2)));
    assert!(matches!(hub.wait_for_event().unwrap(), DebugEvent::Exception(_)));
}

#[test]
fn test_utility_thread_registers_before_spawner_returns()
{
    let hub = Arc::new(EventHub::new());

    let handle = run_utility_thread(&hub, |interrupter: Interrupter| {
        while !interrupter.stop_requested() {
            thread::sleep(Duration::from_millis(5));
        }
    })
    .unwrap();

    // By the time the call returns the id is known, so enumeration can
    // exclude the utility thread.
    assert!(hub.utility_thread().is_some());

    // The registration itself is an interrupt.
    assert_eq!(hub.wait_for_event().unwrap(), DebugEvent::Interrupted);

    hub.request_shutdown();
    handle.join().unwrap();
}

#[test]
fn test_utility_thread_can_interrupt_controller()
{
    let hub = Arc::new(EventHub::new());
    let counter = Arc::new(AtomicUsize::new(0));

    // The worker holds its interrupt until the registration interrupt has
    // been observed, so the two wake-ups cannot coalesce.
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let worker_counter = Arc::clone(&counter);
    let handle = run_utility_thread(&hub, move |interrupter: Interrupter| {
        go_rx.recv().unwrap();
        interrupter
            .send_interrupt(move || {
                worker_counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    })
    .unwrap();

    assert_eq!(hub.wait_for_event().unwrap(), DebugEvent::Interrupted);
    go_tx.send(()).unwrap();
    assert_eq!(hub.wait_for_event().unwrap(), DebugEvent::Interrupted);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    handle.join().unwrap();
}

#[test]
fn test_interrupter_faults_after_teardown()
{
    let hub = Arc::new(EventHub::new());
    let interrupter = Interrupter::new(&hub);
    drop(hub);

    let err = interrupter.send_interrupt(|| {}).unwrap_err();
    assert!(matches!(err, OuroError::ControllerGone));
    assert!(interrupter.stop_requested());
}

#[test]
fn test_shutdown_rejects_blocked_deposit()
{
    let hub = Arc::new(EventHub::new());
    assert!(hub.deposit_exception(fake_exception(4, 0)));

    let depositor_hub = Arc::clone(&hub);
    let depositor = thread::spawn(move || depositor_hub.deposit_exception(fake_exception(4, 1)));

    // Let the depositor block on the full slot, then shut down.
    thread::sleep(Duration::from_millis(50));
    hub.request_shutdown();

    assert!(!depositor.join().unwrap());
}

#[test]
fn test_exceptions_drain_in_deposit_order()
{
    let hub = Arc::new(EventHub::new());

    let depositor_hub = Arc::clone(&hub);
    let depositor = thread::spawn(move || {
        for word in 0..8u64 {
            if !depositor_hub.deposit_exception(fake_exception(9, word)) {
                return;
            }
        }
    });

    for expected in 0..8u64 {
        match hub.wait_for_event().unwrap() {
            DebugEvent::Exception(exception) => assert_eq!(exception.data, vec![expected]),
            DebugEvent::Interrupted => panic!("no interrupts were posted"),
        }
    }
    depositor.join().unwrap();
}
