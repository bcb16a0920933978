use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use eventkit_core::{EventLoop, LoopConfig, QueueError, QueueFullPolicy, TimerMode};
use proptest::prelude::*;

use super::watchdog;

/// Fill a queue before `run`, then drain it through a subscription
fn drain_in_order(capacity: usize, values: Vec<i64>) -> Vec<i64> {
    let mut ev = EventLoop::new();
    let queue = ev.queue::<i64>(capacity).unwrap();
    for v in &values {
        queue.try_send(*v).unwrap();
    }

    let received = Rc::new(RefCell::new(Vec::new()));
    let out = received.clone();
    let expected = values.len();
    ev.subscribe(&queue.input(), (), move |turn, v, ()| {
        out.borrow_mut().push(v);
        if out.borrow().len() == expected {
            turn.stop();
        }
        Ok(None)
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    let result = received.borrow().clone();
    result
}

#[test]
fn test_full_queue_drains_fifo() {
    let values: Vec<i64> = (0..8).map(|i| i * 3).collect();
    assert_eq!(drain_in_order(8, values.clone()), values);
}

#[test]
fn test_readiness_tracks_length() {
    let mut ev = EventLoop::new();
    let queue = ev.queue::<u8>(4).unwrap();

    assert!(!queue.is_ready());
    assert!(queue.is_empty());
    assert_eq!(ev.pending_items(queue.input().id()), 0);

    queue.try_send(1).unwrap();
    assert!(queue.is_ready());
    assert_eq!(queue.len(), 1);
    assert_eq!(ev.pending_items(queue.input().id()), 1);
}

#[test]
fn test_readiness_drops_once_drained() {
    let mut ev = EventLoop::new();
    let queue = ev.queue::<u8>(4).unwrap();
    queue.try_send(1).unwrap();
    queue.try_send(2).unwrap();

    let observer = queue.clone();
    let lengths = Rc::new(RefCell::new(Vec::new()));
    let out = lengths.clone();
    ev.subscribe(&queue.input(), (), move |turn, _, ()| {
        out.borrow_mut().push((observer.len(), observer.is_ready()));
        if observer.is_empty() {
            turn.stop();
        }
        Ok(None)
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    assert_eq!(*lengths.borrow(), vec![(1, true), (0, false)]);
}

#[test]
fn test_try_send_on_full_queue_fails() {
    let mut ev = EventLoop::new();
    let queue = ev.queue::<u8>(2).unwrap();
    queue.try_send(1).unwrap();
    queue.try_send(2).unwrap();

    assert_eq!(queue.try_send(3), Err(QueueError::Full { capacity: 2 }));
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_reject_policy_send_fails_without_blocking() {
    let config = LoopConfig {
        queue_full_policy: QueueFullPolicy::Reject,
        ..LoopConfig::default()
    };
    let mut ev = EventLoop::with_config(config).unwrap();
    let queue = ev.queue::<u8>(1).unwrap();

    queue.send(1).unwrap();
    assert_eq!(queue.send(2), Err(QueueError::Full { capacity: 1 }));
}

#[test]
fn test_send_from_loop_thread_on_full_queue_fails() {
    let mut ev = EventLoop::new();
    let queue = ev.queue::<u32>(2).unwrap();
    let tick = ev.timer(TimerMode::Oneshot, 1).unwrap();

    let results = Rc::new(RefCell::new(Vec::new()));
    let out = results.clone();
    let tx = queue.sender();
    ev.subscribe(&tick, (), move |turn, (), ()| {
        for i in 0..3 {
            out.borrow_mut().push(tx.send(i));
        }
        turn.stop();
        Ok(None)
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    assert_eq!(
        *results.borrow(),
        vec![Ok(()), Ok(()), Err(QueueError::Full { capacity: 2 })]
    );
}

#[test]
fn test_send_before_run_on_full_queue_fails() {
    // Run on a fresh thread so a regression hangs that thread, not the suite
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut ev = EventLoop::new();
        let queue = ev.queue::<u32>(1).unwrap();
        let first = queue.send(1);
        let second = queue.send(2);
        let _ = tx.send((first, second, queue.len()));
    });

    let (first, second, len) = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("send on a full queue blocked the setup thread");
    assert_eq!(first, Ok(()));
    assert_eq!(second, Err(QueueError::Full { capacity: 1 }));
    assert_eq!(len, 1);
}

#[test]
fn test_send_timeout_accepts_unbounded_duration() {
    let mut ev = EventLoop::new();
    let queue = ev.queue::<u32>(4).unwrap();

    assert_eq!(queue.send_timeout(1, Duration::MAX), Ok(()));
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_queue_closed_after_teardown() {
    let mut ev = EventLoop::new();
    let queue = ev.queue::<u8>(4).unwrap();
    let tick = ev.timer(TimerMode::Oneshot, 1).unwrap();
    ev.subscribe(&tick, (), |turn, (), ()| {
        turn.stop();
        Ok(None)
    })
    .unwrap();

    ev.run().unwrap();
    assert!(queue.sender().is_closed());
    assert_eq!(queue.send(1), Err(QueueError::Closed));
    assert_eq!(queue.try_send(1), Err(QueueError::Closed));
}

#[test]
fn test_dropping_unrun_loop_closes_queues() {
    let mut ev = EventLoop::new();
    let queue = ev.queue::<u8>(4).unwrap();
    drop(ev);

    assert_eq!(queue.send(1), Err(QueueError::Closed));
}

#[test]
fn test_items_wait_for_a_subscriber() {
    let mut ev = EventLoop::new();
    let queue = ev.queue::<&'static str>(4).unwrap();
    queue.try_send("early").unwrap();

    // Nobody listens on the queue until the oneshot fires
    let later = ev.timer(TimerMode::Oneshot, 10).unwrap();
    let received = Rc::new(RefCell::new(Vec::new()));
    let out = received.clone();
    let input = queue.input();
    ev.subscribe(&later, (), move |turn, (), ()| {
        let out = out.clone();
        turn.subscribe(&input, (), move |turn, item, ()| {
            out.borrow_mut().push(item);
            turn.stop();
            Ok(None)
        })?;
        Ok(None)
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    assert_eq!(*received.borrow(), vec!["early"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_queue_is_fifo(values in proptest::collection::vec(any::<i64>(), 1..32)) {
        let capacity = values.len();
        prop_assert_eq!(drain_in_order(capacity, values.clone()), values);
    }
}
