use std::cell::RefCell;
use std::rc::Rc;

use eventkit_core::{EventLoop, LoopState, SubscriptionHandle, TimerMode};

use super::{stop_after, watchdog};

#[test]
fn test_argument_threading_observes_k() {
    let mut ev = EventLoop::new();
    let observed = Rc::new(RefCell::new(Vec::new()));

    let tick = ev.timer(TimerMode::Periodic, 1).unwrap();
    let log = observed.clone();
    ev.subscribe(&tick, 0u64, move |turn, (), x| {
        log.borrow_mut().push(x);
        if x == 5 {
            turn.stop();
        }
        Ok(Some(x + 1))
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    assert_eq!(*observed.borrow(), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_returning_none_keeps_state() {
    let mut ev = EventLoop::new();
    let observed = Rc::new(RefCell::new(Vec::new()));

    let tick = ev.timer(TimerMode::Periodic, 1).unwrap();
    let log = observed.clone();
    ev.subscribe(&tick, (0u32, 0u32), move |turn, (), (calls, x)| {
        log.borrow_mut().push(x);
        if calls == 3 {
            turn.stop();
        }
        // Only odd calls advance `x`
        if calls % 2 == 1 {
            Ok(Some((calls + 1, x + 10)))
        } else {
            Ok(Some((calls + 1, x)))
        }
    })
    .unwrap();

    let unchanged = Rc::new(RefCell::new(Vec::new()));
    let log = unchanged.clone();
    ev.subscribe(&tick, String::from("fixed"), move |_, (), label| {
        log.borrow_mut().push(label);
        Ok(None)
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    assert_eq!(*observed.borrow(), vec![0, 0, 10, 10]);
    assert!(unchanged.borrow().iter().all(|label| label == "fixed"));
    assert_eq!(unchanged.borrow().len(), 4);
}

#[test]
fn test_two_subscriptions_fire_in_registration_order() {
    let mut ev = EventLoop::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let tick = ev.timer(TimerMode::Periodic, 1).unwrap();

    let out = log.clone();
    ev.subscribe(&tick, 100u32, move |_, (), n| {
        out.borrow_mut().push(("a", n));
        Ok(Some(n + 1))
    })
    .unwrap();

    let out = log.clone();
    ev.subscribe(&tick, 0u32, move |turn, (), n| {
        out.borrow_mut().push(("b", n));
        if n == 2 {
            turn.stop();
        }
        Ok(Some(n + 1))
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    assert_eq!(
        *log.borrow(),
        vec![("a", 100), ("b", 0), ("a", 101), ("b", 1), ("a", 102), ("b", 2)]
    );
}

#[test]
fn test_cancel_skips_invocation_pending_in_same_turn() {
    let mut ev = EventLoop::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let tick = ev.timer(TimerMode::Periodic, 1).unwrap();
    let victim: Rc<RefCell<Option<SubscriptionHandle>>> = Rc::new(RefCell::new(None));

    let out = log.clone();
    let target = victim.clone();
    ev.subscribe(&tick, 0u32, move |turn, (), n| {
        out.borrow_mut().push("first");
        if n == 1 {
            if let Some(handle) = *target.borrow() {
                assert!(turn.cancel(handle));
            }
        }
        if n == 3 {
            turn.stop();
        }
        Ok(Some(n + 1))
    })
    .unwrap();

    let out = log.clone();
    let handle = ev
        .subscribe(&tick, (), move |_, (), ()| {
            out.borrow_mut().push("second");
            Ok(None)
        })
        .unwrap();
    *victim.borrow_mut() = Some(handle);
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    // Turn 0 runs both; from turn 1 on only the first survives
    assert_eq!(
        *log.borrow(),
        vec!["first", "second", "first", "first", "first"]
    );
}

#[test]
fn test_subscription_added_mid_turn_waits_for_next_firing() {
    let mut ev = EventLoop::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let tick = ev.timer(TimerMode::Periodic, 1).unwrap();
    let out = log.clone();
    ev.subscribe(&tick, 0u32, move |turn, (), n| {
        out.borrow_mut().push(format!("outer {}", n));
        if n == 0 {
            let inner = out.clone();
            turn.subscribe(&tick, (), move |_, (), ()| {
                inner.borrow_mut().push("inner".to_string());
                Ok(None)
            })?;
        }
        if n == 1 {
            turn.stop();
        }
        Ok(Some(n + 1))
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    assert_eq!(*log.borrow(), vec!["outer 0", "outer 1", "inner"]);
}

#[test]
fn test_turn_exposes_own_handle() {
    let mut ev = EventLoop::new();
    let tick = ev.timer(TimerMode::Oneshot, 1).unwrap();
    let seen = Rc::new(RefCell::new(None));

    let out = seen.clone();
    let handle = ev
        .subscribe(&tick, (), move |turn, (), ()| {
            *out.borrow_mut() = Some((turn.subscription(), turn.contract(), turn.state()));
            turn.stop();
            Ok(None)
        })
        .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    let (own, contract, state) = (*seen.borrow()).expect("callback ran");
    assert_eq!(own, handle);
    assert_eq!(contract, tick.id());
    assert_eq!(state, LoopState::Dispatching);
}

#[test]
fn test_stop_before_run_returns_immediately() {
    let mut ev = EventLoop::new();
    let tick = ev.timer(TimerMode::Periodic, 1).unwrap();
    ev.subscribe(&tick, (), |_, (), ()| anyhow::bail!("must not run"))
        .unwrap();

    ev.stop();
    assert!(ev.is_stopping());
    let summary = ev.run().unwrap();
    assert_eq!(summary.turns, 0);
    assert_eq!(summary.invocations, 0);
}

#[test]
fn test_summary_counts_turns_and_invocations() {
    let mut ev = EventLoop::new();
    let tick = ev.timer(TimerMode::Periodic, 1).unwrap();

    ev.subscribe(&tick, 0u32, |turn, (), n| {
        if n == 4 {
            turn.stop();
        }
        Ok(Some(n + 1))
    })
    .unwrap();
    ev.subscribe(&tick, (), |_, (), ()| Ok(None)).unwrap();
    stop_after(&mut ev, 1500);

    let summary = ev.run().unwrap();
    assert_eq!(summary.turns, 5);
    assert_eq!(summary.invocations, 10);
}

#[test]
fn test_handle_cancel_outside_run() {
    let mut ev = EventLoop::new();
    let tick = ev.timer(TimerMode::Periodic, 1).unwrap();
    let handle = ev.subscribe(&tick, (), |_, (), ()| Ok(None)).unwrap();

    assert_eq!(ev.subscription_count(), 1);
    assert!(handle.cancel(&mut ev));
    assert!(!handle.cancel(&mut ev));
    assert!(!ev.is_active(handle));
    assert_eq!(ev.subscription_count(), 0);
}
