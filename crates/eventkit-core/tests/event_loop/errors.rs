use std::cell::Cell;
use std::rc::Rc;

use eventkit_core::{ContractKind, EventLoop, LoopConfig, LoopError, TimerMode};

use super::watchdog;

#[test]
fn test_zero_interval_rejected() {
    let mut ev = EventLoop::new();
    for mode in [TimerMode::Oneshot, TimerMode::Periodic] {
        let err = ev.timer(mode, 0).unwrap_err();
        assert!(matches!(err, LoopError::InvalidInterval { interval_ms: 0 }));
        assert!(err.is_config_error());
    }
    assert_eq!(ev.contract_count(), 0);
}

#[test]
fn test_invalid_capacity_rejected() {
    let mut ev = EventLoop::new();

    let err = ev.queue::<u8>(0).unwrap_err();
    assert!(matches!(err, LoopError::InvalidCapacity { capacity: 0, .. }));

    let too_big = ev.config().max_queue_capacity + 1;
    let err = ev.queue::<u8>(too_big).unwrap_err();
    assert!(matches!(err, LoopError::InvalidCapacity { capacity, .. } if capacity == too_big));

    let err = ev.signal_with_backlog::<u8>(0).unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn test_foreign_contract_rejected() {
    let mut first = EventLoop::new();
    let mut second = EventLoop::new();

    let tick = first.timer(TimerMode::Periodic, 10).unwrap();
    let err = second.subscribe(&tick, (), |_, (), ()| Ok(None)).unwrap_err();

    assert!(matches!(err, LoopError::ForeignContract { contract } if contract == tick.id()));
    assert_eq!(second.subscription_count(), 0);
    assert_eq!(second.contract_kind(tick.id()), None);
    assert_eq!(first.contract_kind(tick.id()), Some(ContractKind::Timer));
}

#[test]
fn test_subscription_limit() {
    let config = LoopConfig {
        max_subscriptions: 2,
        ..LoopConfig::default()
    };
    let mut ev = EventLoop::with_config(config).unwrap();
    let tick = ev.timer(TimerMode::Periodic, 10).unwrap();

    let first = ev.subscribe(&tick, (), |_, (), ()| Ok(None)).unwrap();
    ev.subscribe(&tick, (), |_, (), ()| Ok(None)).unwrap();
    let err = ev.subscribe(&tick, (), |_, (), ()| Ok(None)).unwrap_err();
    assert!(matches!(err, LoopError::SubscriptionLimit { limit: 2 }));

    ev.cancel(first);
    assert!(ev.subscribe(&tick, (), |_, (), ()| Ok(None)).is_ok());
}

#[test]
fn test_invalid_config_rejected() {
    let config = LoopConfig {
        max_subscriptions: 0,
        ..LoopConfig::default()
    };
    let err = EventLoop::with_config(config).unwrap_err();
    assert!(matches!(err, LoopError::InvalidConfig { .. }));
}

#[test]
fn test_callback_error_terminates_loop() {
    let mut ev = EventLoop::new();
    let later_calls = Rc::new(Cell::new(0u32));

    let tick = ev.timer(TimerMode::Periodic, 1).unwrap();
    let failing = ev
        .subscribe(&tick, 0u32, |_, (), n| {
            if n == 2 {
                anyhow::bail!("sensor read failed");
            }
            Ok(Some(n + 1))
        })
        .unwrap();

    // Registered after the failing one, so it never sees the failing turn
    let seen = later_calls.clone();
    ev.subscribe(&tick, (), move |_, (), ()| {
        seen.set(seen.get() + 1);
        Ok(None)
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    let err = ev.run().unwrap_err();
    assert!(err.is_callback_error());
    match err {
        LoopError::Callback {
            subscription,
            source,
        } => {
            assert_eq!(subscription, failing.id());
            assert_eq!(source.to_string(), "sensor read failed");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(later_calls.get(), 2);
}

#[test]
fn test_stale_handle_is_harmless() {
    let mut ev = EventLoop::new();
    let tick = ev.timer(TimerMode::Periodic, 1).unwrap();

    let first = ev
        .subscribe(&tick, (), |turn, (), ()| {
            turn.cancel_self();
            Ok(None)
        })
        .unwrap();

    let outcome = Rc::new(Cell::new(None));
    let out = outcome.clone();
    ev.subscribe(&tick, 0u32, move |turn, (), n| {
        if n == 1 {
            // `first` was reclaimed after turn 0, so this may reuse its slot
            let replacement = turn.subscribe(&tick, (), |_, (), ()| Ok(None))?;
            let cancelled_stale = turn.cancel(first);
            out.set(Some((cancelled_stale, turn.is_active(replacement))));
            turn.stop();
        }
        Ok(Some(n + 1))
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    assert_eq!(outcome.get(), Some((false, true)));
}
