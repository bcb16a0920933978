use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use eventkit_core::{ContractKind, EventLoop, LoopError, Scheduler, TimerMode};

use super::{stop_after, watchdog};

#[test]
fn test_periodic_cancelled_after_n_firings() {
    for n in [1u32, 3, 7] {
        let mut ev = EventLoop::new();
        let firings = Rc::new(Cell::new(0u32));

        let tick = ev.timer(TimerMode::Periodic, 2).unwrap();
        let seen = firings.clone();
        ev.subscribe(&tick, 0u32, move |turn, (), count| {
            seen.set(seen.get() + 1);
            let count = count + 1;
            if count == n {
                turn.cancel_self();
            }
            Ok(Some(count))
        })
        .unwrap();

        // Leave room for several more periods after the cancel
        stop_after(&mut ev, 2 * u64::from(n) + 40);
        watchdog(&mut ev, 2000);

        ev.run().unwrap();
        assert_eq!(firings.get(), n, "expected exactly {} firings", n);
    }
}

#[test]
fn test_oneshot_fires_once() {
    let mut ev = EventLoop::new();
    let firings = Rc::new(Cell::new(0u32));

    let once = ev.timer(TimerMode::Oneshot, 1).unwrap();
    let seen = firings.clone();
    ev.subscribe(&once, (), move |_, (), ()| {
        seen.set(seen.get() + 1);
        Ok(None)
    })
    .unwrap();
    assert!(ev.is_timer_armed(once.id()));

    stop_after(&mut ev, 30);
    watchdog(&mut ev, 2000);
    ev.run().unwrap();

    assert_eq!(firings.get(), 1);
}

#[test]
fn test_timer_does_not_fire_early() {
    let mut ev = EventLoop::new();
    let started = Instant::now();
    let elapsed = Rc::new(Cell::new(Duration::ZERO));

    let once = ev.timer(TimerMode::Oneshot, 20).unwrap();
    let out = elapsed.clone();
    ev.subscribe(&once, (), move |turn, (), ()| {
        out.set(started.elapsed());
        turn.stop();
        Ok(None)
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    assert!(elapsed.get() >= Duration::from_millis(20));
}

#[test]
fn test_earlier_deadline_dispatches_first() {
    let mut ev = EventLoop::new();
    let order = Rc::new(std::cell::RefCell::new(Vec::new()));

    let slow = ev.timer(TimerMode::Oneshot, 20).unwrap();
    let fast = ev.timer(TimerMode::Oneshot, 5).unwrap();

    let log = order.clone();
    ev.subscribe(&slow, (), move |turn, (), ()| {
        log.borrow_mut().push("slow");
        turn.stop();
        Ok(None)
    })
    .unwrap();
    let log = order.clone();
    ev.subscribe(&fast, (), move |_, (), ()| {
        log.borrow_mut().push("fast");
        Ok(None)
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    assert_eq!(*order.borrow(), vec!["fast", "slow"]);
}

#[test]
fn test_late_subscription_receives_next_firing() {
    let mut ev = EventLoop::new();
    let tick = ev.timer(TimerMode::Periodic, 1).unwrap();
    let firings = Rc::new(Cell::new(0u32));

    // Subscribe to the periodic timer only after it has elapsed several times
    let late = ev.timer(TimerMode::Oneshot, 30).unwrap();
    let seen = firings.clone();
    ev.subscribe(&late, (), move |turn, (), ()| {
        let seen = seen.clone();
        turn.subscribe(&tick, (), move |turn, (), ()| {
            seen.set(seen.get() + 1);
            turn.stop();
            Ok(None)
        })?;
        Ok(None)
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    assert_eq!(firings.get(), 1);
}

/// Arm a oneshot whose callback cancels itself and arms the next one
fn chain_oneshots(
    scheduler: &mut Scheduler,
    remaining: u32,
    peak: Rc<Cell<usize>>,
) -> Result<(), LoopError> {
    let next = scheduler.timer(TimerMode::Oneshot, 1)?;
    scheduler.subscribe(&next, (), move |turn, (), ()| {
        peak.set(peak.get().max(turn.contract_count()));
        turn.cancel_self();
        if remaining == 0 {
            turn.stop();
        } else {
            chain_oneshots(turn, remaining - 1, peak.clone())?;
        }
        Ok(None)
    })?;
    Ok(())
}

#[test]
fn test_spent_oneshots_are_released() {
    let mut ev = EventLoop::new();
    let peak = Rc::new(Cell::new(0usize));
    watchdog(&mut ev, 2000);
    chain_oneshots(&mut ev, 20, peak.clone()).unwrap();

    ev.run().unwrap();
    // The watchdog plus the oneshot being dispatched
    assert_eq!(peak.get(), 2);
}

#[test]
fn test_released_oneshot_rejects_subscribe() {
    let mut ev = EventLoop::new();
    let released = ev.timer(TimerMode::Oneshot, 1).unwrap();
    let dormant = ev.timer(TimerMode::Oneshot, 1).unwrap();
    let check = ev.timer(TimerMode::Oneshot, 20).unwrap();

    ev.subscribe(&released, (), |turn, (), ()| {
        turn.cancel_self();
        Ok(None)
    })
    .unwrap();
    ev.subscribe(&dormant, (), |_, (), ()| Ok(None)).unwrap();

    let observed = Rc::new(Cell::new(None));
    let out = observed.clone();
    ev.subscribe(&check, (), move |turn, (), ()| {
        let expired = matches!(
            turn.subscribe(&released, (), |_, (), ()| Ok(None)),
            Err(LoopError::ExpiredContract { contract }) if contract == released.id()
        );
        out.set(Some((
            expired,
            turn.contract_kind(released.id()),
            turn.contract_kind(dormant.id()),
            turn.is_timer_armed(dormant.id()),
        )));
        turn.stop();
        Ok(None)
    })
    .unwrap();
    watchdog(&mut ev, 2000);

    ev.run().unwrap();
    assert_eq!(
        observed.get(),
        Some((true, None, Some(ContractKind::Timer), false))
    );
}
