//! Demo scenarios run by the `eventkit` binary
//!
//! Each scenario builds its own loop from a [`LoopConfig`], runs it to
//! completion and reports what happened. A guard oneshot fails the run if a
//! scenario hangs.

use std::io::Cursor;
use std::thread;
use std::time::Duration;

use eventkit_core::{EventLoop, LoopConfig, RunSummary, TimerMode};
use eventkit_devices::SerialLines;

const GUARD_MS: u64 = 1000;

fn guard(ev: &mut EventLoop, ms: u64) -> anyhow::Result<()> {
    let timer = ev.timer(TimerMode::Oneshot, ms)?;
    ev.subscribe(&timer, (), move |_, (), ()| {
        anyhow::bail!("scenario still running after {}ms", ms)
    })?;
    Ok(())
}

/// Periodic 1ms timer feeding `123` into a 16-slot queue; stops after
/// `ticks` ticks. Returns the run summary and how many values were received.
pub fn ticker(config: &LoopConfig, ticks: u32) -> anyhow::Result<(RunSummary, u32)> {
    let mut ev = EventLoop::with_config(config.clone())?;
    let tick = ev.timer(TimerMode::Periodic, 1)?;
    let queue = ev.queue::<i32>(16)?;

    let tx = queue.sender();
    ev.subscribe(&tick, 0u32, move |turn, (), count| {
        tx.send(123)?;
        let count = count + 1;
        if count == ticks {
            turn.stop();
        }
        Ok(Some(count))
    })?;

    let received = std::rc::Rc::new(std::cell::Cell::new(0u32));
    let seen = received.clone();
    ev.subscribe(&queue.input(), (), move |_, value, ()| {
        anyhow::ensure!(value == 123, "unexpected value {}", value);
        seen.set(seen.get() + 1);
        Ok(None)
    })?;
    guard(&mut ev, GUARD_MS)?;

    let summary = ev.run()?;
    Ok((summary, received.get()))
}

/// A producer thread pushes `0..items` through a 4-slot queue, waiting
/// for a free slot whenever it is full regardless of the queue-full policy.
/// Returns the run summary and the sum received.
pub fn producer(config: &LoopConfig, items: u64) -> anyhow::Result<(RunSummary, u64)> {
    anyhow::ensure!(items > 0, "producer scenario needs at least one item");

    let mut ev = EventLoop::with_config(config.clone())?;
    let queue = ev.queue::<u64>(4)?;
    let total = std::rc::Rc::new(std::cell::Cell::new(0u64));

    let sum = total.clone();
    ev.subscribe(&queue.input(), 0u64, move |turn, value, received| {
        sum.set(sum.get() + value);
        if received + 1 == items {
            turn.stop();
        }
        Ok(Some(received + 1))
    })?;
    guard(&mut ev, GUARD_MS)?;

    let sender = queue.sender();
    let worker = thread::Builder::new()
        .name("producer".to_string())
        .spawn(move || -> anyhow::Result<()> {
            for value in 0..items {
                sender.send_timeout(value, Duration::from_millis(GUARD_MS))?;
            }
            tracing::debug!("Producer finished after {} items", items);
            Ok(())
        })?;

    let summary = ev.run()?;
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;
    Ok((summary, total.get()))
}

/// Lines read from `input` on a reader thread until one equals `quit`.
pub fn serial(config: &LoopConfig, input: &str) -> anyhow::Result<Vec<String>> {
    let mut ev = EventLoop::with_config(config.clone())?;
    let (rx, mut lines) = SerialLines::attach(&mut ev, "demo", 128)?;

    let collected = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let out = collected.clone();
    ev.subscribe(&rx, (), move |turn, line, ()| {
        if line == "quit" {
            turn.stop();
        } else {
            out.borrow_mut().push(line);
        }
        Ok(None)
    })?;
    guard(&mut ev, GUARD_MS)?;

    let bytes = input.as_bytes().to_vec();
    let reader = thread::spawn(move || lines.pump(Cursor::new(bytes)));

    ev.run()?;
    // The reader may lose the race with teardown; lines already
    // dispatched are what count
    match reader.join() {
        Ok(Ok(delivered)) => tracing::debug!("Reader delivered {} lines", delivered),
        Ok(Err(e)) => tracing::debug!("Reader stopped: {}", e),
        Err(_) => anyhow::bail!("reader thread panicked"),
    }

    let lines = collected.borrow().clone();
    Ok(lines)
}
