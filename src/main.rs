use std::path::PathBuf;

use eventkit::{demo, init_logging, Settings, SettingsStore, BUILD_DATE, VERSION};

const SERIAL_SCRIPT: &str = "AT\r\nOK\r\nTEMP 21.5\r\nquit\r\n";

/// Settings from the path given as first argument, else from the default
/// location, else defaults
fn load_settings() -> anyhow::Result<Settings> {
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        return Ok(SettingsStore::new(path).load()?);
    }
    match SettingsStore::at_default_location() {
        Ok(store) => Ok(store.load_or_default()?),
        Err(_) => Ok(Settings::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let settings = load_settings()?;
    init_logging(&settings.logging)?;

    tracing::info!("EventKit {} (built {})", VERSION, BUILD_DATE);
    tracing::info!(
        "Queue-full policy: {}, max subscriptions: {}",
        settings.event_loop.queue_full_policy,
        settings.event_loop.max_subscriptions
    );

    let (summary, received) = demo::ticker(&settings.event_loop, 10)?;
    tracing::info!(
        "Ticker: {} turns, {} invocations, {} values received",
        summary.turns,
        summary.invocations,
        received
    );

    let (summary, sum) = demo::producer(&settings.event_loop, 1000)?;
    tracing::info!(
        "Producer: {} turns, {} invocations, sum {}",
        summary.turns,
        summary.invocations,
        sum
    );

    let lines = demo::serial(&settings.event_loop, SERIAL_SCRIPT)?;
    tracing::info!("Serial: received {:?}", lines);

    Ok(())
}
