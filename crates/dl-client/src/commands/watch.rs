//! Watch command implementation

use anyhow::{Context, Result};

use dl_core::config::ClientConfig;

use crate::dispatch::Dispatcher;
use crate::driver::{Driver, RunOutcome};
use crate::output::{print_error, print_info, print_link, print_log, print_success, print_warning};

/// Stream status, logs and notices until Ctrl-C or the connection ends
pub async fn watch_command(config: &ClientConfig) -> Result<()> {
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .on_log(print_log)
        .on_status(|status| {
            println!("{}", crate::output::format_status(status));
        })
        .on_notice(|notice| print_error(&format!("Device: {}", notice)))
        .on_fault(|fault| print_warning(&format!("Fault at {}: {}", fault.timestamp, fault.data)));

    let mut driver = Driver::new(config, dispatcher).context("Invalid client configuration")?;
    driver.on_indicator(print_link);

    let handle = driver.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, closing connection...");
            handle.shutdown();
        }
    });

    print_info(&format!("Watching {} (Ctrl+C to stop)", driver.manager().endpoint()));

    match driver.run().await {
        RunOutcome::Shutdown => print_success("Disconnected"),
        RunOutcome::Closed => print_info("Device closed the connection"),
        RunOutcome::Exhausted => {
            anyhow::bail!(
                "Device unreachable; gave up after {} reconnect attempts",
                config.backoff.max_attempts
            );
        }
    }
    Ok(())
}
