//! Snapshot command implementation

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};

use dl_core::config::ClientConfig;

use crate::consumers::{LogView, StatusBoard};
use crate::dispatch::Dispatcher;
use crate::driver::{Driver, RunOutcome};
use crate::output::{format_board, format_logs, print_warning};

/// Connect, collect the initial burst for `wait`, then print it
pub async fn snapshot_command(config: &ClientConfig, wait: Duration) -> Result<()> {
    let board = Arc::new(Mutex::new(StatusBoard::new()));
    let logs = Arc::new(Mutex::new(LogView::default()));

    let dispatcher = snapshot_dispatcher(&board, &logs);
    let mut driver = Driver::new(config, dispatcher).context("Invalid client configuration")?;
    let b = Arc::clone(&board);
    driver.on_indicator(move |link| {
        if let Ok(mut board) = b.lock() {
            board.set_link(link);
        }
    });

    let handle = driver.handle();
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(wait).await;
        handle.shutdown();
    });

    let outcome = driver.run().await;
    stopper.abort();

    match outcome {
        RunOutcome::Exhausted => print_warning("Device unreachable; showing whatever arrived"),
        RunOutcome::Closed => print_warning("Device closed the connection early"),
        RunOutcome::Shutdown => {}
    }

    let board = board
        .lock()
        .map_err(|_| anyhow::anyhow!("status board poisoned"))?;
    let logs = logs
        .lock()
        .map_err(|_| anyhow::anyhow!("log view poisoned"))?;
    println!("{}", format_board(&board));
    println!();
    println!("{}", format_logs(&logs));
    Ok(())
}

/// Dispatcher feeding a status board and a log view
pub fn snapshot_dispatcher(
    board: &Arc<Mutex<StatusBoard>>,
    logs: &Arc<Mutex<LogView>>,
) -> Dispatcher {
    let mut dispatcher = Dispatcher::new();

    let b = Arc::clone(board);
    dispatcher.on_status(move |status| {
        if let Ok(mut board) = b.lock() {
            board.apply(status);
        }
    });
    let b = Arc::clone(board);
    dispatcher.on_notice(move |notice| {
        if let Ok(mut board) = b.lock() {
            board.set_notice(notice);
        }
    });
    let l = Arc::clone(logs);
    dispatcher.on_log(move |entry| {
        if let Ok(mut logs) = l.lock() {
            logs.push(entry.clone());
        }
    });

    dispatcher
}
