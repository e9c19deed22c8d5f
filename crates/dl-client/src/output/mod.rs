//! Output formatting utilities for the CLI
//!
//! Renders device status, log lines and link changes for the terminal, and
//! prints coloured one-line messages.

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use serde_json::Value;
use tabled::{builder::Builder, settings::Style};

use dl_core::LinkStatus;
use dl_protocol::{LogEntry, StatusUpdate};

use crate::consumers::{LogView, StatusBoard};

/// Format a status snapshot as a two-column table
///
/// Only fields the device actually reported are shown; unmodelled keys
/// follow the known ones, sorted by key.
pub fn format_status(status: &StatusUpdate) -> String {
    let mut rows: Vec<(String, String)> = Vec::new();
    let mut push = |name: &str, value: Option<String>| {
        if let Some(value) = value {
            rows.push((name.to_string(), value));
        }
    };

    push("Device", status.device_name.clone());
    push("TM", status.tm_name.clone());
    push("IP", status.device_ip.clone());
    push("Date/time", status.datetime.clone());
    push("Uptime", status.uptime.clone());
    push("Baud rate", status.baud_rate.map(|b| b.to_string()));
    push("Ethernet", status.ethernet_status.map(yes_no));
    push("Time synced", status.time_synced.map(yes_no));
    push("Free heap", status.free_heap.map(format_bytes));
    push("WS clients", status.ws_clients.map(|c| c.to_string()));
    for (key, value) in &status.extra {
        push(key, Some(format_value(value)));
    }

    if rows.is_empty() {
        return "No status reported".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["FIELD", "VALUE"]);
    for (name, value) in rows {
        builder.push_record([name, value]);
    }
    builder.build().with(Style::rounded()).to_string()
}

/// Format a status board: link state, last notice, then the status table
pub fn format_board(board: &StatusBoard) -> String {
    let mut output = String::new();
    let link = board
        .link()
        .map(|l| l.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    output.push_str(&format!("Link: {}\n", link));
    if let Some(notice) = board.last_notice() {
        output.push_str(&format!("Last error: {}\n", notice));
    }
    match board.status() {
        Some(status) => output.push_str(&format_status(status)),
        None => output.push_str("No status received"),
    }
    output
}

/// Format one log entry as a single line
pub fn format_log_line(entry: &LogEntry) -> String {
    format!(
        "{} [{:<5}] {}: {}",
        entry.timestamp, entry.level, entry.source, entry.message
    )
}

/// Format a log view, newest entry first
pub fn format_logs(view: &LogView) -> String {
    if view.is_empty() {
        return "No log entries".to_string();
    }
    view.iter()
        .map(format_log_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print a log line coloured by level
pub fn print_log(entry: &LogEntry) {
    let color = match entry.level.to_ascii_uppercase().as_str() {
        "ERROR" | "FATAL" => Color::Red,
        "WARN" | "WARNING" => Color::Yellow,
        "DEBUG" | "TRACE" => Color::DarkGrey,
        _ => Color::Reset,
    };

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(color),
        Print(format_log_line(entry)),
        ResetColor,
        Print("\n")
    );
}

/// Print a link-status change
pub fn print_link(status: LinkStatus) {
    let msg = format!("Link {}", status);
    match status {
        LinkStatus::Connected => print_success(&msg),
        LinkStatus::Connecting => print_info(&msg),
        LinkStatus::Disconnected => print_warning(&msg),
        LinkStatus::Error => print_error(&msg),
    }
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "yes" } else { "no" };
    text.to_string()
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Format a byte count in human-readable form
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix, to stderr
pub fn print_error(msg: &str) {
    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow, to stderr
pub fn print_warning(msg: &str) {
    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
