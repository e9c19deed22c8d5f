//! Reference UI consumers
//!
//! Plain in-memory models a front end can render from. They are fed through
//! the [`Dispatcher`](crate::dispatch::Dispatcher) callbacks and shared with
//! the renderer behind a mutex.

use std::collections::VecDeque;

use dl_core::LinkStatus;
use dl_protocol::{LogEntry, StatusUpdate};

/// Entries kept by a [`LogView`] unless configured otherwise
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Bounded live log, newest entry first
#[derive(Debug, Clone)]
pub struct LogView {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    paused: bool,
    dropped_while_paused: usize,
}

impl Default for LogView {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl LogView {
    /// Create a view holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity: capacity.max(1),
            paused: false,
            dropped_while_paused: 0,
        }
    }

    /// Add an entry at the front.
    ///
    /// Returns the oldest entry if the view was full. Entries arriving while
    /// paused are counted and discarded.
    pub fn push(&mut self, entry: LogEntry) -> Option<LogEntry> {
        if self.paused {
            self.dropped_while_paused += 1;
            return None;
        }
        self.entries.push_front(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// Stop taking new entries
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Take new entries again
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Flip between paused and live; returns the new paused state
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Entries discarded because the view was paused
    pub fn dropped_while_paused(&self) -> usize {
        self.dropped_while_paused
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.dropped_while_paused = 0;
    }

    /// Entries, newest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn newest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Latest known device status plus link state
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    status: Option<StatusUpdate>,
    link: Option<LinkStatus>,
    updates: u64,
    last_notice: Option<String>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a status update; fields absent from `update` keep their value
    pub fn apply(&mut self, update: &StatusUpdate) {
        self.updates += 1;
        if self.status.is_none() {
            self.status = Some(update.clone());
            return;
        }
        let Some(current) = self.status.as_mut() else {
            return;
        };

        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(
                    if update.$field.is_some() {
                        current.$field = update.$field.clone();
                    }
                )*
            };
        }
        merge!(
            datetime,
            uptime,
            device_name,
            tm_name,
            device_ip,
            baud_rate,
            ethernet_status,
            time_synced,
            free_heap,
            ws_clients,
        );
        for (key, value) in &update.extra {
            current.extra.insert(key.clone(), value.clone());
        }
    }

    /// Record the link indicator
    pub fn set_link(&mut self, link: LinkStatus) {
        self.link = Some(link);
    }

    /// Record an error notice from the server
    pub fn set_notice(&mut self, notice: &str) {
        self.last_notice = Some(notice.to_string());
    }

    pub fn status(&self) -> Option<&StatusUpdate> {
        self.status.as_ref()
    }

    pub fn link(&self) -> Option<LinkStatus> {
        self.link
    }

    pub fn last_notice(&self) -> Option<&str> {
        self.last_notice.as_deref()
    }

    /// Number of status updates applied
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp: "00:00:01".into(),
            level: "INFO".into(),
            source: "test".into(),
            message: message.into(),
        }
    }

    #[test]
    fn test_newest_first_and_bounded() {
        let mut view = LogView::new(3);
        for i in 0..3 {
            assert!(view.push(entry(&i.to_string())).is_none());
        }
        let evicted = view.push(entry("3")).unwrap();
        assert_eq!(evicted.message, "0");

        let messages: Vec<_> = view.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["3", "2", "1"]);
        assert_eq!(view.newest().unwrap().message, "3");
    }

    #[test]
    fn test_default_capacity() {
        let mut view = LogView::default();
        for i in 0..250 {
            view.push(entry(&i.to_string()));
        }
        assert_eq!(view.len(), DEFAULT_LOG_CAPACITY);
        assert_eq!(view.newest().unwrap().message, "249");
    }

    #[test]
    fn test_pause_discards_and_clear_resets() {
        let mut view = LogView::new(10);
        view.push(entry("kept"));
        assert!(view.toggle_pause());
        view.push(entry("lost"));
        assert_eq!(view.len(), 1);
        assert_eq!(view.dropped_while_paused(), 1);

        view.resume();
        view.push(entry("after"));
        assert_eq!(view.len(), 2);

        view.clear();
        assert!(view.is_empty());
        assert_eq!(view.dropped_while_paused(), 0);
    }

    #[test]
    fn test_status_board_merges_fields() {
        let mut board = StatusBoard::new();
        let first: StatusUpdate = serde_json::from_str(
            r#"{"deviceName":"EK1","uptime":"1m","baudRate":500000}"#,
        )
        .unwrap();
        board.apply(&first);

        let second: StatusUpdate =
            serde_json::from_str(r#"{"uptime":"2m","sensorTemp":41}"#).unwrap();
        board.apply(&second);

        let status = board.status().unwrap();
        assert_eq!(status.device_name.as_deref(), Some("EK1"));
        assert_eq!(status.uptime.as_deref(), Some("2m"));
        assert_eq!(status.baud_rate, Some(500000));
        assert_eq!(status.extra["sensorTemp"], 41);
        assert_eq!(board.updates(), 2);
    }

    #[test]
    fn test_status_board_link_and_notice() {
        let mut board = StatusBoard::new();
        assert!(board.link().is_none());
        board.set_link(LinkStatus::Connected);
        board.set_notice("Invalid baud rate");
        assert_eq!(board.link(), Some(LinkStatus::Connected));
        assert_eq!(board.last_notice(), Some("Invalid baud rate"));
    }
}
