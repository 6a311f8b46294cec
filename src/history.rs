//! Per-bridge call log, kept for diagnostics.

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of bridge call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Body of a light state change or group action.
    Send,
    /// Per-field results of a write.
    Receive,
    /// A read of lights, groups or scenes.
    Poll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub msg_type: MessageType,
    /// Addressed resource, e.g. `lights/3/state`.
    pub resource: String,
    pub message: Value,
    /// Seconds since the log was created.
    pub timestamp: f64,
}

/// Recent calls against one bridge, oldest first.
///
/// Only the last `capacity` calls are retained; the per-kind counters keep
/// counting past that.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    counts: [usize; 3],
    errors: usize,
    last_error: Option<String>,
    created: Instant,
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHistory {
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    pub fn new() -> Self {
        Self::with_max_entries(Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(capacity: usize) -> Self {
        MessageHistory {
            entries: VecDeque::with_capacity(capacity.min(Self::DEFAULT_MAX_ENTRIES)),
            capacity,
            counts: [0; 3],
            errors: 0,
            last_error: None,
            created: Instant::now(),
        }
    }

    pub fn record(&mut self, msg_type: MessageType, resource: &str, message: Value) {
        self.counts[slot(msg_type)] += 1;
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            msg_type,
            resource: resource.to_string(),
            message,
            timestamp: self.created.elapsed().as_secs_f64(),
        });
    }

    pub fn record_error(&mut self, error: &str) {
        self.errors += 1;
        self.last_error = Some(error.to_string());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Newest retained message of a kind for a resource.
    pub fn latest(&self, msg_type: MessageType, resource: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.msg_type == msg_type && e.resource == resource)
            .map(|e| &e.message)
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.counts = [0; 3];
        self.errors = 0;
        self.last_error = None;
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            sends: self.counts[slot(MessageType::Send)],
            receives: self.counts[slot(MessageType::Receive)],
            polls: self.counts[slot(MessageType::Poll)],
            errors: self.errors,
            retained: self.entries.len(),
            last_error: self.last_error.clone(),
            last_activity: self.entries.back().map(|e| e.timestamp),
        }
    }
}

fn slot(msg_type: MessageType) -> usize {
    match msg_type {
        MessageType::Send => 0,
        MessageType::Receive => 1,
        MessageType::Poll => 2,
    }
}

/// Call counts since the log was created or cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub sends: usize,
    pub receives: usize,
    pub polls: usize,
    pub errors: usize,
    /// Entries still held.
    pub retained: usize,
    pub last_error: Option<String>,
    /// Timestamp of the newest entry.
    pub last_activity: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_latest_write_per_resource() {
        let mut history = MessageHistory::new();
        history.record(MessageType::Send, "lights/1/state", json!({"on": true}));
        history.record(MessageType::Send, "lights/2/state", json!({"bri": 20}));
        history.record(MessageType::Send, "lights/1/state", json!({"on": false}));

        assert_eq!(
            history.latest(MessageType::Send, "lights/1/state"),
            Some(&json!({"on": false}))
        );
        assert!(history.latest(MessageType::Receive, "lights/1/state").is_none());
        assert_eq!(history.summary().sends, 3);
    }

    #[test]
    fn test_errors_counted() {
        let mut history = MessageHistory::new();
        history.record_error("cannot contact bridge 10.0.0.2: reset by peer");
        history.record_error("request to bridge 10.0.0.2 timed out");

        let summary = history.summary();
        assert_eq!(summary.errors, 2);
        assert_eq!(
            summary.last_error.as_deref(),
            Some("request to bridge 10.0.0.2 timed out")
        );

        history.clear();
        assert!(history.last_error().is_none());
        assert_eq!(history.summary().errors, 0);
    }

    #[test]
    fn test_capacity_drops_oldest_but_keeps_counting() {
        let mut history = MessageHistory::with_max_entries(2);
        for i in 0..5 {
            history.record(MessageType::Poll, &format!("lights/{}", i), json!({}));
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.entries().next().unwrap().resource, "lights/3");

        let summary = history.summary();
        assert_eq!(summary.polls, 5);
        assert_eq!(summary.retained, 2);
        assert!(summary.last_activity.is_some());
    }

    #[test]
    fn test_zero_capacity() {
        let mut history = MessageHistory::with_max_entries(0);
        history.record(MessageType::Poll, "groups", json!(3));
        assert!(history.is_empty());
        assert_eq!(history.summary().polls, 1);
    }
}
