//! EventLogService - Control Event Recording (Ring Buffer)
//!
//! ## Responsibilities
//!
//! - Store capture control events in a ring buffer
//! - Provide event queries for the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Kind of control event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Initialized,
    Paused,
    Resumed,
    ResolutionChanged,
    FpsChanged,
    CameraSwitched,
    Stopped,
}

/// Capture control event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureEvent {
    pub event_id: u64,
    pub kind: EventKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Ring buffer for events
struct EventRingBuffer {
    events: VecDeque<CaptureEvent>,
    capacity: usize,
    next_id: u64,
}

impl EventRingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    fn push(&mut self, mut event: CaptureEvent) -> u64 {
        event.event_id = self.next_id;
        self.next_id += 1;

        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.next_id - 1
    }

    fn get_latest(&self, count: usize) -> Vec<CaptureEvent> {
        self.events.iter().rev().take(count).cloned().collect()
    }

    fn get_by_kind(&self, kind: EventKind, count: usize) -> Vec<CaptureEvent> {
        self.events
            .iter()
            .rev()
            .filter(|e| e.kind == kind)
            .take(count)
            .cloned()
            .collect()
    }
}

/// EventLogService instance
pub struct EventLogService {
    buffer: RwLock<EventRingBuffer>,
}

impl EventLogService {
    /// Create new EventLogService
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RwLock::new(EventRingBuffer::new(capacity)),
        }
    }

    /// Record an event
    pub async fn record(&self, kind: EventKind, message: impl Into<String>) -> u64 {
        let event = CaptureEvent {
            event_id: 0,
            kind,
            message: message.into(),
            created_at: Utc::now(),
        };
        let mut buffer = self.buffer.write().await;
        let id = buffer.push(event);
        tracing::debug!(event_id = id, kind = ?kind, "Control event recorded");
        id
    }

    /// Get latest events
    pub async fn get_latest(&self, count: usize) -> Vec<CaptureEvent> {
        let buffer = self.buffer.read().await;
        buffer.get_latest(count)
    }

    /// Get events of one kind
    pub async fn get_by_kind(&self, kind: EventKind, count: usize) -> Vec<CaptureEvent> {
        let buffer = self.buffer.read().await;
        buffer.get_by_kind(kind, count)
    }

    /// Get event count
    pub async fn count(&self) -> usize {
        let buffer = self.buffer.read().await;
        buffer.events.len()
    }
}

impl Default for EventLogService {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_monotonic_from_one() {
        let log = EventLogService::new(10);
        assert_eq!(log.record(EventKind::Initialized, "camera 0").await, 1);
        assert_eq!(log.record(EventKind::Paused, "").await, 2);
        assert_eq!(log.count().await, 2);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let log = EventLogService::new(3);
        for i in 0..5 {
            log.record(EventKind::FpsChanged, format!("fps {i}")).await;
        }
        assert_eq!(log.count().await, 3);
        let latest = log.get_latest(10).await;
        assert_eq!(latest.len(), 3);
        assert_eq!(latest[0].event_id, 5);
        assert_eq!(latest[2].event_id, 3);
    }

    #[tokio::test]
    async fn test_get_by_kind_filters() {
        let log = EventLogService::new(10);
        log.record(EventKind::Paused, "").await;
        log.record(EventKind::Resumed, "").await;
        log.record(EventKind::Paused, "").await;
        let paused = log.get_by_kind(EventKind::Paused, 10).await;
        assert_eq!(paused.len(), 2);
        assert!(paused.iter().all(|e| e.kind == EventKind::Paused));
    }
}
