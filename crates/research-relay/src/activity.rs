//! Bounded activity log for client-side session state.

use chrono::{DateTime, Utc};

/// Number of entries retained before the oldest are evicted.
pub const ACTIVITY_LOG_CAPACITY: usize = 100;

/// What an activity log line records.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActivityKind {
    Delta,
    Tool,
    Info,
    Progress,
    Status,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActivityLogEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: ActivityKind,
    pub message: String,
}

/// Fixed-capacity FIFO log. Pushing past capacity evicts the oldest entry.
#[derive(Debug)]
pub struct ActivityLog {
    slots: Vec<Option<ActivityLogEntry>>,
    head: usize,
    len: usize,
    next_id: u64,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(ACTIVITY_LOG_CAPACITY)
    }
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity.max(1)).map(|_| None).collect(),
            head: 0,
            len: 0,
            next_id: 0,
        }
    }

    pub fn push(&mut self, kind: ActivityKind, message: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.slots[self.head] = Some(ActivityLogEntry {
            id,
            timestamp: Utc::now(),
            kind,
            message: message.into(),
        });
        self.head = (self.head + 1) % self.slots.len();
        self.len = (self.len + 1).min(self.slots.len());
        id
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }

    /// Entries oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityLogEntry> {
        let capacity = self.slots.len();
        let start = (self.head + capacity - self.len) % capacity;
        (0..self.len).filter_map(move |i| self.slots[(start + i) % capacity].as_ref())
    }
}
