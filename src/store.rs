//! Bounded in-memory message history

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::message::{MessageId, MessageRecord, MessageSummary};

/// Number of records kept when no capacity is configured
pub const DEFAULT_CAPACITY: usize = 1000;

/// Number of summaries included in [`Stats::recent`]
pub const RECENT_LIMIT: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("message {0} not found")]
    NotFound(String),
}

/// Lifetime counters and a short list of the newest messages
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Messages accepted since start or the last clear, including evicted ones
    pub total_received: u64,
    pub last_received_at: Option<DateTime<Utc>>,
    pub current_count: usize,
    #[serde(skip)]
    pub recent: Vec<MessageSummary>,
}

/// One page of a listing, with a stats snapshot taken at the same instant
#[derive(Debug, Clone)]
pub struct Page {
    pub messages: Vec<Arc<MessageRecord>>,
    /// Number of records currently retained
    pub total: usize,
    pub stats: Stats,
}

#[derive(Debug, Default)]
struct Inner {
    /// Newest first
    records: VecDeque<Arc<MessageRecord>>,
    total_received: u64,
    last_received_at: Option<DateTime<Utc>>,
}

impl Inner {
    fn stats(&self) -> Stats {
        Stats {
            total_received: self.total_received,
            last_received_at: self.last_received_at,
            current_count: self.records.len(),
            recent: self
                .records
                .iter()
                .take(RECENT_LIMIT)
                .map(|record| record.summary())
                .collect(),
        }
    }

    fn position(&self, id: &MessageId) -> Option<usize> {
        self.records.iter().position(|record| record.id == *id)
    }
}

/// Capacity-limited history of accepted messages.
///
/// All state sits behind a single mutex, so every operation is linearised
/// with respect to every other. Share it between the SMTP server and the API
/// with an `Arc`.
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl HistoryStore {
    /// Create an empty store. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publish a record as the newest entry, evicting the oldest if full.
    ///
    /// A `received_at` earlier than the previous insertion is raised to it, so
    /// timestamps never go backwards in insertion order.
    pub fn insert(&self, mut record: MessageRecord) -> Arc<MessageRecord> {
        let mut inner = self.lock();

        if let Some(last) = inner.last_received_at {
            record.received_at = record.received_at.max(last);
        }

        let record = Arc::new(record);
        inner.records.push_front(Arc::clone(&record));
        inner.total_received += 1;
        inner.last_received_at = Some(record.received_at);

        while inner.records.len() > self.capacity {
            if let Some(evicted) = inner.records.pop_back() {
                debug!(id = %evicted.id, "Evicted oldest message");
            }
        }

        record
    }

    /// Records newest first, skipping `offset` and returning at most `limit`
    pub fn list(&self, offset: usize, limit: usize) -> Page {
        let inner = self.lock();
        Page {
            messages: inner
                .records
                .iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
            total: inner.records.len(),
            stats: inner.stats(),
        }
    }

    pub fn get(&self, id: &MessageId) -> Result<Arc<MessageRecord>, StoreError> {
        let inner = self.lock();
        inner
            .position(id)
            .and_then(|idx| inner.records.get(idx).cloned())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn delete(&self, id: &MessageId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let idx = inner
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        inner.records.remove(idx);
        Ok(())
    }

    /// Drop every record and reset the counters
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.records.clear();
        inner.total_received = 0;
        inner.last_received_at = None;
    }

    pub fn stats(&self) -> Stats {
        self.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    // No critical section can leave `Inner` half-updated, so a poisoned lock
    // still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
