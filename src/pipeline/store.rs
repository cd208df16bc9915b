use std::collections::VecDeque;

use uuid::Uuid;

use crate::pipeline::types::{BufferedMessage, Disposition, ProcessedRecord};

/// All triage state: the live buffer, the delivered feed, and the deferred
/// (deep-processing) queue. Both queues are kept most-recent-first. Only the
/// pipeline runtime mutates this; consumers see published snapshots.
#[derive(Default)]
pub struct ShieldStore {
    buffer: Vec<BufferedMessage>,
    delivered: VecDeque<ProcessedRecord>,
    deferred: VecDeque<ProcessedRecord>,
}

impl ShieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: BufferedMessage) {
        self.buffer.push(message);
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Atomically take the buffered messages, leaving an empty buffer for
    /// the next batch. Called exactly once per flush firing.
    pub fn drain_buffer(&mut self) -> Vec<BufferedMessage> {
        std::mem::take(&mut self.buffer)
    }

    /// Place a finalized record. A record id enters at most one queue, and
    /// only here.
    pub fn commit(&mut self, record: ProcessedRecord, disposition: Disposition) {
        debug_assert!(
            !self.contains(&record.id),
            "record {} committed twice",
            record.id
        );
        match disposition {
            Disposition::Delivered => self.delivered.push_front(record),
            Disposition::Deferred => self.deferred.push_front(record),
        }
    }

    /// Move a deferred record to the delivered feed. Unknown ids are a
    /// no-op, not an error.
    pub fn promote(&mut self, id: &Uuid) -> bool {
        let Some(position) = self.deferred.iter().position(|record| record.id == *id) else {
            return false;
        };
        let record = self
            .deferred
            .remove(position)
            .expect("position was just found");
        self.delivered.push_front(record);
        true
    }

    pub fn clear_deferred(&mut self) -> usize {
        let cleared = self.deferred.len();
        self.deferred.clear();
        cleared
    }

    pub fn dismiss(&mut self, id: &Uuid) -> bool {
        let Some(position) = self.delivered.iter().position(|record| record.id == *id) else {
            return false;
        };
        self.delivered.remove(position);
        true
    }

    pub fn delivered(&self) -> &VecDeque<ProcessedRecord> {
        &self.delivered
    }

    pub fn deferred(&self) -> &VecDeque<ProcessedRecord> {
        &self.deferred
    }

    /// Rehydrate the delivered feed from a persisted snapshot. The buffer
    /// and deferred queue intentionally start empty.
    pub fn restore_delivered(&mut self, records: Vec<ProcessedRecord>) {
        self.delivered = records.into();
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.delivered.clear();
        self.deferred.clear();
    }

    fn contains(&self, id: &Uuid) -> bool {
        self.delivered.iter().any(|record| record.id == *id)
            || self.deferred.iter().any(|record| record.id == *id)
    }
}
