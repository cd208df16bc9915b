use std::time::Duration;

use tokio::time::Instant;

/// Debounce scheduler for the batching window.
///
/// Every ingest re-arms the full window, recomputed from the capacity at
/// that moment, so a stream of messages arriving faster than the window
/// postpones the flush until the stream pauses. The remaining-time counter
/// exists purely for display: it is decremented by a one-second tick and
/// never fires the flush itself.
pub struct BatchScheduler {
    base_window: Duration,
    deadline: Option<Instant>,
    remaining_ms: u64,
}

impl BatchScheduler {
    pub fn new(base_window: Duration) -> Self {
        Self {
            base_window,
            deadline: None,
            remaining_ms: 0,
        }
    }

    /// Hold window scaled by current capacity: the lower the capacity, the
    /// longer messages are held. Unknown capacity reads as unrestricted.
    pub fn effective_window(&self, capacity: Option<u8>) -> Duration {
        match capacity.unwrap_or(100) {
            c if c < 25 => self.base_window * 2,
            c if c < 50 => self.base_window.mul_f64(1.5),
            _ => self.base_window,
        }
    }

    /// Cancel any pending deadline and start a fresh full window.
    pub fn arm(&mut self, capacity: Option<u8>) -> Duration {
        let window = self.effective_window(capacity);
        self.deadline = Some(Instant::now() + window);
        self.remaining_ms = window.as_millis() as u64;
        window
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.remaining_ms = 0;
    }

    /// Called when the deadline fires: no pending timer, remaining is zero.
    pub fn disarm(&mut self) {
        self.cancel();
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// One display tick; never triggers the flush.
    pub fn tick(&mut self) {
        self.remaining_ms = self.remaining_ms.saturating_sub(1_000);
    }
}
