use std::sync::{Arc, RwLock};

use time::{Date, OffsetDateTime, UtcOffset};

/// Read accessor for the user's self-reported daily capacity. `None` means
/// no check-in today; the pipeline treats that as unrestricted.
pub trait CapacityProvider: Send + Sync {
    fn today(&self) -> Option<u8>;
}

#[derive(Debug, Clone, Copy)]
struct CheckIn {
    date: Date,
    percentage: u8,
}

/// Shared in-memory check-in ledger. A check-in is only valid for the
/// calendar day it was recorded on; yesterday's value reads as `None`.
#[derive(Clone, Default)]
pub struct CheckInLedger {
    inner: Arc<RwLock<Option<CheckIn>>>,
}

impl CheckInLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, percentage: u8) {
        let check_in = CheckIn {
            date: local_date(),
            percentage: percentage.min(100),
        };
        *self.inner.write().expect("check-in lock is never poisoned") = Some(check_in);
    }
}

impl CapacityProvider for CheckInLedger {
    fn today(&self) -> Option<u8> {
        let guard = self.inner.read().expect("check-in lock is never poisoned");
        guard
            .filter(|check_in| check_in.date == local_date())
            .map(|check_in| check_in.percentage)
    }
}

fn local_date() -> Date {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset).date()
}

/// Fixed capacity value for tests and embedding.
#[derive(Debug, Clone, Copy)]
pub struct FixedCapacity(pub Option<u8>);

impl CapacityProvider for FixedCapacity {
    fn today(&self) -> Option<u8> {
        self.0
    }
}
