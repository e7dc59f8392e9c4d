use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("slot {time} on {date} is already booked")]
    AlreadyBooked { date: String, time: String },
}

/// Booked times of a single doctor, keyed by calendar date.
///
/// Stored as a JSON object on the doctor row (`{"2024-06-01": ["10:00"]}`).
/// A date key only exists while at least one time under it is booked.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct SlotLedger(BTreeMap<String, Vec<String>>);

impl SlotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `time` on `date` as taken.
    ///
    /// Fails without touching the ledger when the slot is already held.
    pub fn reserve(&mut self, date: &str, time: &str) -> Result<(), LedgerError> {
        let times = self.0.entry(date.to_string()).or_default();
        if times.iter().any(|t| t == time) {
            return Err(LedgerError::AlreadyBooked {
                date: date.to_string(),
                time: time.to_string(),
            });
        }
        times.push(time.to_string());
        Ok(())
    }

    /// Frees `time` on `date`, dropping the date once nothing is left under it.
    ///
    /// Releasing a slot that is not held is a no-op. Returns whether the
    /// ledger changed.
    pub fn release(&mut self, date: &str, time: &str) -> bool {
        let Some(times) = self.0.get_mut(date) else {
            return false;
        };

        let before = times.len();
        times.retain(|t| t != time);
        let changed = times.len() != before;

        if times.is_empty() {
            self.0.remove(date);
        }
        changed
    }

    pub fn is_booked(&self, date: &str, time: &str) -> bool {
        self.times(date).iter().any(|t| t == time)
    }

    pub fn times(&self, date: &str) -> &[String] {
        self.0.get(date).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains_date(&self, date: &str) -> bool {
        self.0.contains_key(date)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
