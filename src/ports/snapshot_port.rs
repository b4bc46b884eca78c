//! Weekly market snapshot port.

use crate::domain::asset::Snapshot;
use crate::domain::error::SnapshotError;
use chrono::NaiveDate;

pub trait SnapshotPort {
    /// Ranked snapshot for `date`, truncated to `max_rows` records.
    fn fetch_snapshot(&self, date: NaiveDate, max_rows: usize) -> Result<Snapshot, SnapshotError>;
}
