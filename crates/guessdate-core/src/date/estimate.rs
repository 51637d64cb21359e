use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Values at or below this many milliseconds are treated as unset.
const MIN_VALID_MILLIS: i64 = 10;

/// Filesystem timestamps of one file, in milliseconds since the Unix epoch.
/// `None` means the platform did not report that time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTimes {
    pub accessed: Option<i64>,
    pub modified: Option<i64>,
    pub changed: Option<i64>,
    pub created: Option<i64>,
}

impl FileTimes {
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            accessed: meta.accessed().ok().map(system_time_millis),
            modified: meta.modified().ok().map(system_time_millis),
            changed: change_time_millis(meta),
            created: meta.created().ok().map(system_time_millis),
        }
    }

    fn all(&self) -> [Option<i64>; 4] {
        [self.accessed, self.modified, self.changed, self.created]
    }
}

/// Best guess at the original capture time: the smallest timestamp that is
/// present and greater than 10ms. Copies and edits only ever move these
/// times forward.
pub fn earliest_record(times: &FileTimes) -> Result<i64> {
    times
        .all()
        .into_iter()
        .flatten()
        .filter(|&t| t > MIN_VALID_MILLIS)
        .min()
        .ok_or(Error::NoValidTimestamp)
}

fn system_time_millis(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}

#[cfg(unix)]
fn change_time_millis(meta: &Metadata) -> Option<i64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ctime() * 1000 + meta.ctime_nsec() / 1_000_000)
}

#[cfg(not(unix))]
fn change_time_millis(_meta: &Metadata) -> Option<i64> {
    None
}
