use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// A rental window, half-open: `[start_time, end_time)`.
///
/// Construction rejects empty and inverted windows, so every `TimeWindow`
/// in the system satisfies `start_time < end_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct TimeWindow {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawWindow {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl TryFrom<RawWindow> for TimeWindow {
    type Error = CoreError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        TimeWindow::new(raw.start_time, raw.end_time)
    }
}

impl TimeWindow {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> CoreResult<Self> {
        if start_time >= end_time {
            return Err(CoreError::ValidationError(
                "startTime must be before endTime".to_string(),
            ));
        }
        Ok(Self { start_time, end_time })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Two windows conflict iff they are not disjoint. Touching endpoints
    /// (one ends exactly when the other starts) do not conflict.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        !(other.end_time <= self.start_time || other.start_time >= self.end_time)
    }

    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }
}
