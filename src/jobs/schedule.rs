//! Daily trigger time in a fixed UTC offset.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};

use crate::errors::{AppError, AppResult};

/// Fires once per day at `hour:00` local to `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    offset: FixedOffset,
}

impl DailySchedule {
    pub fn new(hour: u32, utc_offset_hours: i32) -> AppResult<Self> {
        let at = NaiveTime::from_hms_opt(hour, 0, 0)
            .ok_or_else(|| AppError::validation(format!("Invalid shutdown hour {hour}")))?;
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
            AppError::validation(format!("Invalid UTC offset {utc_offset_hours}h"))
        })?;
        Ok(Self { at, offset })
    }

    /// First trigger strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_date = now.with_timezone(&self.offset).date_naive();
        let shift = Duration::seconds(i64::from(self.offset.local_minus_utc()));
        let today = local_date.and_time(self.at).and_utc() - shift;

        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}
