// Query parameters and their validation. Validation always runs before the store is touched.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{Source, UnknownSource};

/// Default ceiling for `to - from` of a statistics request.
pub const MAX_STATISTICS_RANGE_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("limit must be greater than zero, got {0}")]
    BadLimit(i64),
    #[error("offset must not be negative, got {0}")]
    BadOffset(i64),
    #[error("time range is incorrect: both ends must be set and 'from' must not be after 'to'")]
    IncorrectTimeRange,
    #[error("time range spans {actual_hours}h, maximum is {max_hours}h")]
    TimeRangeTooWide { actual_hours: i64, max_hours: i64 },
    #[error("unknown precision {0:?}, expected \"hour\" or \"day\"")]
    UnknownPrecision(String),
    #[error(transparent)]
    UnknownSource(#[from] UnknownSource),
    #[error("invalid timestamp {0:?}, expected RFC 3339")]
    BadTimestamp(String),
    #[error("unknown order {0:?}, expected \"asc\" or \"desc\"")]
    UnknownOrder(String),
    #[error("invalid include_offline {0:?}, expected true or false")]
    BadIncludeOffline(String),
    #[error("invalid {name} {value:?}, expected an integer")]
    NotAnInteger { name: &'static str, value: String },
}

/// Pagination and ordering for the per-source server listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub source: Source,
    pub limit: i64,
    pub offset: i64,
    pub players_order_asc: bool,
    /// List servers absent from the current interval too (with 0 players).
    pub include_offline: bool,
}

impl ListParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.limit <= 0 {
            return Err(ValidationError::BadLimit(self.limit));
        }
        if self.offset < 0 {
            return Err(ValidationError::BadOffset(self.offset));
        }
        Ok(())
    }
}

/// Statistics bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Hour,
    Day,
}

impl Precision {
    pub fn bucket_secs(&self) -> i64 {
        match self {
            Precision::Hour => 3600,
            Precision::Day => 86_400,
        }
    }
}

impl FromStr for Precision {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hour" => Ok(Precision::Hour),
            "day" => Ok(Precision::Day),
            _ => Err(ValidationError::UnknownPrecision(s.to_string())),
        }
    }
}

/// Half-open `[from, to)` interval of collection timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// An end at or before the Unix epoch counts as unset.
    /// `max_delta` of `None` disables the width check.
    pub fn validate(&self, max_delta: Option<TimeDelta>) -> Result<(), ValidationError> {
        if self.from.timestamp() <= 0 || self.to.timestamp() <= 0 || self.to < self.from {
            return Err(ValidationError::IncorrectTimeRange);
        }
        let Some(max_delta) = max_delta else {
            return Ok(());
        };
        let delta = self.to - self.from;
        if delta > max_delta {
            return Err(ValidationError::TimeRangeTooWide {
                actual_hours: delta.num_hours(),
                max_hours: max_delta.num_hours(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsParams {
    pub source: Source,
    pub host: String,
    pub time_range: TimeRange,
    pub precision: Precision,
}

impl StatisticsParams {
    pub fn validate(&self, max_range: TimeDelta) -> Result<(), ValidationError> {
        self.time_range.validate(Some(max_range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_params(limit: i64, offset: i64) -> ListParams {
        ListParams {
            source: Source::Ragemp,
            limit,
            offset,
            players_order_asc: false,
            include_offline: true,
        }
    }

    fn hour_start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000 / 3600 * 3600, 0).unwrap()
    }

    #[test]
    fn list_params_validation() {
        assert!(list_params(100, 100).validate().is_ok());
        assert!(list_params(1, 0).validate().is_ok());
        assert_eq!(
            list_params(0, 100).validate(),
            Err(ValidationError::BadLimit(0))
        );
        assert_eq!(
            list_params(-1, 100).validate(),
            Err(ValidationError::BadLimit(-1))
        );
        assert_eq!(
            list_params(100, -1).validate(),
            Err(ValidationError::BadOffset(-1))
        );
    }

    #[test]
    fn time_range_accepts_ordered_range() {
        let t = hour_start();
        let range = TimeRange {
            from: t,
            to: t + TimeDelta::hours(1),
        };
        assert!(range.validate(None).is_ok());
        assert!(range.validate(Some(TimeDelta::hours(2))).is_ok());
        let empty = TimeRange { from: t, to: t };
        assert!(empty.validate(Some(TimeDelta::hours(1))).is_ok());
    }

    #[test]
    fn time_range_rejects_reversed_and_unset() {
        let t = hour_start();
        let reversed = TimeRange {
            from: t + TimeDelta::hours(1),
            to: t,
        };
        assert_eq!(
            reversed.validate(None),
            Err(ValidationError::IncorrectTimeRange)
        );
        let zero_from = TimeRange {
            from: DateTime::UNIX_EPOCH,
            to: t,
        };
        assert_eq!(
            zero_from.validate(None),
            Err(ValidationError::IncorrectTimeRange)
        );
        let zero_to = TimeRange {
            from: t,
            to: DateTime::UNIX_EPOCH,
        };
        assert_eq!(
            zero_to.validate(None),
            Err(ValidationError::IncorrectTimeRange)
        );
    }

    #[test]
    fn time_range_rejects_too_wide() {
        let t = hour_start();
        let range = TimeRange {
            from: t,
            to: t + TimeDelta::hours(1),
        };
        assert!(matches!(
            range.validate(Some(TimeDelta::minutes(1))),
            Err(ValidationError::TimeRangeTooWide { .. })
        ));

        let max = TimeDelta::days(MAX_STATISTICS_RANGE_DAYS as i64);
        let exactly_max = TimeRange { from: t, to: t + max };
        assert!(exactly_max.validate(Some(max)).is_ok());
        let over = TimeRange {
            from: t,
            to: t + max + TimeDelta::seconds(1),
        };
        assert!(over.validate(Some(max)).is_err());
    }

    #[test]
    fn precision_parses_and_sizes_buckets() {
        assert_eq!("hour".parse::<Precision>().unwrap(), Precision::Hour);
        assert_eq!("DAY".parse::<Precision>().unwrap(), Precision::Day);
        assert!("week".parse::<Precision>().is_err());
        assert_eq!(Precision::Hour.bucket_secs(), 3600);
        assert_eq!(Precision::Day.bucket_secs(), 86_400);
    }
}
