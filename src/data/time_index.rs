use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use polars::prelude::*;
use std::sync::OnceLock;

use crate::error::{Result, SliceError};
use crate::types::Timestamp;

/// Ascending sequence of timestamps that every boundary resolves against.
///
/// Entries are stored as UTC instants. `tz` is the offset shared by every entry
/// of an aware index, or `None` when the index is naive.
#[derive(Debug, Clone)]
pub struct TimeIndex {
    instants: Vec<NaiveDateTime>,
    tz: Option<FixedOffset>,
    strict: bool,
    // Position of the first out-of-order entry, computed on first resolution.
    order_check: OnceLock<Option<usize>>,
}

impl TimeIndex {
    fn with_parts(instants: Vec<NaiveDateTime>, tz: Option<FixedOffset>) -> Self {
        Self {
            instants,
            tz,
            strict: false,
            order_check: OnceLock::new(),
        }
    }

    pub fn from_naive(stamps: Vec<NaiveDateTime>) -> Self {
        Self::with_parts(stamps, None)
    }

    pub fn from_utc(stamps: Vec<DateTime<Utc>>) -> Self {
        let instants = stamps.iter().map(|dt| dt.naive_utc()).collect();
        Self::with_parts(instants, Some(Utc.fix()))
    }

    /// Build an aware index. Every entry must carry the offset of the first one;
    /// an empty input yields an empty UTC index.
    pub fn from_fixed(stamps: Vec<DateTime<FixedOffset>>) -> Result<Self> {
        let tz = stamps.first().map(|dt| *dt.offset()).unwrap_or_else(|| Utc.fix());

        let mut instants = Vec::with_capacity(stamps.len());
        for dt in &stamps {
            if *dt.offset() != tz {
                return Err(SliceError::TimezoneMismatch {
                    field: "index",
                    expected: tz,
                    found: *dt.offset(),
                });
            }
            instants.push(dt.naive_utc());
        }

        Ok(Self::with_parts(instants, Some(tz)))
    }

    /// Read a polars datetime column. Columns with a time zone are taken as UTC
    /// instants, columns without one as naive wall-clock times.
    pub fn from_dataframe(df: &DataFrame, column: &str) -> Result<Self> {
        let series = df.column(column)?;
        let (unit, aware) = match series.dtype() {
            DataType::Datetime(unit, tz) => (*unit, tz.is_some()),
            other => {
                return Err(SliceError::Validation(format!(
                    "Column '{}' must be a datetime column, found {:?}",
                    column, other
                )))
            }
        };

        let physical = series.cast(&DataType::Int64)?;
        let values = physical.i64()?;

        let mut instants = Vec::with_capacity(values.len());
        for (row, value) in values.into_iter().enumerate() {
            let raw = value.ok_or_else(|| {
                SliceError::Validation(format!("Null timestamp at row {} in column '{}'", row, column))
            })?;
            let dt = match unit {
                TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(raw)),
                TimeUnit::Microseconds => DateTime::from_timestamp_micros(raw),
                TimeUnit::Milliseconds => DateTime::from_timestamp_millis(raw),
            }
            .ok_or_else(|| SliceError::Validation(format!("Invalid timestamp {} at row {}", raw, row)))?;
            instants.push(dt.naive_utc());
        }

        let tz = if aware { Some(Utc.fix()) } else { None };
        Ok(Self::with_parts(instants, tz))
    }

    /// Reject repeated timestamps when checking order.
    pub fn forbid_duplicates(mut self) -> Self {
        self.strict = true;
        self.order_check = OnceLock::new();
        self
    }

    pub fn len(&self) -> usize {
        self.instants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }

    pub fn timezone(&self) -> Option<FixedOffset> {
        self.tz
    }

    pub fn is_aware(&self) -> bool {
        self.tz.is_some()
    }

    pub fn instants(&self) -> &[NaiveDateTime] {
        &self.instants
    }

    pub fn get(&self, idx: usize) -> Option<Timestamp> {
        let instant = self.instants.get(idx)?;
        Some(match self.tz {
            Some(tz) => Timestamp::Aware(tz.from_utc_datetime(instant)),
            None => Timestamp::Naive(*instant),
        })
    }

    pub fn first(&self) -> Option<Timestamp> {
        self.get(0)
    }

    pub fn last(&self) -> Option<Timestamp> {
        self.len().checked_sub(1).and_then(|idx| self.get(idx))
    }

    /// Check ordering once; later calls reuse the cached outcome.
    pub fn ensure_sorted(&self) -> Result<()> {
        let violation = self.order_check.get_or_init(|| {
            self.instants
                .windows(2)
                .position(|pair| {
                    if self.strict {
                        pair[0] >= pair[1]
                    } else {
                        pair[0] > pair[1]
                    }
                })
                .map(|i| i + 1)
        });

        match *violation {
            None => Ok(()),
            Some(position) => Err(SliceError::UnsortedTimestamps {
                position,
                previous: self.instants[position - 1],
                current: self.instants[position],
            }),
        }
    }

    /// First position whose instant is `>= instant`.
    pub fn bisect_left(&self, instant: NaiveDateTime) -> usize {
        self.instants.partition_point(|t| *t < instant)
    }

    /// First position whose instant is `> instant`.
    pub fn bisect_right(&self, instant: NaiveDateTime) -> usize {
        self.instants.partition_point(|t| *t <= instant)
    }
}
