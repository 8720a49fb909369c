use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SliceError};

/// Named segment of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Train,
    Validate,
    Test,
    Lockbox,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validate => "validate",
            Self::Test => "test",
            Self::Lockbox => "lockbox",
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::Train, Self::Validate, Self::Test, Self::Lockbox]
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boundary timestamp, either carrying an offset or wall-clock only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl Timestamp {
    pub fn offset(&self) -> Option<FixedOffset> {
        match self {
            Self::Aware(dt) => Some(*dt.offset()),
            Self::Naive(_) => None,
        }
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::Aware(dt)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Aware(dt.fixed_offset())
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Self::Naive(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aware(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Naive(dt) => write!(f, "{} (naive)", dt),
        }
    }
}

/// Half-open boundary specification, resolved against a `TimeIndex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    IndexRange { start: usize, stop: usize },
    DatetimeRange { start: Timestamp, stop: Timestamp },
}

impl Boundary {
    pub fn index(start: usize, stop: usize) -> Self {
        Self::IndexRange { start, stop }
    }

    pub fn datetime(start: impl Into<Timestamp>, stop: impl Into<Timestamp>) -> Self {
        Self::DatetimeRange {
            start: start.into(),
            stop: stop.into(),
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexRange { start, stop } => write!(f, "index[{}, {})", start, stop),
            Self::DatetimeRange { start, stop } => write!(f, "datetime[{}, {})", start, stop),
        }
    }
}

/// One end of a boundary as it appears in config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawBound {
    Index(i64),
    Time(Timestamp),
}

/// Boundary shape accepted from external callers (TOML, JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBoundary {
    pub start: RawBound,
    pub stop: RawBound,
}

impl TryFrom<RawBoundary> for Boundary {
    type Error = SliceError;

    fn try_from(raw: RawBoundary) -> Result<Self> {
        match (raw.start, raw.stop) {
            (RawBound::Index(start), RawBound::Index(stop)) => {
                if start < 0 || stop < 0 {
                    return Err(SliceError::InvalidBoundaryType(format!(
                        "index bounds must be non-negative, got [{}, {})",
                        start, stop
                    )));
                }
                Ok(Boundary::IndexRange {
                    start: start as usize,
                    stop: stop as usize,
                })
            }
            (RawBound::Time(start), RawBound::Time(stop)) => Ok(Boundary::DatetimeRange { start, stop }),
            (start, stop) => Err(SliceError::InvalidBoundaryType(format!(
                "start and stop must both be indices or both be datetimes, got {:?} and {:?}",
                start, stop
            ))),
        }
    }
}

impl From<&Boundary> for RawBoundary {
    fn from(boundary: &Boundary) -> Self {
        match *boundary {
            Boundary::IndexRange { start, stop } => RawBoundary {
                start: RawBound::Index(start as i64),
                stop: RawBound::Index(stop as i64),
            },
            Boundary::DatetimeRange { start, stop } => RawBoundary {
                start: RawBound::Time(start),
                stop: RawBound::Time(stop),
            },
        }
    }
}

/// Concrete half-open index interval into the caller's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedRange {
    pub start_idx: usize,
    pub stop_idx: usize,
}

impl ResolvedRange {
    pub fn new(start_idx: usize, stop_idx: usize) -> Self {
        Self { start_idx, stop_idx }
    }

    pub fn len(&self) -> usize {
        self.stop_idx.saturating_sub(self.start_idx)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, other: &ResolvedRange) -> bool {
        self.start_idx <= other.start_idx && other.stop_idx <= self.stop_idx
    }
}

impl fmt::Display for ResolvedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_idx, self.stop_idx)
    }
}

pub const SLICE_ID_PREFIX: &str = "time_window";

/// Train/validate/test triple with the embargo gaps between segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub train: ResolvedRange,
    pub validate: ResolvedRange,
    pub test: ResolvedRange,
    /// Bars between `train.stop_idx` and `validate.start_idx`.
    pub embargo_before_validate: usize,
    /// Bars between `validate.stop_idx` and `test.start_idx`.
    pub embargo_before_test: usize,
    /// Final segment held back until the model is frozen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lockbox: Option<ResolvedRange>,
    pub slice_id: String,
}

impl Split {
    /// Alias for `validate`.
    pub fn dev(&self) -> ResolvedRange {
        self.validate
    }

    pub fn range(&self, segment: Segment) -> Option<ResolvedRange> {
        match segment {
            Segment::Train => Some(self.train),
            Segment::Validate => Some(self.validate),
            Segment::Test => Some(self.test),
            Segment::Lockbox => self.lockbox,
        }
    }

    pub fn with_slice_id(mut self, slice_id: impl Into<String>) -> Self {
        self.slice_id = slice_id.into();
        self
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} train={} validate={} test={}",
            self.slice_id, self.train, self.validate, self.test
        )?;
        if let Some(lockbox) = self.lockbox {
            write!(f, " lockbox={}", lockbox)?;
        }
        Ok(())
    }
}
