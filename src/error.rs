use chrono::{FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ResolvedRange, Segment};

#[derive(Error, Debug)]
pub enum SliceError {
    #[error("Timestamps not sorted ascending: position {position} ({current}) follows {previous}")]
    UnsortedTimestamps {
        position: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("Timestamp '{field}' must be timezone-aware")]
    TimezoneNaive { field: &'static str },

    #[error("Timezone mismatch on '{field}': index uses {expected}, found {found}")]
    TimezoneMismatch {
        field: &'static str,
        expected: FixedOffset,
        found: FixedOffset,
    },

    #[error("Resolved boundary range is empty: [{start_idx}, {stop_idx}) for {requested}")]
    EmptyResolvedRange {
        start_idx: usize,
        stop_idx: usize,
        requested: String,
    },

    #[error("Index range [{start}, {stop}) out of bounds for index of length {len}")]
    BoundaryOutOfRange { start: usize, stop: usize, len: usize },

    #[error("Label lookahead of {lookahead_bars} bars overflows range {range} (bound {bound})")]
    LookaheadOverflow {
        segment: Option<Segment>,
        range: ResolvedRange,
        lookahead_bars: usize,
        bound: usize,
    },

    #[error("Walk-forward parameters produced no complete splits ({len} bars, template {template_bars} bars)")]
    NoCompleteSplits {
        len: usize,
        template_bars: usize,
    },

    #[error("Embargo violation: {before} stops at {before_stop}, {after} starts at {after_start}, embargo {embargo_bars} bars")]
    EmbargoViolation {
        before: Segment,
        after: Segment,
        before_stop: usize,
        after_start: usize,
        embargo_bars: usize,
    },

    #[error("Invalid boundary type: {0}")]
    InvalidBoundaryType(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Flat tag of a [`SliceError`], stored in audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsortedTimestamps,
    TimezoneNaive,
    TimezoneMismatch,
    EmptyResolvedRange,
    BoundaryOutOfRange,
    LookaheadOverflow,
    NoCompleteSplits,
    EmbargoViolation,
    InvalidBoundaryType,
    Configuration,
    Validation,
    External,
}

impl SliceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsortedTimestamps { .. } => ErrorKind::UnsortedTimestamps,
            Self::TimezoneNaive { .. } => ErrorKind::TimezoneNaive,
            Self::TimezoneMismatch { .. } => ErrorKind::TimezoneMismatch,
            Self::EmptyResolvedRange { .. } => ErrorKind::EmptyResolvedRange,
            Self::BoundaryOutOfRange { .. } => ErrorKind::BoundaryOutOfRange,
            Self::LookaheadOverflow { .. } => ErrorKind::LookaheadOverflow,
            Self::NoCompleteSplits { .. } => ErrorKind::NoCompleteSplits,
            Self::EmbargoViolation { .. } => ErrorKind::EmbargoViolation,
            Self::InvalidBoundaryType(_) => ErrorKind::InvalidBoundaryType,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Io(_) | Self::Polars(_) | Self::Serde(_) | Self::Toml(_) => ErrorKind::External,
        }
    }
}

pub type Result<T> = std::result::Result<T, SliceError>;
