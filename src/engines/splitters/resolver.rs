use crate::audit::{AuditLog, AuditLogEntry, AuditOperation};
use crate::data::TimeIndex;
use crate::error::{Result, SliceError};
use crate::types::{Boundary, ResolvedRange, Timestamp};
use chrono::{FixedOffset, NaiveDateTime};

/// Turns boundary specifications into concrete index ranges.
pub struct BoundaryResolver;

impl BoundaryResolver {
    /// Resolve `boundary` against `index`, recording the attempt in `audit`.
    pub fn resolve(boundary: &Boundary, index: &TimeIndex, audit: &mut AuditLog) -> Result<ResolvedRange> {
        let input = boundary.to_string();
        match Self::try_resolve(boundary, index) {
            Ok(range) => {
                log::debug!("Resolved {} to {}", input, range);
                audit.record(AuditLogEntry::success(
                    AuditOperation::ResolveBoundary,
                    input,
                    range.to_string(),
                ));
                Ok(range)
            }
            Err(err) => {
                log::debug!("Failed to resolve {}: {}", input, err);
                audit.record(AuditLogEntry::failure(AuditOperation::ResolveBoundary, input, &err));
                Err(err)
            }
        }
    }

    fn try_resolve(boundary: &Boundary, index: &TimeIndex) -> Result<ResolvedRange> {
        index.ensure_sorted()?;

        let range = match *boundary {
            Boundary::IndexRange { start, stop } => {
                if start > stop || stop > index.len() {
                    return Err(SliceError::BoundaryOutOfRange {
                        start,
                        stop,
                        len: index.len(),
                    });
                }
                ResolvedRange::new(start, stop)
            }
            Boundary::DatetimeRange { start, stop } => {
                let (start_at, stop_at) = Self::instants(&start, &stop, index)?;
                let start_idx = index.bisect_left(start_at);
                // a reversed range collapses to empty instead of inverting
                let stop_idx = index.bisect_left(stop_at).max(start_idx);
                ResolvedRange::new(start_idx, stop_idx)
            }
        };

        if range.is_empty() {
            return Err(SliceError::EmptyResolvedRange {
                start_idx: range.start_idx,
                stop_idx: range.stop_idx,
                requested: boundary.to_string(),
            });
        }
        Ok(range)
    }

    /// UTC instants of an aware boundary pair whose offsets match the index.
    /// A naive end on either side is reported before any offset mismatch.
    fn instants(start: &Timestamp, stop: &Timestamp, index: &TimeIndex) -> Result<(NaiveDateTime, NaiveDateTime)> {
        let (start, stop) = match (start, stop) {
            (Timestamp::Aware(start), Timestamp::Aware(stop)) => (start, stop),
            (Timestamp::Naive(_), _) => return Err(SliceError::TimezoneNaive { field: "start" }),
            (_, Timestamp::Naive(_)) => return Err(SliceError::TimezoneNaive { field: "stop" }),
        };

        let expected: FixedOffset = index.timezone().ok_or(SliceError::TimezoneNaive { field: "index" })?;
        for (field, dt) in [("start", start), ("stop", stop)] {
            if *dt.offset() != expected {
                return Err(SliceError::TimezoneMismatch {
                    field,
                    expected,
                    found: *dt.offset(),
                });
            }
        }
        Ok((start.naive_utc(), stop.naive_utc()))
    }
}
