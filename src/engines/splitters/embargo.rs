use super::resolver::BoundaryResolver;
use crate::audit::{AuditLog, AuditLogEntry, AuditOperation};
use crate::data::TimeIndex;
use crate::error::{Result, SliceError};
use crate::types::{Boundary, ResolvedRange, Segment, Split, SLICE_ID_PREFIX};

/// Resolves train/validate/test (and optionally lockbox) boundaries into a
/// single leakage-safe `Split`.
///
/// Each resolved segment is purged by `lookahead_bars`: its stop moves back so
/// that the label of its last bar still falls inside the boundary the caller
/// gave. A purge that empties a segment fails with `LookaheadOverflow`. The
/// purged segments must be ordered and separated by at least `embargo_bars`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbargoSplitBuilder {
    embargo_bars: usize,
    lookahead_bars: usize,
}

impl EmbargoSplitBuilder {
    pub fn new(embargo_bars: usize, lookahead_bars: usize) -> Self {
        Self {
            embargo_bars,
            lookahead_bars,
        }
    }

    pub fn embargo_bars(&self) -> usize {
        self.embargo_bars
    }

    pub fn lookahead_bars(&self) -> usize {
        self.lookahead_bars
    }

    pub fn build(
        &self,
        train: &Boundary,
        validate: &Boundary,
        test: &Boundary,
        index: &TimeIndex,
        audit: &mut AuditLog,
    ) -> Result<Split> {
        self.build_segments(train, validate, test, None, index, audit)
    }

    /// Same as [`build`](Self::build) with a trailing lockbox segment, held to
    /// the same purge and embargo rules after `test`.
    pub fn build_with_lockbox(
        &self,
        train: &Boundary,
        validate: &Boundary,
        test: &Boundary,
        lockbox: &Boundary,
        index: &TimeIndex,
        audit: &mut AuditLog,
    ) -> Result<Split> {
        self.build_segments(train, validate, test, Some(lockbox), index, audit)
    }

    fn build_segments(
        &self,
        train: &Boundary,
        validate: &Boundary,
        test: &Boundary,
        lockbox: Option<&Boundary>,
        index: &TimeIndex,
        audit: &mut AuditLog,
    ) -> Result<Split> {
        let mut input = format!("train={} validate={} test={}", train, validate, test);
        if let Some(lockbox) = lockbox {
            input.push_str(&format!(" lockbox={}", lockbox));
        }
        input.push_str(&format!(" embargo={} lookahead={}", self.embargo_bars, self.lookahead_bars));

        match self.try_build(train, validate, test, lockbox, index, audit) {
            Ok(split) => {
                log::debug!("Built split {}", split);
                audit.record(AuditLogEntry::success(AuditOperation::BuildSplit, input, split.to_string()));
                Ok(split)
            }
            Err(err) => {
                log::debug!("Rejected split ({}): {}", input, err);
                audit.record(AuditLogEntry::failure(AuditOperation::RejectSplit, input, &err));
                Err(err)
            }
        }
    }

    fn try_build(
        &self,
        train: &Boundary,
        validate: &Boundary,
        test: &Boundary,
        lockbox: Option<&Boundary>,
        index: &TimeIndex,
        audit: &mut AuditLog,
    ) -> Result<Split> {
        let train = BoundaryResolver::resolve(train, index, audit)?;
        let validate = BoundaryResolver::resolve(validate, index, audit)?;
        let test = BoundaryResolver::resolve(test, index, audit)?;
        let lockbox = match lockbox {
            Some(boundary) => Some(BoundaryResolver::resolve(boundary, index, audit)?),
            None => None,
        };

        let train = self.purge(Segment::Train, train)?;
        let validate = self.purge(Segment::Validate, validate)?;
        let test = self.purge(Segment::Test, test)?;
        let lockbox = match lockbox {
            Some(range) => Some(self.purge(Segment::Lockbox, range)?),
            None => None,
        };

        self.check_gap(Segment::Train, train, Segment::Validate, validate)?;
        self.check_gap(Segment::Validate, validate, Segment::Test, test)?;
        if let Some(lockbox) = lockbox {
            self.check_gap(Segment::Test, test, Segment::Lockbox, lockbox)?;
        }

        Ok(Split {
            train,
            validate,
            test,
            embargo_before_validate: validate.start_idx - train.stop_idx,
            embargo_before_test: test.start_idx - validate.stop_idx,
            lockbox,
            slice_id: format!("{}:auto", SLICE_ID_PREFIX),
        })
    }

    /// Pull `stop_idx` back by the lookahead so no label leaves `range`.
    fn purge(&self, segment: Segment, range: ResolvedRange) -> Result<ResolvedRange> {
        match range.stop_idx.checked_sub(self.lookahead_bars) {
            Some(stop) if stop > range.start_idx => Ok(ResolvedRange::new(range.start_idx, stop)),
            _ => Err(SliceError::LookaheadOverflow {
                segment: Some(segment),
                range,
                lookahead_bars: self.lookahead_bars,
                bound: range.stop_idx,
            }),
        }
    }

    fn check_gap(&self, before: Segment, left: ResolvedRange, after: Segment, right: ResolvedRange) -> Result<()> {
        if left.stop_idx.saturating_add(self.embargo_bars) > right.start_idx {
            return Err(SliceError::EmbargoViolation {
                before,
                after,
                before_stop: left.stop_idx,
                after_start: right.start_idx,
                embargo_bars: self.embargo_bars,
            });
        }
        Ok(())
    }
}
