use super::base::DataSplitter;
use super::embargo::EmbargoSplitBuilder;
use crate::audit::AuditLog;
use crate::config::{ConfigSection, SequenceConfig};
use crate::data::TimeIndex;
use crate::error::{Result, SliceError};
use crate::types::{Boundary, ResolvedRange, Segment, Split, SLICE_ID_PREFIX};

/// Slides a train/validate/test template across the index by `step_bars`.
///
/// Template at position `s` (T/V/X segment lengths, E embargo, L lookahead),
/// before the builder purges L bars off each segment:
/// train `[s, s+T)`, validate `[s+T-L+E, s+T+E+V)`, test `[s+T+E+V-L+E, s+T+2E+V+X)`.
/// After the purge the segments are separated by exactly E bars. The walk ends
/// once `s+T+2E+V+X` would run past the end of the index.
#[derive(Debug)]
pub struct WalkForwardPlanner {
    config: SequenceConfig,
    builder: EmbargoSplitBuilder,
}

impl WalkForwardPlanner {
    pub fn new(config: SequenceConfig) -> Self {
        let builder = EmbargoSplitBuilder::new(config.embargo_bars, config.label_lookahead_bars);
        Self { config, builder }
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// Validate the template against `index`, build the first split and return
    /// a lazy plan starting there.
    ///
    /// Every position shares the first one's shape, so a plan that builds its
    /// first split builds all of them. Failures are recorded as `RejectSplit`.
    pub fn plan<'a>(&'a self, index: &'a TimeIndex, audit: &mut AuditLog) -> Result<WalkForwardPlan<'a>> {
        let boundaries = self
            .preflight(index)
            .map_err(|err| audit.record_rejection(self.describe(index), err))?;
        let first = self.build_at(0, 0, &boundaries, index, audit)?;

        log::debug!("Walk-forward plan starts with {}", first);
        Ok(WalkForwardPlan {
            planner: self,
            index,
            first,
        })
    }

    fn describe(&self, index: &TimeIndex) -> String {
        let c = &self.config;
        format!(
            "walk-forward train={} validate={} test={} step={} embargo={} lookahead={} over {} bars",
            c.train_bars,
            c.validate_bars,
            c.test_bars,
            c.step_bars,
            c.embargo_bars,
            c.label_lookahead_bars,
            index.len()
        )
    }

    fn preflight(&self, index: &TimeIndex) -> Result<[Boundary; 3]> {
        self.config.validate()?;
        index.ensure_sorted()?;

        let boundaries = self
            .template_at(0, index.len())
            .ok_or_else(|| SliceError::NoCompleteSplits {
                len: index.len(),
                template_bars: self.config.template_bars(),
            })?;
        self.check_lookahead()?;
        Ok(boundaries)
    }

    /// Each purged stop must land past the raw stop of the segment before it
    /// (train: past its own start).
    fn check_lookahead(&self) -> Result<()> {
        let c = &self.config;
        let lookahead = c.label_lookahead_bars;
        let validate_start = c.train_bars.saturating_add(c.embargo_bars);
        let test_start = validate_start
            .saturating_add(c.validate_bars)
            .saturating_add(c.embargo_bars);

        let segments = [
            (Segment::Train, 0, c.train_bars, c.train_bars),
            (
                Segment::Validate,
                validate_start,
                c.validate_bars,
                c.validate_bars.saturating_add(c.embargo_bars),
            ),
            (
                Segment::Test,
                test_start,
                c.test_bars,
                c.test_bars.saturating_add(c.embargo_bars),
            ),
        ];

        for (segment, start, bars, room) in segments {
            if room <= lookahead {
                let range = ResolvedRange::new(start, start.saturating_add(bars));
                return Err(SliceError::LookaheadOverflow {
                    segment: Some(segment),
                    range,
                    lookahead_bars: lookahead,
                    bound: range.stop_idx,
                });
            }
        }
        Ok(())
    }

    fn template_at(&self, start: usize, len: usize) -> Option<[Boundary; 3]> {
        let c = &self.config;
        let lookahead = c.label_lookahead_bars;
        let train_stop = start.checked_add(c.train_bars)?;
        let validate_start = train_stop.saturating_sub(lookahead).checked_add(c.embargo_bars)?;
        let validate_stop = train_stop.checked_add(c.embargo_bars)?.checked_add(c.validate_bars)?;
        let test_start = validate_stop.saturating_sub(lookahead).checked_add(c.embargo_bars)?;
        let test_stop = validate_stop.checked_add(c.embargo_bars)?.checked_add(c.test_bars)?;

        if test_stop > len {
            return None;
        }

        Some([
            Boundary::index(start, train_stop),
            Boundary::index(validate_start, validate_stop),
            Boundary::index(test_start, test_stop),
        ])
    }

    fn build_at(
        &self,
        start: usize,
        fold: usize,
        boundaries: &[Boundary; 3],
        index: &TimeIndex,
        audit: &mut AuditLog,
    ) -> Result<Split> {
        let [train, validate, test] = boundaries;
        let split = self.builder.build(train, validate, test, index, audit)?;
        Ok(split.with_slice_id(format!(
            "{}:{}:start={}:end={}",
            SLICE_ID_PREFIX,
            fold,
            start,
            start.saturating_add(self.config.train_bars)
        )))
    }
}

impl DataSplitter for WalkForwardPlanner {
    fn split(&self, index: &TimeIndex, audit: &mut AuditLog) -> Result<Vec<Split>> {
        let plan = self.plan(index, audit)?;
        let splits = plan.collect_splits(audit);
        log::info!("Walk-forward plan produced {} splits over {} bars", splits.len(), index.len());
        Ok(splits)
    }

    fn name(&self) -> &str {
        "Walk-Forward"
    }
}

/// Accepted walk-forward plan over one index. Iterate with [`WalkForwardPlan::splits`];
/// each call restarts from the first split.
#[derive(Debug)]
pub struct WalkForwardPlan<'a> {
    planner: &'a WalkForwardPlanner,
    index: &'a TimeIndex,
    first: Split,
}

impl<'a> WalkForwardPlan<'a> {
    pub fn first(&self) -> &Split {
        &self.first
    }

    pub fn splits<'p>(&'p self, audit: &'p mut AuditLog) -> Splits<'p, 'a> {
        Splits {
            plan: self,
            audit,
            next_start: Some(0),
            fold: 0,
        }
    }

    pub fn collect_splits(&self, audit: &mut AuditLog) -> Vec<Split> {
        self.splits(audit).collect()
    }
}

/// Lazy walk over the remaining template positions of a plan.
#[derive(Debug)]
pub struct Splits<'p, 'a> {
    plan: &'p WalkForwardPlan<'a>,
    audit: &'p mut AuditLog,
    next_start: Option<usize>,
    fold: usize,
}

impl Iterator for Splits<'_, '_> {
    type Item = Split;

    fn next(&mut self) -> Option<Split> {
        let planner = self.plan.planner;
        let start = self.next_start?;
        self.next_start = start.checked_add(planner.config.step_bars);

        // The first position was already built while planning.
        if self.fold == 0 {
            self.fold = 1;
            return Some(self.plan.first.clone());
        }

        let boundaries = planner.template_at(start, self.plan.index.len())?;
        match planner.build_at(start, self.fold, &boundaries, self.plan.index, self.audit) {
            Ok(split) => {
                self.fold += 1;
                Some(split)
            }
            Err(err) => {
                // Unreachable once plan() accepted the first position; stop rather than skip.
                log::warn!("Walk-forward plan stopped at bar {}: {}", start, err);
                self.next_start = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditOperation;
    use crate::error::ErrorKind;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn hours(count: usize) -> TimeIndex {
        let start: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        TimeIndex::from_utc((0..count).map(|i| start + Duration::hours(i as i64)).collect())
    }

    fn config(train: usize, validate: usize, test: usize, step: usize) -> SequenceConfig {
        SequenceConfig::new(1, 1).with_walk_forward(train, validate, test, step)
    }

    fn overflowing_segment(err: SliceError) -> Option<Segment> {
        match err {
            SliceError::LookaheadOverflow { segment, .. } => segment,
            other => panic!("expected LookaheadOverflow, got {:?}", other),
        }
    }

    #[test]
    fn test_first_split_is_not_recomputed() {
        let index = hours(31);
        let planner = WalkForwardPlanner::new(config(5, 4, 3, 5));
        let mut audit = AuditLog::new();

        let plan = planner.plan(&index, &mut audit).unwrap();
        let builds_after_plan = audit.with_operation(AuditOperation::BuildSplit).count();
        assert_eq!(builds_after_plan, 1);

        let splits = plan.collect_splits(&mut audit);
        assert_eq!(splits.len(), 4);
        assert_eq!(audit.with_operation(AuditOperation::BuildSplit).count(), 4);
        assert_eq!(splits[0], *plan.first());
    }

    #[test]
    fn test_plan_is_restartable() {
        let index = hours(31);
        let planner = WalkForwardPlanner::new(config(5, 4, 3, 5));
        let mut audit = AuditLog::new();

        let plan = planner.plan(&index, &mut audit).unwrap();
        let first_pass = plan.collect_splits(&mut audit);
        let second_pass = plan.collect_splits(&mut audit);
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn test_lookahead_purges_template_segments() {
        let index = hours(32);
        let planner = WalkForwardPlanner::new(config(5, 4, 3, 5).with_labels(1, 1));
        let mut audit = AuditLog::new();

        let splits = planner.split(&index, &mut audit).unwrap();
        assert_eq!(splits.len(), 5);
        assert_eq!(splits[0].train, ResolvedRange::new(0, 4));
        assert_eq!(splits[0].validate, ResolvedRange::new(4, 8));
        assert_eq!(splits[0].test, ResolvedRange::new(8, 11));
        assert_eq!(splits[4].train, ResolvedRange::new(20, 24));
        assert_eq!(splits[4].slice_id, "time_window:4:start=20:end=25");
    }

    #[test]
    fn test_lookahead_with_embargo_keeps_exact_gaps() {
        let index = hours(40);
        let planner = WalkForwardPlanner::new(config(6, 4, 4, 6).with_labels(2, 1).with_embargo(1));
        let mut audit = AuditLog::new();

        let splits = planner.split(&index, &mut audit).unwrap();
        assert_eq!(splits[0].train, ResolvedRange::new(0, 4));
        assert_eq!(splits[0].validate, ResolvedRange::new(5, 9));
        assert_eq!(splits[0].test, ResolvedRange::new(10, 14));
        for split in &splits {
            assert_eq!(split.embargo_before_validate, 1);
            assert_eq!(split.embargo_before_test, 1);
        }
    }

    #[test]
    fn test_lookahead_too_large_for_each_segment() {
        let index = hours(20);

        let train = WalkForwardPlanner::new(config(3, 2, 2, 2).with_labels(3, 1));
        let err = train.plan(&index, &mut AuditLog::new()).unwrap_err();
        assert_eq!(overflowing_segment(err), Some(Segment::Train));

        let validate = WalkForwardPlanner::new(config(3, 2, 2, 2).with_labels(2, 1));
        let err = validate.plan(&index, &mut AuditLog::new()).unwrap_err();
        assert_eq!(overflowing_segment(err), Some(Segment::Validate));

        let test = WalkForwardPlanner::new(config(3, 3, 1, 5).with_labels(1, 1));
        let err = test.plan(&index, &mut AuditLog::new()).unwrap_err();
        assert_eq!(overflowing_segment(err), Some(Segment::Test));
    }

    #[test]
    fn test_lookahead_rejection_is_audited() {
        // a 2-bar test segment cannot hold a 2-bar lookahead
        let index = hours(20);
        let planner = WalkForwardPlanner::new(config(4, 3, 2, 4).with_labels(2, 1));
        let mut audit = AuditLog::new();

        let err = planner.plan(&index, &mut audit).unwrap_err();
        match err {
            SliceError::LookaheadOverflow {
                segment,
                range,
                bound,
                ..
            } => {
                assert_eq!(segment, Some(Segment::Test));
                assert_eq!(range, ResolvedRange::new(7, 9));
                assert_eq!(bound, 9);
            }
            other => panic!("expected LookaheadOverflow, got {:?}", other),
        }
        assert_eq!(audit.len(), 1);
        assert_eq!(audit.rejected().count(), 1);
        assert_eq!(audit.entries()[0].failure, Some(ErrorKind::LookaheadOverflow));
    }

    #[test]
    fn test_invalid_config_is_audited() {
        let index = hours(20);
        let planner = WalkForwardPlanner::new(config(4, 3, 2, 0));
        let mut audit = AuditLog::new();

        let err = planner.plan(&index, &mut audit).unwrap_err();
        assert!(matches!(err, SliceError::Configuration(_)));
        assert_eq!(audit.rejected().count(), 1);
        assert!(audit.entries()[0].input_summary.contains("step=0"));
    }

    #[test]
    fn test_huge_template_does_not_overflow() {
        let index = hours(20);
        let mut audit = AuditLog::new();

        let planner = WalkForwardPlanner::new(config(usize::MAX / 4, 4, 4, 1));
        let err = planner.plan(&index, &mut audit).unwrap_err();
        match err {
            SliceError::NoCompleteSplits { len, template_bars } => {
                assert_eq!(len, 20);
                assert_eq!(template_bars, usize::MAX / 4 + 8);
            }
            other => panic!("expected NoCompleteSplits, got {:?}", other),
        }

        let wrapping = WalkForwardPlanner::new(config(usize::MAX - 1, 4, 4, 1).with_embargo(usize::MAX / 2));
        let err = wrapping.plan(&index, &mut audit).unwrap_err();
        assert!(matches!(err, SliceError::Configuration(_)));
        assert_eq!(audit.rejected().count(), 2);
    }

    #[test]
    fn test_huge_step_ends_the_walk() {
        let index = hours(20);
        let planner = WalkForwardPlanner::new(config(4, 3, 2, usize::MAX));
        let mut audit = AuditLog::new();

        let splits = planner.split(&index, &mut audit).unwrap();
        assert_eq!(splits.len(), 1);
    }

    #[test]
    fn test_slice_ids_count_accepted_folds() {
        let index = hours(31);
        let planner = WalkForwardPlanner::new(config(5, 4, 3, 5));
        let mut audit = AuditLog::new();

        let splits = planner.split(&index, &mut audit).unwrap();
        assert_eq!(splits[0].slice_id, "time_window:0:start=0:end=5");
        assert_eq!(splits[1].slice_id, "time_window:1:start=5:end=10");
        assert_eq!(splits[3].test, ResolvedRange::new(24, 27));
        assert!(format!("{:?}", planner).starts_with("WalkForwardPlanner"));
    }
}
