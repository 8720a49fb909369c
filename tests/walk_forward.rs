use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use tradeslice::audit::{AuditLog, AuditOperation};
use tradeslice::config::SequenceConfig;
use tradeslice::data::TimeIndex;
use tradeslice::engines::splitters::{DataSplitter, WalkForwardPlanner};
use tradeslice::error::SliceError;
use tradeslice::types::{ResolvedRange, Split};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn hourly(count: usize) -> TimeIndex {
    let start: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    TimeIndex::from_utc((0..count).map(|i| start + Duration::hours(i as i64)).collect())
}

fn planner(train: usize, validate: usize, test: usize, step: usize, embargo: usize) -> WalkForwardPlanner {
    WalkForwardPlanner::new(
        SequenceConfig::new(1, 1)
            .with_walk_forward(train, validate, test, step)
            .with_embargo(embargo),
    )
}

fn ranges(split: &Split) -> [(usize, usize); 3] {
    [
        (split.train.start_idx, split.train.stop_idx),
        (split.validate.start_idx, split.validate.stop_idx),
        (split.test.start_idx, split.test.stop_idx),
    ]
}

#[test]
fn test_walk_forward_without_embargo() {
    init_logger();
    let index = hourly(31);
    let mut audit = AuditLog::new();

    let splits = planner(5, 4, 3, 5, 0).split(&index, &mut audit).unwrap();

    assert_eq!(splits.len(), 4);
    assert_eq!(ranges(&splits[0]), [(0, 5), (5, 9), (9, 12)]);
    assert_eq!(ranges(&splits[1]), [(5, 10), (10, 14), (14, 17)]);
    assert_eq!(ranges(&splits[3]), [(15, 20), (20, 24), (24, 27)]);
}

#[test]
fn test_walk_forward_with_embargo() {
    init_logger();
    let index = hourly(20);
    let mut audit = AuditLog::new();

    let splits = planner(4, 3, 2, 4, 1).split(&index, &mut audit).unwrap();

    assert_eq!(splits.len(), 3);
    assert_eq!(ranges(&splits[0]), [(0, 4), (5, 8), (9, 11)]);
    assert_eq!(ranges(&splits[2]), [(8, 12), (13, 16), (17, 19)]);

    for split in &splits {
        assert_eq!(split.embargo_before_validate, 1);
        assert_eq!(split.embargo_before_test, 1);
        assert!(split.train.stop_idx + 1 <= split.validate.start_idx);
        assert!(split.validate.stop_idx + 1 <= split.test.start_idx);
        assert!(split.test.stop_idx <= index.len());
    }
}

#[test]
fn test_starts_advance_by_step() {
    let index = hourly(200);
    let mut audit = AuditLog::new();

    let splits = planner(40, 20, 20, 15, 2).split(&index, &mut audit).unwrap();
    let starts: Vec<usize> = splits.iter().map(|s| s.train.start_idx).collect();

    assert_eq!(starts[0], 0);
    assert!(starts.windows(2).all(|pair| pair[1] - pair[0] == 15));
    assert_eq!(*starts.last().unwrap(), 105);
}

#[test]
fn test_plan_is_deterministic() {
    let index = hourly(120);
    let planner = planner(30, 10, 10, 7, 3);

    let mut first_audit = AuditLog::new();
    let mut second_audit = AuditLog::new();
    let first = planner.split(&index, &mut first_audit).unwrap();
    let second = planner.split(&index, &mut second_audit).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_audit.len(), second_audit.len());
}

#[test]
fn test_template_longer_than_index() {
    init_logger();
    let index = hourly(10);
    let mut audit = AuditLog::new();

    let err = planner(6, 3, 3, 1, 0).split(&index, &mut audit).unwrap_err();
    match err {
        SliceError::NoCompleteSplits { len, template_bars } => {
            assert_eq!(len, 10);
            assert_eq!(template_bars, 12);
        }
        other => panic!("expected NoCompleteSplits, got {:?}", other),
    }
    assert_eq!(audit.len(), 1);
    assert_eq!(audit.rejected().count(), 1);
}

#[test]
fn test_lookahead_trims_segment_stops() {
    init_logger();
    let index = hourly(32);
    let mut audit = AuditLog::new();

    let planner = WalkForwardPlanner::new(
        SequenceConfig::new(1, 1)
            .with_walk_forward(5, 4, 3, 5)
            .with_labels(1, 1),
    );
    let splits = planner.split(&index, &mut audit).unwrap();

    assert_eq!(splits.len(), 5);
    assert_eq!(ranges(&splits[0]), [(0, 4), (4, 8), (8, 11)]);
    assert_eq!(ranges(&splits[1]), [(5, 9), (9, 13), (13, 16)]);
    for split in &splits {
        assert!(split.test.stop_idx + 1 <= index.len());
    }
}

#[test]
fn test_lazy_plan_matches_eager_split() {
    let index = hourly(64);
    let planner = planner(12, 6, 6, 4, 1);
    let mut audit = AuditLog::new();

    let plan = planner.plan(&index, &mut audit).unwrap();
    let first_two: Vec<Split> = plan.splits(&mut audit).take(2).collect();
    let eager = planner.split(&index, &mut AuditLog::new()).unwrap();

    assert_eq!(first_two[..], eager[..2]);
    assert_eq!(*plan.first(), eager[0]);
}

#[test]
fn test_every_accepted_split_is_audited() {
    let index = hourly(50);
    let mut audit = AuditLog::new();

    let splits = planner(10, 5, 5, 5, 0).split(&index, &mut audit).unwrap();

    assert_eq!(audit.with_operation(AuditOperation::BuildSplit).count(), splits.len());
    assert_eq!(audit.rejected().count(), 0);
    // three boundary resolutions per accepted split
    assert_eq!(audit.with_operation(AuditOperation::ResolveBoundary).count(), 3 * splits.len());
}

#[test]
fn test_unsorted_index_fails_before_planning() {
    let start: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let mut stamps: Vec<_> = (0..30).map(|i| start + Duration::hours(i)).collect();
    stamps.swap(10, 11);
    let index = TimeIndex::from_utc(stamps);
    let mut audit = AuditLog::new();

    let err = planner(5, 4, 3, 5, 0).split(&index, &mut audit).unwrap_err();
    assert!(matches!(err, SliceError::UnsortedTimestamps { position: 11, .. }));
    assert_eq!(audit.rejected().count(), 1);
}

#[test]
fn test_offset_index_plans_on_positions() {
    let tz = FixedOffset::east_opt(2 * 3600).unwrap();
    let start = tz.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let index = TimeIndex::from_fixed((0..24).map(|i| start + Duration::hours(i)).collect()).unwrap();
    let mut audit = AuditLog::new();

    let splits = planner(8, 4, 4, 8, 0).split(&index, &mut audit).unwrap();

    assert_eq!(splits.len(), 2);
    assert_eq!(splits[1].test, ResolvedRange::new(20, 24));
}
