use chrono::{DateTime, Duration, TimeZone, Utc};
use polars::df;
use polars::prelude::*;
use tradeslice::audit::{AuditLog, AuditOperation};
use tradeslice::config::DatasetConfig;
use tradeslice::data::{compute_hash, DatasetManifest, TimeIndex};
use tradeslice::engines::splitters::{DataSplitter, HoldoutSplitter, WalkForwardPlanner};
use tradeslice::engines::windowing::{WindowMode, WindowingEngine};
use tradeslice::error::SliceError;
use tradeslice::types::{ResolvedRange, Segment};

const CONFIG: &str = r#"
[sequence]
window_length = 6
stride = 2
label_lookahead_bars = 1
label_width = 1
embargo_bars = 2
train_bars = 16
validate_bars = 8
test_bars = 8
step_bars = 8

[schema]
name = "bars"
features = [
    { name = "close" },
    { name = "volume" },
]

[holdout]
train_end = "2024-01-01T19:00:00Z"
dev_end = "2024-01-02T09:00:00Z"
lockbox_end = "2024-01-02T23:00:00Z"
label_lookahead_bars = 1
embargo_bars = 2

[[splits]]
slice_id = "manual:0"
train = { start = 0, stop = 20 }
validate = { start = 21, stop = 34 }
test = { start = "2024-01-02T11:00:00Z", stop = "2024-01-03T00:00:00Z" }
"#;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn stamps(count: usize) -> Vec<DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..count).map(|i| start + Duration::hours(i as i64)).collect()
}

fn frame(count: usize) -> DataFrame {
    let close: Vec<f64> = (0..count).map(|i| 100.0 + i as f64).collect();
    let volume: Vec<i64> = (0..count).map(|i| 1_000 + i as i64).collect();
    df!("volume" => volume, "close" => close).unwrap()
}

#[test]
fn test_manual_split_to_materialized_windows() {
    init_logger();
    let config = DatasetConfig::from_toml_str(CONFIG).unwrap();
    let index = TimeIndex::from_utc(stamps(48));
    let mut audit = AuditLog::new();

    let splits = config.build_manual_splits(&index, &mut audit).unwrap();
    assert_eq!(splits.len(), 1);
    let split = &splits[0];
    assert_eq!(split.slice_id, "manual:0");
    // lookahead 1 trims the last bar off every segment
    assert_eq!(split.train, ResolvedRange::new(0, 19));
    assert_eq!(split.validate, ResolvedRange::new(21, 33));
    assert_eq!(split.test, ResolvedRange::new(35, 47));
    assert_eq!(split.lockbox, None);

    let engine = WindowingEngine::new(&config.sequence, &config.schema).unwrap();
    let windows = engine.split_windows(split, WindowMode::Supervised).unwrap();
    assert_eq!(windows.segment(Segment::Train).map(|w| w.len()), Some(6));
    assert_eq!(windows.validate.len(), 3);
    assert_eq!(windows.test.len(), 3);
    assert!(windows.segment(Segment::Lockbox).is_none());

    for window in windows.test.clone() {
        let label = window.label_range.unwrap();
        assert!(split.test.contains(&window.feature_range));
        assert!(split.test.contains(&label));
    }

    let aligned = engine.align(&frame(48)).unwrap();
    let first = windows.train.clone().next().unwrap();
    let view = engine.materialize(&aligned, &first).unwrap();

    assert_eq!(view.features.shape(), (6, 2));
    let labels = view.labels.unwrap();
    let close = labels.column("close").unwrap().f64().unwrap().get(0);
    assert_eq!(close, Some(107.0));
    let volume = labels.column("volume").unwrap().f64().unwrap().get(0);
    assert_eq!(volume, Some(1_007.0));
}

#[test]
fn test_holdout_matches_equivalent_manual_split() {
    let config = DatasetConfig::from_toml_str(CONFIG).unwrap();
    let index = TimeIndex::from_utc(stamps(48));
    let mut audit = AuditLog::new();

    let manual = config.build_manual_splits(&index, &mut audit).unwrap();
    let holdout = HoldoutSplitter::new(config.holdout.clone().unwrap())
        .split_holdout(&index, &mut audit)
        .unwrap();

    assert_eq!(holdout.train, manual[0].train);
    assert_eq!(holdout.dev(), manual[0].validate);
    assert_eq!(holdout.test, manual[0].test);
}

#[test]
fn test_splitters_behind_trait_objects() {
    init_logger();
    let config = DatasetConfig::from_toml_str(CONFIG).unwrap();
    let index = TimeIndex::from_utc(stamps(48));

    let splitters: Vec<Box<dyn DataSplitter>> = vec![
        Box::new(WalkForwardPlanner::new(config.sequence.clone())),
        Box::new(HoldoutSplitter::new(config.holdout.clone().unwrap())),
    ];

    let counts: Vec<(String, usize)> = splitters
        .iter()
        .map(|splitter| {
            let mut audit = AuditLog::new();
            let splits = splitter.split(&index, &mut audit).unwrap();
            (splitter.name().to_string(), splits.len())
        })
        .collect();

    assert_eq!(counts[0], ("Walk-Forward".to_string(), 2));
    assert_eq!(counts[1], ("Holdout".to_string(), 1));
}

#[test]
fn test_manifest_records_hashes_and_audit() {
    let config = DatasetConfig::from_toml_str(CONFIG).unwrap();
    let index = TimeIndex::from_utc(stamps(48));
    let mut audit = AuditLog::new();

    let splits = config.build_manual_splits(&index, &mut audit).unwrap();
    let manifest = DatasetManifest::new(&config.schema, &config.sequence, splits, audit)
        .unwrap()
        .with_metadata("rows", 48);

    assert_eq!(manifest.schema_hash, compute_hash(&config.schema).unwrap());
    assert_eq!(manifest.config_hash, compute_hash(&config.sequence).unwrap());
    assert_eq!(manifest.audit.len(), 4);
    assert_eq!(manifest.audit[3].operation, AuditOperation::BuildSplit);

    let json = manifest.to_json().unwrap();
    let parsed: DatasetManifest = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.splits, manifest.splits);
    assert_eq!(parsed.metadata["rows"], serde_json::json!(48));
}

#[test]
fn test_naive_index_rejects_datetime_split() {
    let config = DatasetConfig::from_toml_str(CONFIG).unwrap();
    let naive = stamps(48).into_iter().map(|dt| dt.naive_utc()).collect();
    let index = TimeIndex::from_naive(naive);
    let mut audit = AuditLog::new();

    let err = config.build_manual_splits(&index, &mut audit).unwrap_err();
    assert!(matches!(err, SliceError::TimezoneNaive { field: "index" }));
    assert_eq!(audit.rejected().count(), 1);
}

#[test]
fn test_embargo_wider_than_config_gap() {
    let contents = CONFIG.replace("embargo_bars = 2\ntrain_bars", "embargo_bars = 3\ntrain_bars");
    let config = DatasetConfig::from_toml_str(&contents).unwrap();
    let index = TimeIndex::from_utc(stamps(48));
    let mut audit = AuditLog::new();

    let err = config.build_manual_splits(&index, &mut audit).unwrap_err();
    match err {
        SliceError::EmbargoViolation {
            before,
            after,
            embargo_bars,
            ..
        } => {
            assert_eq!(before, Segment::Train);
            assert_eq!(after, Segment::Validate);
            assert_eq!(embargo_bars, 3);
        }
        other => panic!("expected EmbargoViolation, got {:?}", other),
    }
}
