use super::base::DataSplitter;
use super::embargo::EmbargoSplitBuilder;
use crate::audit::AuditLog;
use crate::config::{ConfigSection, HoldoutConfig};
use crate::data::TimeIndex;
use crate::error::{Result, SliceError};
use crate::types::{Boundary, Split, Timestamp, SLICE_ID_PREFIX};

/// Single train/dev/lockbox split cut at three end timestamps.
///
/// Each segment ends after the last bar at or before its end timestamp, less
/// `label_lookahead_bars` so its labels stay before that timestamp. The next
/// segment starts `embargo_bars` after the purged stop. The split goes through
/// the same embargo and lookahead checks as any other; an embargo wider than a
/// segment surfaces as `BoundaryOutOfRange` on that segment.
#[derive(Debug)]
pub struct HoldoutSplitter {
    config: HoldoutConfig,
}

impl HoldoutSplitter {
    pub fn new(config: HoldoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HoldoutConfig {
        &self.config
    }

    /// Train/dev/lockbox as `Split { train, validate: dev, test: lockbox }`; the
    /// split's own `lockbox` field stays `None`.
    pub fn split_holdout(&self, index: &TimeIndex, audit: &mut AuditLog) -> Result<Split> {
        let [train_stop, dev_stop, lockbox_stop] = self.end_positions(index).map_err(|err| {
            let input = format!(
                "holdout train_end={} dev_end={} lockbox_end={} over {} bars",
                self.config.train_end,
                self.config.dev_end,
                self.config.lockbox_end,
                index.len()
            );
            audit.record_rejection(input, err)
        })?;

        let embargo = self.config.embargo_bars;
        let lookahead = self.config.label_lookahead_bars;
        let dev_start = train_stop.saturating_sub(lookahead).saturating_add(embargo);
        let lockbox_start = dev_stop.saturating_sub(lookahead).saturating_add(embargo);

        let builder = EmbargoSplitBuilder::new(embargo, lookahead);
        let split = builder.build(
            &Boundary::index(0, train_stop),
            &Boundary::index(dev_start, dev_stop),
            &Boundary::index(lockbox_start, lockbox_stop),
            index,
            audit,
        )?;

        log::info!(
            "Holdout split train={} dev={} lockbox={} (embargo {}, lookahead {})",
            split.train,
            split.validate,
            split.test,
            embargo,
            lookahead
        );
        Ok(split.with_slice_id(format!("{}:holdout", SLICE_ID_PREFIX)))
    }

    fn end_positions(&self, index: &TimeIndex) -> Result<[usize; 3]> {
        self.config.validate()?;
        index.ensure_sorted()?;

        Ok([
            Self::end_position(index, &self.config.train_end, "train_end")?,
            Self::end_position(index, &self.config.dev_end, "dev_end")?,
            Self::end_position(index, &self.config.lockbox_end, "lockbox_end")?,
        ])
    }

    /// Exclusive stop: one past the last bar at or before `ts`.
    fn end_position(index: &TimeIndex, ts: &Timestamp, field: &'static str) -> Result<usize> {
        let instant = match (ts, index.timezone()) {
            (Timestamp::Naive(_), _) => return Err(SliceError::TimezoneNaive { field }),
            (Timestamp::Aware(_), None) => return Err(SliceError::TimezoneNaive { field: "index" }),
            (Timestamp::Aware(dt), Some(expected)) => {
                if *dt.offset() != expected {
                    return Err(SliceError::TimezoneMismatch {
                        field,
                        expected,
                        found: *dt.offset(),
                    });
                }
                dt.naive_utc()
            }
        };
        Ok(index.bisect_right(instant))
    }
}

impl DataSplitter for HoldoutSplitter {
    fn split(&self, index: &TimeIndex, audit: &mut AuditLog) -> Result<Vec<Split>> {
        Ok(vec![self.split_holdout(index, audit)?])
    }

    fn name(&self) -> &str {
        "Holdout"
    }
}
