use super::traits::ConfigSection;
use crate::error::SliceError;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Train/dev/lockbox cut points for a single holdout split.
///
/// Each end timestamp is inclusive: the segment keeps every bar at or before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutConfig {
    pub train_end: Timestamp,
    pub dev_end: Timestamp,
    pub lockbox_end: Timestamp,
    #[serde(default)]
    pub label_lookahead_bars: usize,
    #[serde(default)]
    pub embargo_bars: usize,
}

impl HoldoutConfig {
    pub fn new(train_end: impl Into<Timestamp>, dev_end: impl Into<Timestamp>, lockbox_end: impl Into<Timestamp>) -> Self {
        Self {
            train_end: train_end.into(),
            dev_end: dev_end.into(),
            lockbox_end: lockbox_end.into(),
            label_lookahead_bars: 0,
            embargo_bars: 0,
        }
    }

    pub fn with_lookahead(mut self, label_lookahead_bars: usize) -> Self {
        self.label_lookahead_bars = label_lookahead_bars;
        self
    }

    pub fn with_embargo(mut self, embargo_bars: usize) -> Self {
        self.embargo_bars = embargo_bars;
        self
    }
}

impl ConfigSection for HoldoutConfig {
    fn section_name() -> &'static str {
        "holdout"
    }

    fn validate(&self) -> Result<(), SliceError> {
        let ordered = match (self.train_end, self.dev_end, self.lockbox_end) {
            (Timestamp::Aware(t), Timestamp::Aware(d), Timestamp::Aware(l)) => t < d && d < l,
            (Timestamp::Naive(t), Timestamp::Naive(d), Timestamp::Naive(l)) => t < d && d < l,
            _ => {
                return Err(SliceError::Configuration(
                    "Holdout end timestamps must all be timezone-aware or all naive".to_string(),
                ))
            }
        };

        if !ordered {
            return Err(SliceError::Configuration(format!(
                "Holdout requires train_end < dev_end < lockbox_end, got {} / {} / {}",
                self.train_end, self.dev_end, self.lockbox_end
            )));
        }
        Ok(())
    }
}
