use super::traits::{require_positive, ConfigSection};
use crate::error::SliceError;
use serde::{Deserialize, Serialize};

/// Window geometry, label placement and walk-forward template, in bars.
///
/// `label_lookahead_bars` and `embargo_bars` use zero as the "disabled" value;
/// every other field must be positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub window_length: usize,
    pub stride: usize,
    pub label_lookahead_bars: usize,
    pub label_width: usize,
    pub embargo_bars: usize,
    pub step_bars: usize,
    pub train_bars: usize,
    pub validate_bars: usize,
    pub test_bars: usize,
    pub patch_size: usize,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            window_length: 64,
            stride: 1,
            label_lookahead_bars: 0,
            label_width: 1,
            embargo_bars: 0,
            step_bars: 128,
            train_bars: 512,
            validate_bars: 128,
            test_bars: 128,
            patch_size: 1,
        }
    }
}

impl SequenceConfig {
    pub fn new(window_length: usize, stride: usize) -> Self {
        Self {
            window_length,
            stride,
            ..Self::default()
        }
    }

    pub fn with_labels(mut self, lookahead_bars: usize, label_width: usize) -> Self {
        self.label_lookahead_bars = lookahead_bars;
        self.label_width = label_width;
        self
    }

    pub fn with_embargo(mut self, embargo_bars: usize) -> Self {
        self.embargo_bars = embargo_bars;
        self
    }

    pub fn with_walk_forward(mut self, train_bars: usize, validate_bars: usize, test_bars: usize, step_bars: usize) -> Self {
        self.train_bars = train_bars;
        self.validate_bars = validate_bars;
        self.test_bars = test_bars;
        self.step_bars = step_bars;
        self
    }

    pub fn with_patch_size(mut self, patch_size: usize) -> Self {
        self.patch_size = patch_size;
        self
    }

    pub fn window_patches(&self) -> usize {
        self.window_length / self.patch_size.max(1)
    }

    /// Bars after the feature window that a supervised label reaches.
    pub fn horizon_bars(&self) -> usize {
        self.label_lookahead_bars.saturating_add(self.label_width)
    }

    pub fn horizon_patches(&self) -> usize {
        self.horizon_bars() / self.patch_size.max(1)
    }

    /// Feature window plus label horizon.
    pub fn full_bars(&self) -> usize {
        self.window_length.saturating_add(self.horizon_bars())
    }

    pub fn full_patches(&self) -> usize {
        self.full_bars() / self.patch_size.max(1)
    }

    /// Bars covered by one train/validate/test template including both embargo gaps.
    ///
    /// Saturates at `usize::MAX`; `validate` rejects templates that would.
    pub fn template_bars(&self) -> usize {
        self.checked_template_bars().unwrap_or(usize::MAX)
    }

    /// Bars a supervised window needs: features, lookahead gap and label.
    pub fn supervised_span(&self) -> usize {
        self.full_bars()
    }

    pub fn summary(&self) -> SequenceSummary {
        SequenceSummary {
            window_bars: self.window_length,
            horizon_bars: self.horizon_bars(),
            patch_size: self.patch_size,
            full_bars: self.full_bars(),
            window_patches: self.window_patches(),
            horizon_patches: self.horizon_patches(),
            full_patches: self.full_patches(),
        }
    }

    fn checked_template_bars(&self) -> Option<usize> {
        self.train_bars
            .checked_add(self.embargo_bars)?
            .checked_add(self.validate_bars)?
            .checked_add(self.embargo_bars)?
            .checked_add(self.test_bars)
    }

    fn checked_full_bars(&self) -> Option<usize> {
        self.window_length
            .checked_add(self.label_lookahead_bars)?
            .checked_add(self.label_width)
    }
}

/// Derived window and patch sizes, as recorded next to a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSummary {
    pub window_bars: usize,
    pub horizon_bars: usize,
    pub patch_size: usize,
    pub full_bars: usize,
    pub window_patches: usize,
    pub horizon_patches: usize,
    pub full_patches: usize,
}

impl ConfigSection for SequenceConfig {
    fn section_name() -> &'static str {
        "sequence"
    }

    fn validate(&self) -> Result<(), SliceError> {
        require_positive::<Self>("window_length", self.window_length)?;
        require_positive::<Self>("stride", self.stride)?;
        require_positive::<Self>("label_width", self.label_width)?;
        require_positive::<Self>("step_bars", self.step_bars)?;
        require_positive::<Self>("train_bars", self.train_bars)?;
        require_positive::<Self>("validate_bars", self.validate_bars)?;
        require_positive::<Self>("test_bars", self.test_bars)?;
        require_positive::<Self>("patch_size", self.patch_size)?;

        if self.checked_full_bars().is_none() {
            return Err(SliceError::Configuration(
                "window_length + label_lookahead_bars + label_width overflows usize".to_string(),
            ));
        }
        if self.checked_template_bars().is_none() {
            return Err(SliceError::Configuration(
                "walk-forward template (train + validate + test + 2 * embargo) overflows usize".to_string(),
            ));
        }

        for (field, bars) in [
            ("window_length", self.window_length),
            ("label horizon", self.horizon_bars()),
        ] {
            if bars % self.patch_size != 0 {
                return Err(SliceError::Configuration(format!(
                    "{} ({}) must be divisible by patch_size ({})",
                    field, bars, self.patch_size
                )));
            }
        }
        Ok(())
    }
}
