use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::traits::ConfigSection;
use crate::config::SequenceConfig;
use crate::data::FeatureSchema;
use crate::error::{Result, SliceError};
use crate::types::{ResolvedRange, Segment, Split};

/// Value written into schema columns the source frame does not carry.
pub const MISSING_FEATURE_FILL: f64 = 0.0;

/// Column compared across views by [`WindowingEngine::ssl_multiview`].
pub const TIMESTAMP_COLUMN: &str = "timestamp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Feature windows only; targets come from the window itself.
    Ssl,
    /// Feature window paired with a label window `lookahead` bars after it.
    Supervised,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    pub feature_range: ResolvedRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_range: Option<ResolvedRange>,
}

/// Polars views of one window, sliced from a schema-aligned frame.
#[derive(Debug, Clone)]
pub struct MaterializedWindow {
    pub features: DataFrame,
    pub labels: Option<DataFrame>,
}

/// Cuts resolved ranges into fixed-length, fixed-stride windows.
#[derive(Debug, Clone)]
pub struct WindowingEngine {
    window_length: usize,
    stride: usize,
    lookahead_bars: usize,
    label_width: usize,
    schema: FeatureSchema,
}

impl WindowingEngine {
    pub fn new(config: &SequenceConfig, schema: &FeatureSchema) -> Result<Self> {
        if config.window_length == 0 {
            return Err(SliceError::Configuration("window_length must be at least 1".to_string()));
        }
        if config.stride == 0 {
            return Err(SliceError::Configuration("stride must be at least 1".to_string()));
        }
        if config.label_width == 0 {
            return Err(SliceError::Configuration("label_width must be at least 1".to_string()));
        }
        schema.validate()?;

        Ok(Self {
            window_length: config.window_length,
            stride: config.stride,
            lookahead_bars: config.label_lookahead_bars,
            label_width: config.label_width,
            schema: schema.clone(),
        })
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// `(window_length, input_dim)` of every feature window.
    pub fn feature_shape(&self) -> (usize, usize) {
        (self.window_length, self.schema.input_dim())
    }

    /// Lazy windows over `range`. Supervised mode fails up front when the first
    /// window's label cannot fit before `range.stop_idx`.
    pub fn windows(&self, range: ResolvedRange, mode: WindowMode) -> Result<Windows> {
        self.windows_in(range, mode, None)
    }

    /// Windows for each segment of a split, checked before any is returned.
    pub fn split_windows(&self, split: &Split, mode: WindowMode) -> Result<SplitWindows> {
        let train = self.windows_in(split.train, mode, Some(Segment::Train))?;
        let validate = self.windows_in(split.validate, mode, Some(Segment::Validate))?;
        let test = self.windows_in(split.test, mode, Some(Segment::Test))?;
        let lockbox = split
            .lockbox
            .map(|range| self.windows_in(range, mode, Some(Segment::Lockbox)))
            .transpose()?;

        log::debug!(
            "Split {} yields {}/{}/{} {:?} windows",
            split.slice_id,
            train.len(),
            validate.len(),
            test.len(),
            mode
        );

        Ok(SplitWindows {
            train,
            validate,
            test,
            lockbox,
        })
    }

    /// SSL windows over two views of the same bars.
    ///
    /// The views must have the same height and, when both carry a
    /// `timestamp` column, identical timestamps row for row.
    pub fn ssl_multiview(&self, view_a: &DataFrame, view_b: &DataFrame) -> Result<MultiviewWindows> {
        if view_a.height() != view_b.height() {
            return Err(SliceError::Validation(format!(
                "Views are not aligned: {} rows vs {} rows",
                view_a.height(),
                view_b.height()
            )));
        }

        if let (Ok(a), Ok(b)) = (view_a.column(TIMESTAMP_COLUMN), view_b.column(TIMESTAMP_COLUMN)) {
            if !a.as_materialized_series().equals_missing(b.as_materialized_series()) {
                return Err(SliceError::Validation(format!(
                    "Views disagree on column '{}'",
                    TIMESTAMP_COLUMN
                )));
            }
        }

        let range = ResolvedRange::new(0, view_a.height());
        Ok(MultiviewWindows {
            view_a: self.windows(range, WindowMode::Ssl)?,
            view_b: self.windows(range, WindowMode::Ssl)?,
        })
    }

    fn windows_in(&self, range: ResolvedRange, mode: WindowMode, segment: Option<Segment>) -> Result<Windows> {
        let len = range.len();
        let label = match mode {
            WindowMode::Ssl => None,
            WindowMode::Supervised => Some((self.lookahead_bars, self.label_width)),
        };

        let span = match label {
            None => Some(self.window_length),
            Some((lookahead, width)) => self
                .window_length
                .checked_add(lookahead)
                .and_then(|bars| bars.checked_add(width)),
        };

        let count = match span {
            _ if len < self.window_length => 0,
            Some(span) if span <= len => (len - span) / self.stride + 1,
            _ => {
                return Err(SliceError::LookaheadOverflow {
                    segment,
                    range,
                    lookahead_bars: self.lookahead_bars,
                    bound: range.stop_idx,
                })
            }
        };

        Ok(Windows {
            range,
            window_length: self.window_length,
            stride: self.stride,
            label,
            position: 0,
            count,
        })
    }

    /// Reorder and cast `df` to the schema, filling absent columns.
    pub fn align(&self, df: &DataFrame) -> Result<DataFrame> {
        let report = self.schema.validate_df(df);
        if !report.missing.is_empty() {
            log::warn!(
                "Filling {} missing feature columns with {}: {:?}",
                report.missing.len(),
                MISSING_FEATURE_FILL,
                report.missing
            );
        }
        self.schema.apply_df(df, MISSING_FEATURE_FILL)
    }

    /// Slice one window out of a frame already produced by [`WindowingEngine::align`].
    pub fn materialize(&self, aligned: &DataFrame, window: &WindowDescriptor) -> Result<MaterializedWindow> {
        if !self.schema.validate_df(aligned).is_exact() {
            return Err(SliceError::Validation(format!(
                "Frame columns do not match schema '{}'",
                self.schema.name
            )));
        }

        let features = Self::slice(aligned, window.feature_range)?;
        let (rows, cols) = features.shape();
        if (rows, cols) != self.feature_shape() {
            return Err(SliceError::Validation(format!(
                "Window {} has shape {}x{}, expected {}x{}",
                window.feature_range,
                rows,
                cols,
                self.window_length,
                self.schema.input_dim()
            )));
        }

        let labels = window.label_range.map(|range| Self::slice(aligned, range)).transpose()?;
        Ok(MaterializedWindow { features, labels })
    }

    fn slice(df: &DataFrame, range: ResolvedRange) -> Result<DataFrame> {
        if range.stop_idx > df.height() {
            return Err(SliceError::BoundaryOutOfRange {
                start: range.start_idx,
                stop: range.stop_idx,
                len: df.height(),
            });
        }
        Ok(df.slice(range.start_idx as i64, range.len()))
    }
}

/// Cursor over the windows of one range. A clone continues from the same
/// position; call [`WindowingEngine::windows`] again for a fresh pass.
#[derive(Debug, Clone)]
pub struct Windows {
    range: ResolvedRange,
    window_length: usize,
    stride: usize,
    label: Option<(usize, usize)>,
    position: usize,
    count: usize,
}

impl Windows {
    pub fn range(&self) -> ResolvedRange {
        self.range
    }

    fn descriptor(&self, position: usize) -> WindowDescriptor {
        let start = self.range.start_idx + position * self.stride;
        let feature_range = ResolvedRange::new(start, start + self.window_length);
        let label_range = self.label.map(|(lookahead, width)| {
            let label_start = feature_range.stop_idx + lookahead;
            ResolvedRange::new(label_start, label_start + width)
        });
        WindowDescriptor {
            feature_range,
            label_range,
        }
    }
}

impl Iterator for Windows {
    type Item = WindowDescriptor;

    fn next(&mut self) -> Option<WindowDescriptor> {
        if self.position >= self.count {
            return None;
        }
        let window = self.descriptor(self.position);
        self.position += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Windows {}

/// Per-segment windows of one split.
#[derive(Debug, Clone)]
pub struct SplitWindows {
    pub train: Windows,
    pub validate: Windows,
    pub test: Windows,
    pub lockbox: Option<Windows>,
}

impl SplitWindows {
    /// `None` only for `Lockbox` when the split has none.
    pub fn segment(&self, segment: Segment) -> Option<&Windows> {
        match segment {
            Segment::Train => Some(&self.train),
            Segment::Validate => Some(&self.validate),
            Segment::Test => Some(&self.test),
            Segment::Lockbox => self.lockbox.as_ref(),
        }
    }
}

/// SSL windows over two aligned views; both index rows of their own frame.
#[derive(Debug, Clone)]
pub struct MultiviewWindows {
    pub view_a: Windows,
    pub view_b: Windows,
}
