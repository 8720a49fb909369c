use crate::error::SliceError;
use serde::{Deserialize, Serialize};

/// Trait for configuration sections
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<(), SliceError>;
}

/// Fail with a `Configuration` error naming the section when `value` is zero.
pub(crate) fn require_positive<S: ConfigSection>(field: &str, value: usize) -> Result<(), SliceError> {
    if value == 0 {
        return Err(SliceError::Configuration(format!(
            "{}.{} must be positive",
            S::section_name(),
            field
        )));
    }
    Ok(())
}
