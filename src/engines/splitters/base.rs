use crate::audit::AuditLog;
use crate::data::TimeIndex;
use crate::error::Result;
use crate::types::Split;

pub trait DataSplitter {
    /// Produce every accepted split over `index`, in ascending start order
    fn split(&self, index: &TimeIndex, audit: &mut AuditLog) -> Result<Vec<Split>>;

    /// Human-readable splitter name
    fn name(&self) -> &str;
}
