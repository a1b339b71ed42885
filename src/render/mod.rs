//! Rendering of pipeline results into Confluence storage format.

mod chart;
mod format;
mod section;

pub use chart::DEFAULT_HISTORY_CAP;
pub use format::{format_duration, format_seconds, format_timestamp};
pub use section::PipelineSection;
