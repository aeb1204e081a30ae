//! Common types shared across the ward forecast pipeline.

pub mod bbox;
pub mod grid;
pub mod ids;
pub mod period;
pub mod variable;

pub use bbox::BoundingBox;
pub use grid::{GridSpec, ScanMode};
pub use ids::compare_ids;
pub use period::{PeriodError, ReportPeriod, DAYS_PER_PERIOD, DAY_NAMES};
pub use variable::GridVariable;
