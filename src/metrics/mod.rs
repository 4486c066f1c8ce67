//! Pure aggregation over fetched rows.
//!
//! Nothing here performs I/O: handlers fetch batches, then hand them to
//! [`DashboardReport::build`] together with the date to treat as today.

pub mod channel;
pub mod dates;
pub mod filter;
pub mod funnel;
pub mod report;
pub mod table;

pub use report::{DashboardReport, ReportOptions};
