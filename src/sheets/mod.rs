//! Google Sheets access: API client, paced batch fetcher and row types.

pub mod api_types;
pub mod cache;
pub mod client;
pub mod error;
pub mod fetcher;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{RangeReader, SheetsClient};
pub use error::SheetError;
pub use fetcher::SheetFetcher;
pub use types::{Row, SheetBatch};
