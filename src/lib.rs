//! Car Insights - car market statistics & chart REST service
//!
//! Loads car listings and prices from CSV once, joins them on `Car_ID`, and
//! serves a fixed set of aggregation reports over the read-only result.

pub mod charts;
pub mod data;
pub mod reports;
pub mod server;
pub mod stats;

pub use data::{DataError, Dataset};
pub use reports::{Report, ReportError, REPORTS};
pub use server::{create_router, AppState, ServerConfig};
