//! Vacancy aggregation and trend analysis.
//!
//! Raw rows are ingested into [`crate::records::Vacancy`] values, grouped
//! per city and calendar window, and summarized into a
//! [`types::MetricsReport`] (monthly) or [`types::DailyDigest`] (daily).
//! [`analyzer`] drives the per-city loop and hands results to a sink.

pub mod aggregate;
pub mod analyzer;
pub mod compare;
pub mod daily;
pub mod normalize;
pub mod trend;
pub mod types;
pub mod utility;
pub mod window;
