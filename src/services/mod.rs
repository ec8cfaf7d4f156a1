//! Seams between the engine and the outside world.

pub mod record_source;
pub mod report_sink;
