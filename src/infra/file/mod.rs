//! Local JSON dumps of the vacancy table, for offline runs.

mod source;

pub use source::FileSource;
