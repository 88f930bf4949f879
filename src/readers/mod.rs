mod bam;
pub mod filter;

pub use bam::BamPositionReader;
pub use filter::{ReaderStats, RecordFilter, SkipReason};
