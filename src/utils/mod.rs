pub mod bam_reader;
pub(crate) mod progress_bar_builder;
