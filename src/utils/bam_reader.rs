// src/utils/bam_reader.rs
use anyhow::{Context, Result};
use rust_htslib::bam::{self, Read};
use std::path::Path;

pub struct BamReaderFactory;

impl BamReaderFactory {
    /// Opens an alignment file for a single sequential pass. `-` reads from
    /// stdin. The reference is only consulted for CRAM input.
    pub fn open(bam_path: &Path, reference_path: Option<&Path>, threads: usize) -> Result<bam::Reader> {
        let mut reader = if bam_path == Path::new("-") {
            bam::Reader::from_stdin().context("Failed to read alignments from stdin")?
        } else {
            bam::Reader::from_path(bam_path)
                .with_context(|| format!("Failed to open {}", bam_path.display()))?
        };

        if let Some(ref_path) = reference_path {
            reader
                .set_reference(ref_path)
                .with_context(|| format!("Failed to set reference {}", ref_path.display()))?;
        }
        if threads > 1 {
            reader
                .set_threads(threads)
                .context("Failed to start decompression threads")?;
        }

        Ok(reader)
    }
}
