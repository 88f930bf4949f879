//! Alignment record filtering ahead of molecule inference.

use rust_htslib::bam::Record;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unmapped,
    Secondary,
    Supplementary,
    Duplicate,
    QcFail,
    LowMappingQuality,
}

/// Decides which alignment records take part in molecule inference.
///
/// The default keeps primary, mapped, non-duplicate reads that passed QC.
/// [`RecordFilter::permissive`] keeps everything, so unplaced reads surface
/// as malformed records instead of being skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordFilter {
    pub min_mapping_quality: u8,
    pub keep_unmapped: bool,
    pub keep_secondary: bool,
    pub keep_supplementary: bool,
    pub keep_duplicates: bool,
    pub keep_qc_fail: bool,
}

impl RecordFilter {
    pub fn permissive() -> Self {
        Self {
            min_mapping_quality: 0,
            keep_unmapped: true,
            keep_secondary: true,
            keep_supplementary: true,
            keep_duplicates: true,
            keep_qc_fail: true,
        }
    }

    pub fn with_min_mapping_quality(mut self, min_mapping_quality: u8) -> Self {
        self.min_mapping_quality = min_mapping_quality;
        self
    }

    /// Returns why the record should be skipped, or `None` to keep it.
    pub fn check(&self, record: &Record) -> Option<SkipReason> {
        let unmapped = record.is_unmapped() || record.tid() < 0;

        if unmapped && !self.keep_unmapped {
            return Some(SkipReason::Unmapped);
        }
        if record.is_secondary() && !self.keep_secondary {
            return Some(SkipReason::Secondary);
        }
        if record.is_supplementary() && !self.keep_supplementary {
            return Some(SkipReason::Supplementary);
        }
        if record.is_duplicate() && !self.keep_duplicates {
            return Some(SkipReason::Duplicate);
        }
        if record.is_quality_check_failed() && !self.keep_qc_fail {
            return Some(SkipReason::QcFail);
        }
        // Unmapped reads carry no meaningful MAPQ.
        if !unmapped && record.mapq() < self.min_mapping_quality {
            return Some(SkipReason::LowMappingQuality);
        }
        None
    }
}

/// Per-reason counts of records the reader did not pass on.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReaderStats {
    pub records: u64,
    pub unmapped: u64,
    pub secondary: u64,
    pub supplementary: u64,
    pub duplicate: u64,
    pub qc_fail: u64,
    pub low_mapping_quality: u64,
}

impl ReaderStats {
    pub fn record_skip(&mut self, reason: SkipReason) {
        let counter = match reason {
            SkipReason::Unmapped => &mut self.unmapped,
            SkipReason::Secondary => &mut self.secondary,
            SkipReason::Supplementary => &mut self.supplementary,
            SkipReason::Duplicate => &mut self.duplicate,
            SkipReason::QcFail => &mut self.qc_fail,
            SkipReason::LowMappingQuality => &mut self.low_mapping_quality,
        };
        *counter += 1;
    }

    pub fn filtered(&self) -> u64 {
        self.unmapped
            + self.secondary
            + self.supplementary
            + self.duplicate
            + self.qc_fail
            + self.low_mapping_quality
    }
}
