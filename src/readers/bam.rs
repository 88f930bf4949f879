use super::filter::{ReaderStats, RecordFilter};
use crate::error::{MalformedReason, MoleculeError};
use crate::molecule::ReadPosition;
use anyhow::{ensure, Result};
use rust_htslib::bam::{self, record::Aux, Read};

/// Yields a [`ReadPosition`] for every kept record of a BAM/SAM/CRAM file,
/// in file order.
///
/// Records without the barcode tag or without a placement come out as
/// [`MoleculeError::MalformedRecord`]; a decoding failure ends the stream
/// with [`MoleculeError::Upstream`].
pub struct BamPositionReader {
    reader: bam::Reader,
    record: bam::Record,
    target_names: Vec<String>,
    barcode_tag: String,
    filter: RecordFilter,
    stats: ReaderStats,
    failed: bool,
}

impl BamPositionReader {
    pub fn new(reader: bam::Reader, barcode_tag: &str, filter: RecordFilter) -> Result<Self> {
        ensure!(
            barcode_tag.len() == 2 && barcode_tag.chars().all(|c| c.is_ascii_alphanumeric()),
            "barcode tag must be two alphanumeric characters, got {:?}",
            barcode_tag
        );

        let target_names = reader
            .header()
            .target_names()
            .into_iter()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect();

        Ok(Self {
            reader,
            record: bam::Record::new(),
            target_names,
            barcode_tag: barcode_tag.to_string(),
            filter,
            stats: ReaderStats::default(),
            failed: false,
        })
    }

    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }

    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }

    fn position_from_record(&self) -> Result<ReadPosition, MoleculeError> {
        let record = &self.record;
        let malformed =
            |reason| MoleculeError::malformed(String::from_utf8_lossy(record.qname()), reason);

        let barcode = barcode_from_record(record, &self.barcode_tag).map_err(malformed)?;
        let reference = usize::try_from(record.tid())
            .ok()
            .and_then(|tid| self.target_names.get(tid))
            .map(String::as_str)
            .unwrap_or("");

        ReadPosition::from_alignment(reference, record.pos(), &barcode).map_err(malformed)
    }
}

fn barcode_from_record(record: &bam::Record, tag: &str) -> Result<String, MalformedReason> {
    match record.aux(tag.as_bytes()) {
        Ok(Aux::String(s)) => Ok(s.to_string()),
        Ok(Aux::ArrayU8(arr)) => {
            let bytes: Vec<u8> = arr.iter().collect();
            String::from_utf8(bytes).map_err(|_| MalformedReason::UnsupportedBarcodeType {
                tag: tag.to_string(),
            })
        }
        Ok(_) => Err(MalformedReason::UnsupportedBarcodeType {
            tag: tag.to_string(),
        }),
        Err(_) => Err(MalformedReason::MissingBarcode {
            tag: tag.to_string(),
        }),
    }
}

impl Iterator for BamPositionReader {
    type Item = Result<ReadPosition, MoleculeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            match self.reader.read(&mut self.record)? {
                Ok(()) => {
                    self.stats.records += 1;
                    if let Some(reason) = self.filter.check(&self.record) {
                        self.stats.record_skip(reason);
                        continue;
                    }
                    return Some(self.position_from_record());
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(MoleculeError::Upstream(Box::new(e))));
                }
            }
        }
    }
}
