//! Molecule inference from barcoded reads.
//!
//! Reads that share a barcode are folded into one molecule for as long as
//! each new read lands on the same reference and within the partitioning
//! distance of the previous read with that barcode. A break in either
//! closes the molecule and starts a new one under the same barcode.

mod partitioner;
mod stream;

pub use partitioner::{ContinuityMode, MoleculePartitioner};
pub use stream::Molecules;

use crate::error::MalformedReason;
use std::fmt;

/// The fields of one aligned read that molecule inference cares about.
///
/// Construction validates that the barcode and reference are present, so
/// an untagged read can never be grouped into a molecule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPosition {
    pub(crate) reference: String,
    pub(crate) position: u64,
    pub(crate) barcode: String,
}

impl ReadPosition {
    pub fn new(
        reference: impl Into<String>,
        position: u64,
        barcode: impl Into<String>,
    ) -> Result<Self, MalformedReason> {
        let reference = reference.into();
        let barcode = barcode.into();

        if barcode.is_empty() {
            return Err(MalformedReason::EmptyBarcode);
        }
        if reference.is_empty() {
            return Err(MalformedReason::MissingReference);
        }

        Ok(Self {
            reference,
            position,
            barcode,
        })
    }

    /// Builds a position from raw alignment fields, where the coordinate is
    /// signed and `-1` marks an unplaced read.
    pub fn from_alignment(
        reference: &str,
        position: i64,
        barcode: &str,
    ) -> Result<Self, MalformedReason> {
        if barcode.is_empty() {
            return Err(MalformedReason::EmptyBarcode);
        }
        let position =
            u64::try_from(position).map_err(|_| MalformedReason::NegativePosition(position))?;

        Self::new(reference, position, barcode)
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn barcode(&self) -> &str {
        &self.barcode
    }
}

/// A closed molecule: the extent covered by one run of barcode-sharing reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoleculeSummary {
    pub reference: String,
    pub start: u64,
    pub end: u64,
    pub barcode: String,
    pub read_count: u64,
}

/// Tab-delimited `reference, start, end, barcode, read count`, no newline.
impl fmt::Display for MoleculeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.reference, self.start, self.end, self.barcode, self.read_count
        )
    }
}
