use super::{MoleculeSummary, ReadPosition};
use crate::error::MoleculeError;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// How a read is compared against the open molecule for its barcode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContinuityMode {
    /// Compare against the last read appended for the barcode. A read that
    /// moves backwards is always continuous, so unsorted input can merge
    /// reads that a min/max test would split.
    #[default]
    LastRead,
    /// Same test, but a read that moves backwards on the same reference is
    /// rejected with [`MoleculeError::UnsortedInput`].
    Sorted,
}

#[derive(Debug)]
struct OpenMolecule {
    reference: String,
    start: u64,
    end: u64,
    last_position: u64,
    read_count: u64,
}

impl OpenMolecule {
    fn new(reference: String, position: u64) -> Self {
        Self {
            reference,
            start: position,
            end: position,
            last_position: position,
            read_count: 1,
        }
    }

    fn is_continuous(&self, reference: &str, position: u64, dist: u64) -> bool {
        // A negative gap saturates to zero and never exceeds `dist`.
        self.reference == reference && position.saturating_sub(self.last_position) <= dist
    }

    fn extend(&mut self, position: u64) {
        self.start = self.start.min(position);
        self.end = self.end.max(position);
        self.last_position = position;
        self.read_count += 1;
    }

    fn into_summary(self, barcode: String) -> MoleculeSummary {
        MoleculeSummary {
            reference: self.reference,
            start: self.start,
            end: self.end,
            barcode,
            read_count: self.read_count,
        }
    }
}

/// Tracks one open molecule per barcode and closes it on a discontinuity.
///
/// Open molecules that are never finalized are discarded when the
/// partitioner is dropped.
#[derive(Debug)]
pub struct MoleculePartitioner {
    dist: u64,
    mode: ContinuityMode,
    open: HashMap<String, OpenMolecule>,
    peak_open: usize,
}

impl MoleculePartitioner {
    pub fn new(dist: u64) -> Self {
        Self::with_mode(dist, ContinuityMode::default())
    }

    pub fn with_mode(dist: u64, mode: ContinuityMode) -> Self {
        Self {
            dist,
            mode,
            open: HashMap::new(),
            peak_open: 0,
        }
    }

    /// Number of barcodes with a molecule currently in progress.
    pub fn open_molecules(&self) -> usize {
        self.open.len()
    }

    pub fn peak_open_molecules(&self) -> usize {
        self.peak_open
    }

    /// Folds one read into its barcode's molecule.
    ///
    /// Returns the previous molecule for the barcode when this read breaks
    /// continuity with it. A rejected read leaves all state untouched.
    pub fn push(&mut self, read: ReadPosition) -> Result<Option<MoleculeSummary>, MoleculeError> {
        let ReadPosition {
            reference,
            position,
            barcode,
        } = read;

        match self.open.entry(barcode) {
            Entry::Vacant(slot) => {
                slot.insert(OpenMolecule::new(reference, position));
                self.peak_open = self.peak_open.max(self.open.len());
                Ok(None)
            }
            Entry::Occupied(mut slot) => {
                let open = slot.get_mut();

                if self.mode == ContinuityMode::Sorted
                    && open.reference == reference
                    && position < open.last_position
                {
                    let previous = open.last_position;
                    return Err(MoleculeError::UnsortedInput {
                        barcode: slot.key().clone(),
                        reference,
                        previous,
                        position,
                    });
                }

                if open.is_continuous(&reference, position, self.dist) {
                    open.extend(position);
                    return Ok(None);
                }

                let closed = std::mem::replace(open, OpenMolecule::new(reference, position));
                Ok(Some(closed.into_summary(slot.key().clone())))
            }
        }
    }

    /// Closes every open molecule.
    ///
    /// The result is ordered by reference, start and barcode so repeated runs
    /// over the same input write identical output.
    pub fn finalize(&mut self) -> Vec<MoleculeSummary> {
        let mut closed: Vec<MoleculeSummary> = self
            .open
            .drain()
            .map(|(barcode, open)| open.into_summary(barcode))
            .collect();
        closed.sort_by(|a, b| {
            (&a.reference, a.start, &a.barcode).cmp(&(&b.reference, b.start, &b.barcode))
        });
        closed
    }

    /// Drops all open molecules without emitting them.
    pub fn discard(&mut self) {
        self.open.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(reference: &str, position: u64, barcode: &str) -> ReadPosition {
        ReadPosition::new(reference, position, barcode).unwrap()
    }

    fn summary(reference: &str, start: u64, end: u64, barcode: &str, reads: u64) -> MoleculeSummary {
        MoleculeSummary {
            reference: reference.to_string(),
            start,
            end,
            barcode: barcode.to_string(),
            read_count: reads,
        }
    }

    #[test]
    fn gap_beyond_dist_closes_molecule() {
        let mut partitioner = MoleculePartitioner::new(50);
        assert_eq!(partitioner.push(read("chr1", 100, "AA")).unwrap(), None);
        assert_eq!(partitioner.push(read("chr1", 140, "AA")).unwrap(), None);
        assert_eq!(
            partitioner.push(read("chr1", 300, "AA")).unwrap(),
            Some(summary("chr1", 100, 140, "AA", 2))
        );
        assert_eq!(partitioner.open_molecules(), 1);
        assert_eq!(partitioner.finalize(), vec![summary("chr1", 300, 300, "AA", 1)]);
        assert_eq!(partitioner.open_molecules(), 0);
    }

    #[test]
    fn gap_equal_to_dist_is_continuous() {
        let mut partitioner = MoleculePartitioner::new(50);
        partitioner.push(read("chr1", 100, "AA")).unwrap();
        assert_eq!(partitioner.push(read("chr1", 150, "AA")).unwrap(), None);
        assert_eq!(partitioner.finalize(), vec![summary("chr1", 100, 150, "AA", 2)]);
    }

    #[test]
    fn reference_change_closes_molecule() {
        let mut partitioner = MoleculePartitioner::new(u64::MAX);
        partitioner.push(read("chr1", 100, "BB")).unwrap();
        assert_eq!(
            partitioner.push(read("chr2", 100, "BB")).unwrap(),
            Some(summary("chr1", 100, 100, "BB", 1))
        );
        assert_eq!(partitioner.finalize(), vec![summary("chr2", 100, 100, "BB", 1)]);
    }

    #[test]
    fn zero_dist_only_joins_identical_coordinates() {
        let mut partitioner = MoleculePartitioner::new(0);
        partitioner.push(read("chr1", 10, "AA")).unwrap();
        assert_eq!(partitioner.push(read("chr1", 10, "AA")).unwrap(), None);
        assert_eq!(
            partitioner.push(read("chr1", 11, "AA")).unwrap(),
            Some(summary("chr1", 10, 10, "AA", 2))
        );
    }

    #[test]
    fn backwards_read_compares_against_last_read() {
        let mut partitioner = MoleculePartitioner::new(50);
        partitioner.push(read("chr1", 1000, "AA")).unwrap();
        // Negative gap: continuous, and the start moves down.
        assert_eq!(partitioner.push(read("chr1", 10, "AA")).unwrap(), None);
        // 40 past the last read even though 960 short of the max.
        assert_eq!(partitioner.push(read("chr1", 50, "AA")).unwrap(), None);
        assert_eq!(partitioner.finalize(), vec![summary("chr1", 10, 1000, "AA", 3)]);
    }

    #[test]
    fn sorted_mode_rejects_backwards_read() {
        let mut partitioner = MoleculePartitioner::with_mode(50, ContinuityMode::Sorted);
        partitioner.push(read("chr1", 1000, "AA")).unwrap();
        let err = partitioner.push(read("chr1", 10, "AA")).unwrap_err();
        assert!(matches!(
            err,
            MoleculeError::UnsortedInput { previous: 1000, position: 10, .. }
        ));
        // The rejected read left the open molecule untouched.
        assert_eq!(partitioner.finalize(), vec![summary("chr1", 1000, 1000, "AA", 1)]);
    }

    #[test]
    fn sorted_mode_allows_reference_change() {
        let mut partitioner = MoleculePartitioner::with_mode(50, ContinuityMode::Sorted);
        partitioner.push(read("chr2", 1000, "AA")).unwrap();
        assert_eq!(
            partitioner.push(read("chr1", 10, "AA")).unwrap(),
            Some(summary("chr2", 1000, 1000, "AA", 1))
        );
    }

    #[test]
    fn finalize_is_ordered() {
        let mut partitioner = MoleculePartitioner::new(50);
        partitioner.push(read("chr2", 5, "A")).unwrap();
        partitioner.push(read("chr1", 9, "C")).unwrap();
        partitioner.push(read("chr1", 9, "B")).unwrap();
        partitioner.push(read("chr1", 1, "D")).unwrap();
        let barcodes: Vec<_> = partitioner
            .finalize()
            .into_iter()
            .map(|m| m.barcode)
            .collect();
        assert_eq!(barcodes, vec!["D", "B", "C", "A"]);
    }

    #[test]
    fn discard_drops_open_molecules() {
        let mut partitioner = MoleculePartitioner::new(50);
        partitioner.push(read("chr1", 5, "A")).unwrap();
        partitioner.push(read("chr1", 5, "B")).unwrap();
        assert_eq!(partitioner.peak_open_molecules(), 2);
        partitioner.discard();
        assert!(partitioner.finalize().is_empty());
    }
}
