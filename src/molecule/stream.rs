use super::{MoleculePartitioner, MoleculeSummary, ReadPosition};
use crate::error::MoleculeError;
use std::vec;

/// Lazily turns a stream of reads into a stream of closed molecules.
///
/// Per-record errors from upstream (and unsorted reads in
/// [`ContinuityMode::Sorted`]) are passed through and the stream carries on.
/// A fatal error is yielded once, the open molecules are discarded and the
/// stream ends. When the reads run out, every open molecule is flushed.
///
/// [`ContinuityMode::Sorted`]: super::ContinuityMode::Sorted
pub struct Molecules<I> {
    reads: I,
    partitioner: MoleculePartitioner,
    flushed: Option<vec::IntoIter<MoleculeSummary>>,
    reads_consumed: u64,
    failed: bool,
}

impl<I> Molecules<I>
where
    I: Iterator<Item = Result<ReadPosition, MoleculeError>>,
{
    pub fn new(reads: I, partitioner: MoleculePartitioner) -> Self {
        Self {
            reads,
            partitioner,
            flushed: None,
            reads_consumed: 0,
            failed: false,
        }
    }

    /// Reads folded into a molecule so far.
    pub fn reads_consumed(&self) -> u64 {
        self.reads_consumed
    }

    pub fn partitioner(&self) -> &MoleculePartitioner {
        &self.partitioner
    }

    /// Closes every open molecule now, without waiting for the reads to end.
    ///
    /// Reads pulled after this start fresh molecules.
    pub fn finalize(&mut self) -> Vec<MoleculeSummary> {
        self.partitioner.finalize()
    }
}

impl<I> Iterator for Molecules<I>
where
    I: Iterator<Item = Result<ReadPosition, MoleculeError>>,
{
    type Item = Result<MoleculeSummary, MoleculeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(flushed) = self.flushed.as_mut() {
            return flushed.next().map(Ok);
        }

        loop {
            match self.reads.next() {
                Some(Ok(read)) => match self.partitioner.push(read) {
                    Ok(closed) => {
                        self.reads_consumed += 1;
                        if let Some(molecule) = closed {
                            return Some(Ok(molecule));
                        }
                    }
                    Err(e) => return Some(Err(e)),
                },
                Some(Err(e)) => {
                    if e.is_fatal() {
                        self.failed = true;
                        self.partitioner.discard();
                    }
                    return Some(Err(e));
                }
                None => {
                    let mut remaining = self.partitioner.finalize().into_iter();
                    let first = remaining.next();
                    self.flushed = Some(remaining);
                    return first.map(Ok);
                }
            }
        }
    }
}
