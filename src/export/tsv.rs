use super::{MoleculeSink, OutputStream};
use crate::error::MoleculeError;
use crate::molecule::MoleculeSummary;
use std::io::Write;

/// Writes one `reference\tstart\tend\tbarcode\treads` line per molecule,
/// with no header.
pub struct TsvMoleculeWriter<W: OutputStream> {
    writer: W,
    written: u64,
}

impl<W: OutputStream> TsvMoleculeWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: OutputStream> MoleculeSink for TsvMoleculeWriter<W> {
    fn write_molecule(&mut self, molecule: &MoleculeSummary) -> Result<(), MoleculeError> {
        writeln!(self.writer, "{}", molecule)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), MoleculeError> {
        self.writer.finalize()?;
        Ok(())
    }
}
