mod tsv;

pub use tsv::TsvMoleculeWriter;

use crate::error::MoleculeError;
use crate::molecule::MoleculeSummary;
use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Destination for closed molecules.
pub trait MoleculeSink {
    fn write_molecule(&mut self, molecule: &MoleculeSummary) -> Result<(), MoleculeError>;

    fn finish(&mut self) -> Result<(), MoleculeError> {
        Ok(())
    }
}

impl MoleculeSink for Vec<MoleculeSummary> {
    fn write_molecule(&mut self, molecule: &MoleculeSummary) -> Result<(), MoleculeError> {
        self.push(molecule.clone());
        Ok(())
    }
}

/// A byte stream that may need more than a flush to be complete on disk.
pub trait OutputStream: Write {
    fn finalize(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl OutputStream for Vec<u8> {}

impl OutputStream for File {}

impl<W: Write> OutputStream for BufWriter<W> {}

/// Where molecule lines end up.
pub enum MoleculeOutput {
    Plain(Box<dyn Write>),
    /// The gzip trailer is only written by [`OutputStream::finalize`].
    Gzip(GzEncoder<Box<dyn Write>>),
}

impl Write for MoleculeOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            MoleculeOutput::Plain(w) => w.write(buf),
            MoleculeOutput::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            MoleculeOutput::Plain(w) => w.flush(),
            MoleculeOutput::Gzip(w) => w.flush(),
        }
    }
}

impl OutputStream for MoleculeOutput {
    fn finalize(&mut self) -> io::Result<()> {
        match self {
            MoleculeOutput::Plain(w) => w.flush(),
            MoleculeOutput::Gzip(w) => {
                w.try_finish()?;
                w.get_mut().flush()
            }
        }
    }
}

/// Opens the molecule output: `-` is stdout, a `.gz` path is gzip-compressed.
pub fn open_output(path: &Path) -> Result<MoleculeOutput> {
    if path == Path::new("-") {
        return Ok(MoleculeOutput::Plain(Box::new(BufWriter::new(
            io::stdout().lock(),
        ))));
    }

    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let writer: Box<dyn Write> = Box::new(BufWriter::new(file));

    let gzipped = path.extension().map_or(false, |ext| ext == "gz");
    if gzipped {
        Ok(MoleculeOutput::Gzip(GzEncoder::new(writer, Compression::default())))
    } else {
        Ok(MoleculeOutput::Plain(writer))
    }
}
