pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod molecule;
pub mod readers;
pub mod utils;

pub use error::{MalformedReason, MoleculeError};
pub use molecule::{ContinuityMode, MoleculePartitioner, MoleculeSummary, Molecules, ReadPosition};
