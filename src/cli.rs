use crate::commands::molecules::MalformedPolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate molecule coordinates from barcoded linked-read alignments
    Molecules(MoleculesArgs),

    /// Print the effective defaults, optionally saving them to the config file
    Config {
        /// Write the current defaults to the user config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct MoleculesArgs {
    /// Input BAM/SAM/CRAM file ("-" for stdin)
    pub bam_file: PathBuf,

    /// Output file, one molecule per line ("-" for stdout, ".gz" to compress)
    pub output_file: PathBuf,

    /// Molecule partitioning distance in bp (default: 50000)
    #[arg(short = 'd', long)]
    pub dist: Option<u64>,

    /// Aux tag holding the barcode (default: RX)
    #[arg(long)]
    pub tag: Option<String>,

    /// Reference FASTA, needed for CRAM input
    #[arg(short = 'r', long)]
    pub reference: Option<PathBuf>,

    /// htslib decompression threads
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Skip reads below this mapping quality
    #[arg(long)]
    pub min_mapq: Option<u8>,

    /// Keep unmapped reads (unplaced ones are then reported as malformed)
    #[arg(long)]
    pub keep_unmapped: bool,

    /// Keep secondary alignments
    #[arg(long)]
    pub keep_secondary: bool,

    /// Keep supplementary alignments
    #[arg(long)]
    pub keep_supplementary: bool,

    /// Keep reads flagged as PCR/optical duplicates
    #[arg(long)]
    pub keep_duplicates: bool,

    /// Keep reads that failed vendor QC
    #[arg(long)]
    pub keep_qcfail: bool,

    /// Only write molecules with at least this many reads
    #[arg(long, default_value = "1")]
    pub min_reads: u64,

    /// What to do with reads lacking a barcode or placement
    #[arg(long, value_enum, default_value = "fail")]
    pub on_malformed: MalformedPolicy,

    /// Fail if a barcode's reads are not in coordinate order
    #[arg(long)]
    pub require_sorted: bool,

    /// Write run statistics as JSON to this file
    #[arg(long)]
    pub stats: Option<PathBuf>,

    /// Hide the progress spinner
    #[arg(short, long)]
    pub quiet: bool,
}
