use crate::cli::MoleculesArgs;
use crate::config::Config;
use crate::error::MoleculeError;
use crate::export::{open_output, MoleculeSink, TsvMoleculeWriter};
use crate::molecule::{ContinuityMode, MoleculePartitioner, Molecules, ReadPosition};
use crate::readers::{BamPositionReader, ReaderStats, RecordFilter};
use crate::utils::bam_reader::BamReaderFactory;
use crate::utils::progress_bar_builder::ProgressBarBuilder;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reads between progress updates.
const PROGRESS_INTERVAL: u64 = 100_000;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedPolicy {
    /// Abort on the first malformed record
    #[default]
    Fail,
    /// Count and skip malformed records
    Skip,
}

/// How reads become molecules, independent of where they come from.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionSettings {
    pub dist: u64,
    pub mode: ContinuityMode,
    pub min_reads: u64,
    pub on_malformed: MalformedPolicy,
}

impl Default for PartitionSettings {
    fn default() -> Self {
        Self {
            dist: Config::default().dist,
            mode: ContinuityMode::default(),
            min_reads: 1,
            on_malformed: MalformedPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MoleculeOptions {
    pub bam_file: PathBuf,
    pub output_file: PathBuf,
    pub reference: Option<PathBuf>,
    pub threads: usize,
    pub barcode_tag: String,
    pub filter: RecordFilter,
    pub partition: PartitionSettings,
    pub stats_file: Option<PathBuf>,
    pub show_progress: bool,
}

impl MoleculeOptions {
    /// Command-line flags win over config values.
    pub fn resolve(args: MoleculesArgs, config: &Config) -> Self {
        let filter = RecordFilter {
            min_mapping_quality: args.min_mapq.unwrap_or(config.min_mapping_quality),
            keep_unmapped: args.keep_unmapped,
            keep_secondary: args.keep_secondary,
            keep_supplementary: args.keep_supplementary,
            keep_duplicates: args.keep_duplicates,
            keep_qc_fail: args.keep_qcfail,
        };
        let mode = if args.require_sorted {
            ContinuityMode::Sorted
        } else {
            ContinuityMode::LastRead
        };

        Self {
            bam_file: args.bam_file,
            output_file: args.output_file,
            reference: args.reference,
            threads: args.threads.unwrap_or(config.threads),
            barcode_tag: args.tag.unwrap_or_else(|| config.barcode_tag.clone()),
            filter,
            partition: PartitionSettings {
                dist: args.dist.unwrap_or(config.dist),
                mode,
                min_reads: args.min_reads,
                on_malformed: args.on_malformed,
            },
            stats_file: args.stats,
            show_progress: !args.quiet,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStats {
    pub reader: ReaderStats,
    pub reads_partitioned: u64,
    pub malformed_skipped: u64,
    pub molecules_written: u64,
    pub molecules_below_min_reads: u64,
    pub reads_in_written_molecules: u64,
    pub peak_open_molecules: usize,
}

#[derive(Serialize)]
struct StatsReport<'a> {
    tool_version: &'static str,
    options: &'a MoleculeOptions,
    stats: &'a RunStats,
}

pub fn run(options: &MoleculeOptions) -> Result<RunStats> {
    info!(
        "Inferring molecules from {} (dist {}, tag {})",
        options.bam_file.display(),
        options.partition.dist,
        options.barcode_tag
    );

    let reader = BamReaderFactory::open(
        &options.bam_file,
        options.reference.as_deref(),
        options.threads,
    )?;
    let mut positions =
        BamPositionReader::new(reader, &options.barcode_tag, options.filter.clone())?;
    debug!("{} reference sequences in header", positions.target_names().len());

    let mut sink = TsvMoleculeWriter::new(open_output(&options.output_file)?);

    let progress = ProgressBarBuilder::new("Partitioning reads...")
        .with_template("{spinner:.green} [{elapsed_precise}] {msg} {pos} reads ({per_sec})")
        .with_tick()
        .hidden(!options.show_progress)
        .build()?;

    let result = partition_into(&mut positions, &mut sink, &options.partition, &progress);
    let mut stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            progress.abandon_with_message("Molecule inference failed");
            return Err(e);
        }
    };
    stats.reader = positions.stats().clone();
    progress.finish_with_message("Molecule inference complete");

    log_summary(&stats);

    if let Some(stats_file) = &options.stats_file {
        write_stats(stats_file, options, &stats)?;
        info!("Run statistics written to {}", stats_file.display());
    }

    Ok(stats)
}

/// Streams reads through a partitioner into `sink`.
///
/// The reader-level fields of the returned stats are left for the caller,
/// which owns the reader.
pub fn partition_into<I, S>(
    reads: I,
    sink: &mut S,
    settings: &PartitionSettings,
    progress: &ProgressBar,
) -> Result<RunStats>
where
    I: Iterator<Item = Result<ReadPosition, MoleculeError>>,
    S: MoleculeSink,
{
    let partitioner = MoleculePartitioner::with_mode(settings.dist, settings.mode);
    let mut molecules = Molecules::new(reads, partitioner);
    let mut stats = RunStats::default();
    let mut last_progress = 0;

    while let Some(item) = molecules.next() {
        match item {
            Ok(molecule) => {
                if molecule.read_count < settings.min_reads {
                    stats.molecules_below_min_reads += 1;
                } else {
                    sink.write_molecule(&molecule)
                        .context("Failed to write molecule")?;
                    stats.molecules_written += 1;
                    stats.reads_in_written_molecules += molecule.read_count;
                }
            }
            Err(e @ MoleculeError::MalformedRecord { .. })
                if settings.on_malformed == MalformedPolicy::Skip =>
            {
                debug!("Skipping {}", e);
                stats.malformed_skipped += 1;
            }
            Err(e) => {
                return Err(e).context("Molecule inference aborted");
            }
        }
        let consumed = molecules.reads_consumed();
        if consumed - last_progress >= PROGRESS_INTERVAL {
            progress.set_position(consumed);
            last_progress = consumed;
        }
    }
    progress.set_position(molecules.reads_consumed());

    sink.finish().context("Failed to flush molecule output")?;

    stats.reads_partitioned = molecules.reads_consumed();
    stats.peak_open_molecules = molecules.partitioner().peak_open_molecules();
    Ok(stats)
}

fn log_summary(stats: &RunStats) {
    let reader = &stats.reader;
    info!(
        "Read {} records; {} partitioned into {} molecules",
        reader.records, stats.reads_partitioned, stats.molecules_written
    );
    if reader.filtered() > 0 {
        info!(
            "Filtered {} records (unmapped {}, secondary {}, supplementary {}, duplicate {}, qc-fail {}, low MAPQ {})",
            reader.filtered(),
            reader.unmapped,
            reader.secondary,
            reader.supplementary,
            reader.duplicate,
            reader.qc_fail,
            reader.low_mapping_quality
        );
    }
    if stats.molecules_below_min_reads > 0 {
        info!(
            "{} molecules below the read threshold were not written",
            stats.molecules_below_min_reads
        );
    }
    if stats.malformed_skipped > 0 {
        warn!(
            "Skipped {} malformed records (missing barcode or placement)",
            stats.malformed_skipped
        );
    }
    debug!("Peak open molecules: {}", stats.peak_open_molecules);
}

fn write_stats(path: &Path, options: &MoleculeOptions, stats: &RunStats) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create stats file {}", path.display()))?;
    let report = StatsReport {
        tool_version: env!("CARGO_PKG_VERSION"),
        options,
        stats,
    };
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer
        .flush()
        .with_context(|| format!("Failed to write stats file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MalformedReason;
    use crate::molecule::MoleculeSummary;

    fn ok(reference: &str, position: u64, barcode: &str) -> Result<ReadPosition, MoleculeError> {
        Ok(ReadPosition::new(reference, position, barcode).unwrap())
    }

    fn untagged(name: &str) -> Result<ReadPosition, MoleculeError> {
        Err(MoleculeError::malformed(
            name,
            MalformedReason::MissingBarcode {
                tag: "RX".to_string(),
            },
        ))
    }

    fn settings(dist: u64) -> PartitionSettings {
        PartitionSettings {
            dist,
            ..PartitionSettings::default()
        }
    }

    #[test]
    fn malformed_record_fails_by_default() {
        let reads = vec![ok("chr1", 10, "X"), untagged("r2"), ok("chr1", 20, "X")];
        let mut sink: Vec<MoleculeSummary> = Vec::new();

        let err = partition_into(reads.into_iter(), &mut sink, &settings(50), &ProgressBar::hidden())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("missing barcode tag RX"));
        assert!(sink.is_empty());
    }

    #[test]
    fn skip_policy_counts_malformed_records() {
        let reads = vec![ok("chr1", 10, "X"), untagged("r2"), ok("chr1", 20, "X")];
        let mut sink: Vec<MoleculeSummary> = Vec::new();
        let settings = PartitionSettings {
            on_malformed: MalformedPolicy::Skip,
            ..settings(50)
        };

        let stats =
            partition_into(reads.into_iter(), &mut sink, &settings, &ProgressBar::hidden()).unwrap();
        assert_eq!(stats.malformed_skipped, 1);
        assert_eq!(stats.reads_partitioned, 2);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].read_count, 2);
    }

    #[test]
    fn min_reads_drops_small_molecules() {
        let reads = vec![ok("chr1", 10, "X"), ok("chr1", 20, "X"), ok("chr1", 10, "Y")];
        let mut sink: Vec<MoleculeSummary> = Vec::new();
        let settings = PartitionSettings {
            min_reads: 2,
            ..settings(50)
        };

        let stats =
            partition_into(reads.into_iter(), &mut sink, &settings, &ProgressBar::hidden()).unwrap();
        assert_eq!(stats.molecules_written, 1);
        assert_eq!(stats.molecules_below_min_reads, 1);
        assert_eq!(stats.reads_in_written_molecules, 2);
        assert_eq!(sink[0].barcode, "X");
    }

    #[test]
    fn unsorted_input_aborts_in_sorted_mode() {
        let reads = vec![ok("chr1", 500, "X"), ok("chr1", 10, "X")];
        let mut sink: Vec<MoleculeSummary> = Vec::new();
        let settings = PartitionSettings {
            mode: ContinuityMode::Sorted,
            on_malformed: MalformedPolicy::Skip,
            ..settings(50)
        };

        let err = partition_into(reads.into_iter(), &mut sink, &settings, &ProgressBar::hidden())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MoleculeError>(),
            Some(MoleculeError::UnsortedInput { .. })
        ));
    }

    #[test]
    fn progress_ends_at_total_reads() {
        let total = PROGRESS_INTERVAL + 7;
        let reads = (0..total).map(|i| ok("chr1", i, "X"));
        let mut sink: Vec<MoleculeSummary> = Vec::new();
        let progress = ProgressBar::hidden();

        partition_into(reads, &mut sink, &settings(50), &progress).unwrap();
        assert_eq!(progress.position(), total);
        assert_eq!(sink.len(), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn stats_write_failure_is_an_error() {
        let options = MoleculeOptions {
            bam_file: PathBuf::from("in.bam"),
            output_file: PathBuf::from("out.tsv"),
            reference: None,
            threads: 1,
            barcode_tag: "RX".to_string(),
            filter: RecordFilter::default(),
            partition: PartitionSettings::default(),
            stats_file: None,
            show_progress: false,
        };

        let result = write_stats(Path::new("/dev/full"), &options, &RunStats::default());
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_config() {
        let config = Config {
            dist: 10_000,
            barcode_tag: "BX".to_string(),
            min_mapping_quality: 20,
            threads: 2,
        };
        let args = MoleculesArgs {
            bam_file: PathBuf::from("in.bam"),
            output_file: PathBuf::from("out.tsv"),
            dist: Some(500),
            tag: None,
            reference: None,
            threads: None,
            min_mapq: Some(5),
            keep_unmapped: false,
            keep_secondary: true,
            keep_supplementary: false,
            keep_duplicates: false,
            keep_qcfail: false,
            min_reads: 1,
            on_malformed: MalformedPolicy::Fail,
            require_sorted: true,
            stats: None,
            quiet: true,
        };

        let options = MoleculeOptions::resolve(args, &config);
        assert_eq!(options.partition.dist, 500);
        assert_eq!(options.barcode_tag, "BX");
        assert_eq!(options.threads, 2);
        assert_eq!(options.filter.min_mapping_quality, 5);
        assert!(options.filter.keep_secondary);
        assert_eq!(options.partition.mode, ContinuityMode::Sorted);
        assert!(!options.show_progress);
    }
}
