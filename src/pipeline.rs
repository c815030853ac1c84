//! The workflows: batch merging, directory tally and the single pair run
use log::{info, warn};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::extract::Extractor;
use crate::markers::MarkerTable;
use crate::merge::{MergeError, MergeTool};
use crate::output::{self, BackupPhase, NewSequence};
use crate::pairing::{self, MatePair};
use crate::reads;
use crate::stat::RunningStats;
use crate::store::SequenceStore;

/// Name of the list of mate pairs the merger failed on
pub const FAILED_LIST: &str = "failed_files.txt";

/// Feeds records through extraction into the store, one at a time
pub struct Tally<'a> {
    store: &'a mut SequenceStore,
    markers: &'a MarkerTable,
    stats: &'a mut RunningStats,
    new_sequences: Vec<NewSequence>,
}

impl<'a> Tally<'a> {
    pub fn new(store: &'a mut SequenceStore, markers: &'a MarkerTable, stats: &'a mut RunningStats) -> Self {
        Tally {
            store,
            markers,
            stats,
            new_sequences: Vec::new(),
        }
    }

    /// Extract and upsert every candidate of a single record, in marker order
    pub fn record(&mut self, id: &str, seq: &str) -> Result<()> {
        self.stats.total_records += 1;
        for candidate in Extractor::new(seq, self.markers) {
            let outcome = self.store.upsert(&candidate)?;
            self.stats.record_outcome(&candidate.fixed_sequence, &outcome);
            if outcome.created() {
                self.new_sequences.push(NewSequence {
                    source_id: id.to_string(),
                    sequence: candidate.sequence,
                });
            }
        }
        Ok(())
    }

    /// Tally all records of one FASTA file, returns the number of records read
    pub fn fasta_file(&mut self, path: &Path) -> Result<u64> {
        let mut n = 0;
        for rec in reads::open_fasta(path)? {
            let rec = rec.map_err(|e| Error::ParseRecord {
                file: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            let seq = std::str::from_utf8(rec.seq()).map_err(|e| Error::ParseRecord {
                file: path.to_path_buf(),
                reason: format!("record {} is not valid UTF-8: {}", rec.id(), e),
            })?;
            self.record(rec.id(), seq)?;
            n += 1;
        }
        self.stats.files += 1;
        Ok(n)
    }

    /// Sequences created so far, with the record they were first seen in
    pub fn finish(self) -> Vec<NewSequence> {
        self.new_sequences
    }
}

fn is_fasta(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.ends_with(".fasta") || n.ends_with(".fasta.gz"))
}

/// FASTA files directly inside `dir`, sorted by name
pub fn fasta_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::MissingDirectory(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::file_io(dir, e))? {
        let path = entry.map_err(|e| Error::file_io(dir, e))?.path();
        if path.is_file() && is_fasta(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Tally every FASTA file in `dir` into `store`
pub fn tally_directory(
    store: &mut SequenceStore,
    markers: &MarkerTable,
    dir: &Path,
    stats: &mut RunningStats,
) -> Result<Vec<NewSequence>> {
    let files = fasta_files(dir)?;
    if files.is_empty() {
        warn!("No FASTA files found in {:?}", dir);
    }
    let mut tally = Tally::new(store, markers, stats);
    for path in files {
        info!("Processing {:?}...", path);
        let n = tally.fasta_file(&path)?;
        info!("{} records scanned in {:?}", n, path);
    }
    Ok(tally.finish())
}

/// Result of merging every mate pair of a directory
#[derive(Debug, Default)]
pub struct BatchReport {
    pub merged: Vec<(MatePair, PathBuf)>,
    pub failed: Vec<(MatePair, MergeError)>,
}

impl BatchReport {
    /// `"{forward} and {reverse}"` for each failed pair
    pub fn failed_lines(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|(pair, _)| format!("{} and {}", pair.forward.display(), pair.reverse.display()))
            .collect()
    }
}

/// Merge all complete mate pairs in `input_dir` into `output_dir`.
///
/// A failing pair is logged and recorded, the batch continues. The failures
/// are listed in `failed_files.txt` inside `output_dir`.
pub fn merge_batch(tool: &MergeTool, input_dir: &Path, output_dir: &Path) -> Result<BatchReport> {
    let pairs = pairing::discover_mate_pairs(input_dir)?;
    fs::create_dir_all(output_dir).map_err(|e| Error::file_io(output_dir, e))?;
    info!("{} mate pairs scheduled for merging", pairs.len());

    let mut report = BatchReport::default();
    for pair in pairs {
        match tool.merge_into_dir(&pair.forward, &pair.reverse, output_dir, &pair.prefix) {
            Ok(merged) => {
                info!("Merged {} into {:?}", pair.prefix, merged);
                report.merged.push((pair, merged));
            }
            Err(e) => {
                warn!(
                    "Failed to merge {:?} and {:?}: {}",
                    pair.forward, pair.reverse, e
                );
                report.failed.push((pair, e));
            }
        }
    }

    if !report.failed.is_empty() {
        let path = output_dir.join(FAILED_LIST);
        let mut file = File::create(&path).map_err(|e| Error::file_io(&path, e))?;
        output::write_failed_pairs(&mut file, &report.failed_lines())
            .map_err(|e| Error::file_io(&path, e))?;
        warn!("{} pairs failed, listed in {:?}", report.failed.len(), path);
    }
    Ok(report)
}

/// Everything the single pair workflow needs
pub struct PairRun<'a> {
    pub forward: &'a Path,
    pub reverse: &'a Path,
    pub result_dir: &'a Path,
    pub tool: &'a MergeTool,
    pub markers: &'a MarkerTable,
}

/// Artifacts written by a successful pair run
#[derive(Debug, Default)]
pub struct PairReport {
    pub pre_backup: Option<PathBuf>,
    pub merged_fasta: PathBuf,
    pub new_sequences: Option<PathBuf>,
    pub post_backup: Option<PathBuf>,
    pub export: PathBuf,
}

impl<'a> PairRun<'a> {
    pub fn prefix(&self) -> String {
        let name = |p: &Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        pairing::common_prefix(&name(self.forward), &name(self.reverse))
    }

    /// Backup, merge, tally, report, backup, export.
    ///
    /// Backups bracket the writes and never interleave with an upsert. A merge
    /// failure ends the run after the first backup.
    pub fn run(&self, store: &mut SequenceStore, stats: &mut RunningStats) -> Result<PairReport> {
        fs::create_dir_all(self.result_dir).map_err(|e| Error::file_io(self.result_dir, e))?;
        let prefix = self.prefix();

        let pre_backup = output::backup_store(store, self.result_dir, BackupPhase::PreUpdate);

        let fastq = self.result_dir.join(format!("{}_combined.fastq", prefix));
        let fastq = self.tool.merge_to_file(self.forward, self.reverse, &fastq)?;
        let merged_fasta = self.result_dir.join(format!("{}_combined.fasta", prefix));
        let n = reads::fastq_to_fasta(&fastq, &merged_fasta)?;
        info!("Conversion to FASTA completed: {:?} ({} reads)", merged_fasta, n);

        let mut tally = Tally::new(store, self.markers, stats);
        tally.fasta_file(&merged_fasta)?;
        let new = tally.finish();
        let new_sequences = output::write_new_sequences(&new, self.result_dir)?;

        let post_backup = output::backup_store(store, self.result_dir, BackupPhase::PostUpdate);
        let export = output::export_csv(store, self.result_dir)?;

        Ok(PairReport {
            pre_backup,
            merged_fasta,
            new_sequences,
            post_backup,
            export,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::markers::MarkerPair;
    use crate::resolver::Resolver;

    #[test]
    fn test_tally_records_new_sequences_once() {
        let mut store = SequenceStore::open_in_memory(Resolver::default()).unwrap();
        let markers = MarkerTable::new(vec![MarkerPair::new("ACGCT", "ACCGC")]);
        let mut stats = RunningStats::default();
        let mut tally = Tally::new(&mut store, &markers, &mut stats);
        tally.record("r1", "ACGCTGATTACAACCGC").unwrap();
        tally.record("r2", "TTACGCTGATTACAACCGCTT").unwrap();
        tally.record("r3", "NOMARKERSHERE").unwrap();
        let new = tally.finish();

        assert_eq!(
            new,
            vec![NewSequence {
                source_id: "r1".to_string(),
                sequence: "GATTACA".to_string()
            }]
        );
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.candidates, 2);
        assert_eq!(store.get("GATTACA").unwrap().unwrap().count, 2);
    }

    #[test]
    fn test_invalid_utf8_record_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.fasta");
        fs::write(&path, &b">r1\nACGCTGA\xffTTACAACCGC\n"[..]).unwrap();
        let mut store = SequenceStore::open_in_memory(Resolver::default()).unwrap();
        let markers = MarkerTable::default();
        let mut stats = RunningStats::default();
        let mut tally = Tally::new(&mut store, &markers, &mut stats);
        match tally.fasta_file(&path) {
            Err(Error::ParseRecord { file, .. }) => assert_eq!(file, path),
            other => panic!("expected a parse error, got {:?}", other),
        }
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_fasta_files_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in &["b.fasta", "a.fasta", "c.fastq", "notes.txt"] {
            fs::write(dir.path().join(name), ">x\nACGT\n").unwrap();
        }
        let files = fasta_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.fasta"), dir.path().join("b.fasta")]
        );
    }

    #[test]
    fn test_tally_directory_requires_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SequenceStore::open_in_memory(Resolver::default()).unwrap();
        let mut stats = RunningStats::default();
        let res = tally_directory(
            &mut store,
            &MarkerTable::default(),
            &dir.path().join("absent"),
            &mut stats,
        );
        assert!(matches!(res, Err(Error::MissingDirectory(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_batch_continues_after_failure() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        for name in &["S1_1.fastq", "S1_2.fastq", "S2_1.fastq", "S2_2.fastq", "S3_1.fastq"] {
            fs::write(input.path().join(name), "").unwrap();
        }
        let tool = MergeTool::new("false", 200, 400);
        let report = merge_batch(&tool, input.path(), output.path()).unwrap();
        assert!(report.merged.is_empty());
        assert_eq!(report.failed.len(), 2);

        let listed = fs::read_to_string(output.path().join(FAILED_LIST)).unwrap();
        assert_eq!(listed.lines().count(), 2);
        assert!(listed.contains("S1_1.fastq and"));
        assert!(!listed.contains("S3_1.fastq"));
    }
}
