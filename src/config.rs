//! Utilities for loading user config from the command line and json config files
use clap::{App, ArgMatches};
use serde::Deserialize;
use std::path::PathBuf;
use std::{error::Error, fs::File};

use crate::errors;
use crate::handling::GracefulOption;
use crate::markers::{MarkerPair, MarkerTable};
use crate::merge::MergeTool;
use crate::resolver::{Resolver, ResolverMode, DEFAULT_TOLERANCE};

pub const DEFAULT_MERGER: &str = "flash";
pub const DEFAULT_MIN_OVERLAP: u32 = 200;
pub const DEFAULT_MAX_OVERLAP: u32 = 400;
pub const DEFAULT_DATABASE: &str = "sequences.db";
pub const DEFAULT_RESULTS: &str = "Results";

/// JSON config for flank_tally, every field optional
/// ## Example
/// ``` json
/// {
///     "markers": [
///         {"start": "ACGCT", "end": "ACCGC"},
///         {"start": "GG", "end": "CTCGAA"}
///     ],
///     "merger": "/usr/local/bin/flash",
///     "min_overlap": 200,
///     "max_overlap": 400,
///     "resolver": "near_duplicate_aware",
///     "tolerance": 0.01,
///     "database": "sequences.db",
///     "results": "Results"
/// }
/// ```
#[derive(Deserialize, Default, Debug)]
pub struct FlankConf {
    pub markers: Option<Vec<MarkerPair>>,
    pub merger: Option<String>,
    pub min_overlap: Option<u32>,
    pub max_overlap: Option<u32>,
    pub resolver: Option<ResolverMode>,
    pub tolerance: Option<f64>,
    pub database: Option<String>,
    pub results: Option<String>,
}

pub fn load_json_config<P: AsRef<std::path::Path>>(
    json_path: P,
) -> Result<FlankConf, Box<dyn std::error::Error>> {
    let reader = File::open(json_path)?;
    let res: FlankConf = serde_json::from_reader(reader)?;
    Ok(res)
}

impl FlankConf {
    /// Reject configs that would make every run useless
    pub fn validate(&self) -> errors::Result<()> {
        if let Some(markers) = &self.markers {
            if markers.is_empty() {
                return Err(errors::Error::Config("no marker pairs given".to_string()));
            }
            if let Some(bad) = markers.iter().find(|m| m.start.is_empty() || m.end.is_empty()) {
                return Err(errors::Error::Config(format!("empty marker in pair {}", bad)));
            }
        }
        let min = self.min_overlap.unwrap_or(DEFAULT_MIN_OVERLAP);
        let max = self.max_overlap.unwrap_or(DEFAULT_MAX_OVERLAP);
        if min > max {
            return Err(errors::Error::Config(format!(
                "min_overlap {} exceeds max_overlap {}",
                min, max
            )));
        }
        if let Some(tol) = self.tolerance {
            if !(0.0..=1.0).contains(&tol) {
                return Err(errors::Error::Config(format!(
                    "tolerance {} outside of [0, 1]",
                    tol
                )));
            }
        }
        Ok(())
    }
}

/// What the invocation asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Merge every mate pair in `input` into `output`
    Merge { input: PathBuf, output: PathBuf },
    /// Tally every FASTA file in `dir`
    Tally { dir: PathBuf },
    /// Merge one pair, tally it and report
    Query { forward: PathBuf, reverse: PathBuf },
    /// Dump the store as CSV, into the results dir when no path is given
    Export { output: Option<PathBuf> },
    /// Load a CSV export into the store
    Import { csv: PathBuf },
}

impl Task {
    /// Matching policy used when neither config nor command line pick one
    pub fn default_mode(&self) -> ResolverMode {
        match self {
            Task::Query { .. } => ResolverMode::ExactOnly,
            _ => ResolverMode::NearDuplicateAware,
        }
    }
}

/// Summarized config used by different parts of the program
pub struct ProgConfig {
    pub task: Task,
    pub verbosity: u64,
    pub database: PathBuf,
    pub results: PathBuf,
    pub markers: MarkerTable,
    pub tool: MergeTool,
    pub resolver: Resolver,
}

pub fn cli_app() -> App<'static, 'static> {
    clap_app!(flank_tally =>
        (version: "0.1")
        (author: "Stefan Holderbach")
        (about: "Merge mate pairs, extract regions between flank markers and tally distinct sequences")
        (@arg CONFIG: -c --config +takes_value +global "Sets a custom config file")
        (@arg db: --db +takes_value +global "Sets the sequence database (default sequences.db)")
        (@arg results: --results +takes_value +global "Sets the directory for backups and reports (default Results)")
        (@arg mode: --mode +takes_value +global "Overrides the matching policy: exact or near")
        (@arg debug: -d ... +global "Sets the level of debugging information")
        (@subcommand merge =>
            (about: "Merge every *_1/*_2 mate pair of a directory")
            (@arg INPUT: +required "Directory with the paired read files")
            (@arg OUTPUT: +required "Directory receiving the merged reads"))
        (@subcommand tally =>
            (about: "Extract and tally the sequences of every FASTA file of a directory")
            (@arg INPUT: +required "Directory with FASTA files"))
        (@subcommand query =>
            (about: "Merge one mate pair, tally it and export the database")
            (@arg FORWARD: +required "First mate file")
            (@arg REVERSE: +required "Second mate file"))
        (@subcommand export =>
            (about: "Export the database as CSV")
            (@arg OUTPUT: "CSV path, defaults to a timestamped file in the results directory"))
        (@subcommand import =>
            (about: "Load a CSV export into the database")
            (@arg INPUT: +required "CSV file as written by export"))
    )
}

/// Value of a global argument, wherever on the command line it was given
fn global_value<'a>(matches: &'a ArgMatches, sub: Option<&'a ArgMatches>, name: &str) -> Option<&'a str> {
    sub.and_then(|s| s.value_of(name)).or_else(|| matches.value_of(name))
}

impl ProgConfig {
    pub fn from_cli() -> Result<ProgConfig, Box<dyn Error>> {
        let matches = cli_app().get_matches();
        ProgConfig::from_matches(&matches)
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<ProgConfig, Box<dyn Error>> {
        let (name, sub) = matches.subcommand();
        let task = match (name, sub) {
            ("merge", Some(m)) => Task::Merge {
                input: m.value_of("INPUT").unwrap_graceful("Missing input directory").into(),
                output: m.value_of("OUTPUT").unwrap_graceful("Missing output directory").into(),
            },
            ("tally", Some(m)) => Task::Tally {
                dir: m.value_of("INPUT").unwrap_graceful("Missing FASTA directory").into(),
            },
            ("query", Some(m)) => Task::Query {
                forward: m.value_of("FORWARD").unwrap_graceful("Missing first mate file").into(),
                reverse: m.value_of("REVERSE").unwrap_graceful("Missing second mate file").into(),
            },
            ("export", Some(m)) => Task::Export {
                output: m.value_of("OUTPUT").map(PathBuf::from),
            },
            ("import", Some(m)) => Task::Import {
                csv: m.value_of("INPUT").unwrap_graceful("Missing CSV file").into(),
            },
            _ => return Err(matches.usage().to_string().into()),
        };

        let json_config = match global_value(matches, sub, "CONFIG") {
            Some(path) => load_json_config(path)?,
            None => FlankConf::default(),
        };
        json_config.validate()?;

        let verbosity = matches
            .occurrences_of("debug")
            .max(sub.map_or(0, |s| s.occurrences_of("debug")));
        let mode = match global_value(matches, sub, "mode") {
            Some(m) => m.parse::<ResolverMode>()?,
            None => json_config.resolver.unwrap_or_else(|| task.default_mode()),
        };
        let resolver = Resolver::new(mode, json_config.tolerance.unwrap_or(DEFAULT_TOLERANCE));

        let database = global_value(matches, sub, "db")
            .map(String::from)
            .or(json_config.database)
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let results = global_value(matches, sub, "results")
            .map(String::from)
            .or(json_config.results)
            .unwrap_or_else(|| DEFAULT_RESULTS.to_string());
        let markers = json_config
            .markers
            .map(MarkerTable::new)
            .unwrap_or_default();
        let tool = MergeTool::new(
            json_config.merger.unwrap_or_else(|| DEFAULT_MERGER.to_string()),
            json_config.min_overlap.unwrap_or(DEFAULT_MIN_OVERLAP),
            json_config.max_overlap.unwrap_or(DEFAULT_MAX_OVERLAP),
        );

        Ok(ProgConfig {
            task,
            verbosity,
            database: database.into(),
            results: results.into(),
            markers,
            tool,
            resolver,
        })
    }
}
