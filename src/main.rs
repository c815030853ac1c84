use std::fs::{self, File};
use std::io;

use flank_tally::config::{ProgConfig, Task};
use flank_tally::handling::GracefulResult;
use flank_tally::output;
use flank_tally::pipeline::{self, PairRun};
use flank_tally::stat::RunningStats;
use flank_tally::store::SequenceStore;
use log::{info, LevelFilter};

fn init_logging(verbosity: u64) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn open_store(cfg: &ProgConfig) -> SequenceStore {
    SequenceStore::open(&cfg.database, cfg.resolver).unwrap_formatful("While opening the database")
}

fn main() {
    let cfg = ProgConfig::from_cli().unwrap_formatful("While parsing configuration");
    init_logging(cfg.verbosity);

    match &cfg.task {
        Task::Merge { input, output } => {
            let report = pipeline::merge_batch(&cfg.tool, input, output).unwrap_graceful();
            info!(
                "{} pairs merged, {} failed",
                report.merged.len(),
                report.failed.len()
            );
        }
        Task::Tally { dir } => {
            // Fails before the database is touched
            pipeline::fasta_files(dir).unwrap_graceful();
            info!("Tallying {:?} with {} matching", dir, cfg.resolver.mode);
            let mut store = open_store(&cfg);
            let mut stats = RunningStats::default();
            let new = pipeline::tally_directory(&mut store, &cfg.markers, dir, &mut stats)
                .unwrap_formatful("While tallying");
            store.close().unwrap_graceful();
            stats.log_summary();
            info!("{} new sequences added to {:?}", new.len(), cfg.database);
            stats
                .write_to_buf(&mut io::stdout().lock())
                .unwrap_graceful();
        }
        Task::Query { forward, reverse } => {
            let mut store = open_store(&cfg);
            let mut stats = RunningStats::default();
            let run = PairRun {
                forward,
                reverse,
                result_dir: &cfg.results,
                tool: &cfg.tool,
                markers: &cfg.markers,
            };
            let report = run
                .run(&mut store, &mut stats)
                .unwrap_formatful("While processing the mate pair");
            store.close().unwrap_graceful();
            stats.log_summary();
            info!("Results written to {:?}", report.export);
            stats
                .write_to_buf(&mut io::stdout().lock())
                .unwrap_graceful();
        }
        Task::Export { output: target } => {
            let store = open_store(&cfg);
            match target {
                Some(path) => output::export_csv_to(&store, path).unwrap_graceful(),
                None => {
                    fs::create_dir_all(&cfg.results).unwrap_formatful("While creating the results directory");
                    output::export_csv(&store, &cfg.results).unwrap_graceful();
                }
            }
        }
        Task::Import { csv } => {
            let file = File::open(csv).unwrap_formatful("While opening the CSV file");
            let entities = output::read_csv(io::BufReader::new(file)).unwrap_graceful();
            let mut store = open_store(&cfg);
            let n = store.import(&entities).unwrap_graceful();
            store.close().unwrap_graceful();
            info!("{} sequences imported from {:?}", n, csv);
        }
    }
}
