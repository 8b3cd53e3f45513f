pub mod cli;
pub mod collectors;
pub mod metrics;
pub mod quality;
pub mod records;
pub mod report;
pub mod runner;
pub mod settings;
pub mod supervisor;
pub mod utils;

use anyhow::{Context, Result};
use clap::Parser;

pub use quality::{Analyzer, EnhancedAnalyzer, QualityMetricsEngine};
pub use records::{Record, RecordStore};
pub use report::BenchmarkReport;
pub use runner::{BenchmarkJob, BenchmarkRunner};
pub use settings::Settings;
pub use supervisor::{ProcessSupervisor, RunConfig, RunOutcome, RunStatus};

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = cli::Cli::parse();
    log::debug!("scrapebench starting: {:?}", cli.command);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(cli.execute())
}
