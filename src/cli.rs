use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, time::Duration};

use crate::{
    collectors::{self, COLLECTORS},
    runner::{analyze_paths, BenchmarkJob, BenchmarkRunner},
    settings::{Settings, DEFAULT_SAMPLE_INTERVAL_MS, DEFAULT_TIMEOUT_SECS},
};

/// Benchmark data collectors: run one under supervision and score its output.
#[derive(Parser, Debug)]
#[command(name = "scrapebench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Keep results, logs and data under ./benchmarks/ instead of the cache
    /// directory.
    #[arg(long, global = true)]
    pub local: bool,

    /// Seconds before the collector is killed.
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Milliseconds between resource samples.
    #[arg(long, global = true, default_value_t = DEFAULT_SAMPLE_INTERVAL_MS)]
    pub interval_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Benchmark a registered collector.
    Run {
        /// Collector to benchmark.
        #[arg(short, long, value_parser = clap::builder::PossibleValuesParser::new(COLLECTORS))]
        collector: String,

        /// Limit for the collector (posts for reddit, per-group posts for
        /// facebook, pages for the others). Defaults to $SCRAPEBENCH_LIMIT,
        /// then 50.
        #[arg(short, long)]
        limit: Option<u32>,

        /// Delete the collected data once the benchmark is done.
        #[arg(long)]
        delete_data: bool,
    },

    /// Benchmark an arbitrary command.
    Exec {
        /// Name recorded as the collector.
        #[arg(short, long)]
        name: String,

        /// Scenario label recorded in the report.
        #[arg(short, long, default_value = "default")]
        scenario: String,

        /// File the command is expected to write; repeatable.
        #[arg(short, long = "output")]
        outputs: Vec<PathBuf>,

        /// Working directory for the command.
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Command and its arguments, after `--`.
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Print quality metrics for existing JSONL files.
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the registered collectors.
    List,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings::from_env(self.local)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_sample_interval(Duration::from_millis(self.interval_ms))
    }

    pub async fn execute(self) -> Result<()> {
        let settings = self.settings();

        match self.command {
            Commands::Run {
                collector,
                limit,
                delete_data,
            } => {
                if !collectors::is_known(&collector) {
                    bail!("Unknown collector '{collector}'");
                }
                let limit = limit.unwrap_or(settings.collector_limit);
                println!(
                    "\n[BENCHMARK] Starting {collector} with {limit} {}",
                    collectors::item_kind(&collector)
                );
                let runner = BenchmarkRunner::new(settings)?;
                runner.run_benchmark(&collector, limit, delete_data).await?;
                Ok(())
            }
            Commands::Exec {
                name,
                scenario,
                outputs,
                cwd,
                command,
            } => {
                println!("\n[BENCHMARK] Starting {name} ({scenario})");
                let mut job = BenchmarkJob::new(command, outputs, name, scenario);
                if let Some(dir) = cwd {
                    job = job.working_dir(dir);
                }
                BenchmarkRunner::new(settings)?.execute(job).await?;
                Ok(())
            }
            Commands::Analyze { files } => {
                let metrics = analyze_paths(&files);
                let body = serde_json::to_string_pretty(&metrics)
                    .context("Failed to render metrics")?;
                println!("{body}");
                Ok(())
            }
            Commands::List => {
                for name in COLLECTORS {
                    println!("{name}");
                }
                Ok(())
            }
        }
    }
}
