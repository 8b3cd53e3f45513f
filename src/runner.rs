use anyhow::{Context, Result};
use chrono::Local;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    collectors,
    quality::{EnhancedAnalyzer, QualityMetricsEngine},
    records::{is_jsonl, is_posts_file, LoadedFile, Record, RecordStore},
    report::{error_summary, file_stamp, success_summary, BenchmarkReport, ReportBuilder},
    settings::Settings,
    supervisor::{ProcessSupervisor, RunConfig},
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// One process to benchmark and the files it should leave behind.
#[derive(Debug, Clone)]
pub struct BenchmarkJob {
    /// argv; the first element is the program.
    pub command: Vec<String>,
    pub output_files: Vec<PathBuf>,
    pub working_dir: Option<PathBuf>,
    pub collector_name: String,
    pub scenario_name: String,
}

impl BenchmarkJob {
    pub fn new(
        command: Vec<String>,
        output_files: Vec<PathBuf>,
        collector_name: impl Into<String>,
        scenario_name: impl Into<String>,
    ) -> Self {
        Self {
            command,
            output_files,
            working_dir: None,
            collector_name: collector_name.into(),
            scenario_name: scenario_name.into(),
        }
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Runs benchmarks and persists their reports under the configured
/// directories.
pub struct BenchmarkRunner {
    settings: Settings,
    engine: QualityMetricsEngine,
}

impl BenchmarkRunner {
    /// Creates the results, logs and data directories up front.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.ensure_dirs()?;
        Ok(Self {
            settings,
            engine: QualityMetricsEngine::default(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Benchmark a registered collector.
    ///
    /// Its output goes to a fresh `<data_dir>/<name>_<limit>_<stamp>`
    /// directory, removed afterwards when `delete_data` is set.
    pub async fn run_benchmark(
        &self,
        collector_name: &str,
        limit: u32,
        delete_data: bool,
    ) -> Result<BenchmarkReport> {
        let stamp = file_stamp(Local::now());
        let run_data_dir = self
            .settings
            .data_dir
            .join(format!("{collector_name}_{limit}_{stamp}"));

        let plan = collectors::plan(collector_name, limit, &run_data_dir, &self.settings)?;
        fs::create_dir_all(&run_data_dir)
            .with_context(|| format!("Failed to create directory {}", run_data_dir.display()))?;
        plan.prepare()?;

        let job = BenchmarkJob::new(
            plan.command,
            plan.output_files,
            collector_name,
            limit.to_string(),
        );
        let result = self.execute(job).await;

        if delete_data {
            if let Err(err) = fs::remove_dir_all(&run_data_dir) {
                log_warn!("could not delete {}: {err}", run_data_dir.display());
            }
        }

        result
    }

    /// Supervise the job, analyze what it wrote and save the report.
    ///
    /// A failed or timed-out collector still produces a saved report; only
    /// I/O failures writing that report are returned as errors.
    pub async fn execute(&self, job: BenchmarkJob) -> Result<BenchmarkReport> {
        let stamp = file_stamp(Local::now());
        let log_file = self
            .settings
            .logs_dir
            .join(format!("{}_{stamp}.log", job.collector_name));

        let mut config = RunConfig::from_argv(&job.command, &log_file)
            .timeout(self.settings.timeout)
            .sample_interval(self.settings.sample_interval)
            .output_files(job.output_files.iter().cloned());
        if let Some(dir) = &job.working_dir {
            config = config.working_dir(dir);
        }

        let outcome = ProcessSupervisor::new(config).run().await;

        let jsonl: Vec<&PathBuf> = job.output_files.iter().filter(|path| is_jsonl(path)).collect();
        let files = RecordStore::load_files(&jsonl);
        let items: usize = files.iter().map(|file| file.records.len()).sum();

        let mut builder = ReportBuilder::new(
            job.collector_name.as_str(),
            job.scenario_name.as_str(),
            &outcome,
            &log_file,
        )
        .items_extracted(items);
        if outcome.success() {
            builder = builder
                .quality(self.engine.analyze_files(&files))
                .enhanced(EnhancedAnalyzer::analyze(&posts_records(&files)));
        }
        let report = builder.build();

        if report.success {
            print!("{}", success_summary(&report));
        } else {
            print!("{}", error_summary(&report));
        }

        let saved = report.save(&self.settings.results_dir, &stamp)?;
        log_info!(
            "{} finished: success={} items={} runtime={:.2}s",
            report.collector_name,
            report.success,
            report.items_extracted,
            report.total_runtime_seconds
        );

        println!("[RESULTS] {}", saved.display());
        println!("[LOG] {}", log_file.display());
        print_data_files(&job.output_files, &files);

        Ok(report)
    }
}

fn posts_records(files: &[LoadedFile]) -> Vec<Record> {
    files
        .iter()
        .filter(|file| is_posts_file(&file.path))
        .flat_map(|file| file.records.iter().cloned())
        .collect()
}

fn print_data_files(outputs: &[PathBuf], loaded: &[LoadedFile]) {
    let existing: Vec<&PathBuf> = outputs.iter().filter(|path| path.exists()).collect();
    if existing.is_empty() {
        return;
    }

    println!("[DATA]");
    for path in existing {
        match loaded.iter().find(|file| &file.path == path) {
            Some(file) => println!("  {} ({} items)", path.display(), file.records.len()),
            None => println!("  {}", path.display()),
        }
    }
}

/// Load and analyze output files without running anything.
pub fn analyze_paths(paths: &[PathBuf]) -> serde_json::Value {
    let jsonl: Vec<&Path> = paths
        .iter()
        .map(PathBuf::as_path)
        .filter(|path| is_jsonl(path))
        .collect();
    let files = RecordStore::load_files(&jsonl);

    let mut metrics = QualityMetricsEngine::default().analyze_files(&files);
    if let Some(enhanced) = EnhancedAnalyzer::analyze(&posts_records(&files)) {
        if let Ok(value) = serde_json::to_value(enhanced) {
            metrics.insert("enhanced_metrics".into(), value);
        }
    }
    serde_json::Value::Object(metrics)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn runner_in(dir: &tempfile::TempDir) -> BenchmarkRunner {
        let settings = Settings::resolve(false, dir.path(), |_| None)
            .with_timeout(Duration::from_secs(10))
            .with_sample_interval(Duration::from_millis(20));
        BenchmarkRunner::new(settings).unwrap()
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[tokio::test]
    async fn successful_job_is_analyzed_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(&dir);
        let out = dir.path().join("posts.jsonl");
        let script = format!(
            "printf '%s\\n' '{{\"id\":\"a\",\"text\":\"hi\"}}' '{{\"id\":\"a\",\"text\":\"hi\"}}' 'junk' '{{\"id\":\"b\",\"text\":\"bye\"}}' > {}",
            out.display()
        );

        let report = runner
            .execute(BenchmarkJob::new(sh(&script), vec![out], "fixture", "3"))
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.items_extracted, 3);
        assert_eq!(report.metric("total_items"), Some(&json!(3)));
        let enhanced = report.enhanced_metrics.as_ref().unwrap();
        assert_eq!(enhanced.duplication.total_posts, 3);
        assert_eq!(enhanced.duplication.max_duplications, 2);

        let saved: Vec<_> = fs::read_dir(&runner.settings().results_dir)
            .unwrap()
            .collect();
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test]
    async fn failed_job_skips_quality_but_counts_items() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(&dir);
        let out = dir.path().join("pages.jsonl");
        let script = format!("echo '{{\"url\":\"u\"}}' > {}; echo oops >&2; exit 5", out.display());

        let report = runner
            .execute(BenchmarkJob::new(sh(&script), vec![out], "fixture", "1"))
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.exit_code, 5);
        assert_eq!(report.items_extracted, 1);
        assert!(report.quality.is_empty());
        assert!(report.enhanced_metrics.is_none());
        let log = fs::read_to_string(&report.log_file).unwrap();
        assert!(log.contains("oops"));
    }

    #[tokio::test]
    async fn unknown_collector_is_rejected_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(&dir);

        assert!(runner.run_benchmark("nope", 1, false).await.is_err());
        assert_eq!(fs::read_dir(&runner.settings().data_dir).unwrap().count(), 0);
    }

    #[test]
    fn analyze_paths_ignores_non_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let posts = dir.path().join("posts.jsonl");
        let vocab = dir.path().join("vocab.json");
        fs::write(&posts, "{\"id\":1,\"author\":\"x\"}\n{\"id\":2,\"author\":\"y\"}\n").unwrap();
        fs::write(&vocab, "{\"id\":3}\n").unwrap();

        let metrics = analyze_paths(&[posts, vocab]);
        assert_eq!(metrics["total_items"], json!(2));
        assert_eq!(metrics["enhanced_metrics"]["authors"]["unique_authors"], json!(2));
    }
}
