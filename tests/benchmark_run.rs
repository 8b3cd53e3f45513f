#![cfg(unix)]

use scrapebench_lib::{
    supervisor::TIMEOUT_EXIT_CODE, BenchmarkJob, BenchmarkRunner, RunStatus, Settings,
};
use serde_json::Value;
use std::{fs, path::Path, time::Duration};

fn runner(root: &Path, timeout: Duration) -> BenchmarkRunner {
    let settings = Settings::resolve(false, root, |_| None)
        .with_timeout(timeout)
        .with_sample_interval(Duration::from_millis(25));
    BenchmarkRunner::new(settings).unwrap()
}

fn sh(script: String) -> Vec<String> {
    vec!["sh".into(), "-c".into(), script]
}

fn saved_reports(runner: &BenchmarkRunner) -> Vec<Value> {
    fs::read_dir(&runner.settings().results_dir)
        .unwrap()
        .map(|entry| {
            let body = fs::read_to_string(entry.unwrap().path()).unwrap();
            serde_json::from_str(&body).unwrap()
        })
        .collect()
}

#[tokio::test]
async fn clean_run_counts_every_valid_line() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(dir.path(), Duration::from_secs(20));
    let out = dir.path().join("forum_posts.jsonl");
    let script = format!(
        "for i in 1 2 3 4 5; do echo \"{{\\\"id\\\":$i,\\\"url\\\":\\\"https://forum.tn/threads/$i/\\\",\\\"author\\\":\\\"u$i\\\"}}\"; done > {}",
        out.display()
    );

    let report = runner
        .execute(BenchmarkJob::new(sh(script), vec![out], "fixture", "5"))
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.exit_code, 0);
    assert_eq!(report.items_extracted, 5);
    assert!(report.total_runtime_seconds > 0.0);
    let expected = 5.0 / report.total_runtime_seconds;
    assert!((report.items_per_second - expected).abs() < 1e-9);

    let docs = saved_reports(&runner);
    assert_eq!(docs.len(), 1);
    let doc = &docs[0];
    assert_eq!(doc["items_extracted"], 5);
    assert_eq!(doc["collector_name"], "fixture");
    assert_eq!(doc["unique_threads"], 5);
    assert_eq!(doc["unique_authors"], 5);
    assert_eq!(doc["enhanced_metrics"]["duplication"]["unique_post_ids"], 5);
    assert_eq!(doc["enhanced_metrics"]["crawl"]["max_thread_depth"], 1);
}

#[tokio::test]
async fn collector_past_its_budget_is_killed_and_still_reported() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(dir.path(), Duration::from_millis(400));
    let out = dir.path().join("posts.jsonl");
    let script = format!("echo '{{\"id\":1}}' > {}; sleep 30", out.display());

    let report = runner
        .execute(BenchmarkJob::new(sh(script), vec![out], "sleepy", "1"))
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.exit_code, TIMEOUT_EXIT_CODE);
    assert!(report.total_runtime_seconds < 10.0);
    // partial output is still counted, but not analyzed
    assert_eq!(report.items_extracted, 1);
    assert!(report.enhanced_metrics.is_none());

    let docs = saved_reports(&runner);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["success"], false);
    assert_eq!(docs[0]["exit_code"], -1);
    assert!(docs[0].get("total_items").is_none());
}

#[tokio::test]
async fn missing_program_produces_failed_report() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(dir.path(), Duration::from_secs(5));

    let report = runner
        .execute(BenchmarkJob::new(
            vec!["/no/such/collector".into()],
            vec![dir.path().join("posts.jsonl")],
            "ghost",
            "1",
        ))
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.items_extracted, 0);
    assert_eq!(saved_reports(&runner).len(), 1);
}

#[tokio::test]
async fn job_runs_in_its_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    fs::create_dir_all(&work).unwrap();
    let runner = runner(dir.path(), Duration::from_secs(10));

    let report = runner
        .execute(
            BenchmarkJob::new(
                sh("echo '{\"text\":\"hello\"}' > pages.jsonl".to_string()),
                vec![work.join("pages.jsonl")],
                "cwd",
                "1",
            )
            .working_dir(&work),
        )
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.items_extracted, 1);
    assert_eq!(report.metric("items_with_text"), Some(&Value::from(1)));
}

#[tokio::test]
async fn run_status_of_supervised_child_is_exposed() {
    let dir = tempfile::tempdir().unwrap();
    let config = scrapebench_lib::RunConfig::new("sh", dir.path().join("child.log"))
        .args(["-c", "exit 9"])
        .sample_interval(Duration::from_millis(10));

    let outcome = scrapebench_lib::ProcessSupervisor::new(config).run().await;

    assert_eq!(outcome.status, RunStatus::Exited(9));
    assert!(!outcome.success());
}
