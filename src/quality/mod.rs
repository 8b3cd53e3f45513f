//! Quality metrics over collected records.
//!
//! The engine runs a fixed list of [`Analyzer`]s over the full record set.
//! Each analyzer owns a disjoint set of keys in the resulting [`Metrics`]
//! map and none reads another's output. An analyzer that finds nothing to
//! measure (no authors, no dates, ...) leaves its keys out entirely.

pub mod authors;
pub mod enhanced;
pub mod identifiers;
pub mod stats;
pub mod temporal;
pub mod text;
pub mod threads;
pub mod urls;

use serde_json::{json, Map, Value};

use crate::records::{LoadedFile, Record};

pub use authors::AuthorAnalyzer;
pub use enhanced::{EnhancedAnalyzer, EnhancedMetrics};
pub use identifiers::IdentifierAnalyzer;
pub use temporal::TemporalAnalyzer;
pub use text::TextAnalyzer;
pub use threads::ThreadAnalyzer;
pub use urls::UrlAnalyzer;

const ENABLE_LOGS: bool = false;

use crate::log_debug;

/// Flat, ordered metric name → value mapping.
pub type Metrics = Map<String, Value>;

/// Input shared by every analyzer.
pub struct AnalysisContext<'a> {
    pub records: &'a [Record],
    pub total_items: usize,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(records: &'a [Record]) -> Self {
        Self {
            records,
            total_items: records.len(),
        }
    }
}

/// One independent pass over the records.
///
/// Implementations must be pure: the same records always give the same
/// metrics, and nothing is retained between calls.
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Metrics;
}

pub struct QualityMetricsEngine {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl QualityMetricsEngine {
    /// Engine without analyzers; see [`QualityMetricsEngine::register`].
    pub fn empty() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }

    pub fn register(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzers.push(Box::new(analyzer));
        self
    }

    pub fn analyzer_names(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|analyzer| analyzer.name()).collect()
    }

    /// Metrics for records already in memory. Empty input gives an empty map.
    pub fn analyze_records(&self, records: &[Record]) -> Metrics {
        let mut metrics = Metrics::new();
        if records.is_empty() {
            return metrics;
        }

        let ctx = AnalysisContext::new(records);
        metrics.insert("total_items".into(), json!(ctx.total_items));
        self.run_analyzers(&ctx, &mut metrics);
        metrics
    }

    /// Metrics for loaded output files, with per-file counts and guessed
    /// content types. Files without records are not listed.
    pub fn analyze_files(&self, files: &[LoadedFile]) -> Metrics {
        let mut metrics = Metrics::new();

        let mut file_types = Metrics::new();
        for file in files.iter().filter(|file| !file.records.is_empty()) {
            file_types.insert(
                file.file_name(),
                json!({
                    "count": file.records.len(),
                    "file_type": file.kind(),
                }),
            );
        }

        let records: Vec<Record> = files
            .iter()
            .flat_map(|file| file.records.iter().cloned())
            .collect();
        if records.is_empty() {
            return metrics;
        }

        let ctx = AnalysisContext::new(&records);
        metrics.insert("total_items".into(), json!(ctx.total_items));
        metrics.insert("files_analyzed".into(), json!(file_types.len()));
        metrics.insert("file_types".into(), Value::Object(file_types));
        self.run_analyzers(&ctx, &mut metrics);
        metrics
    }

    fn run_analyzers(&self, ctx: &AnalysisContext<'_>, metrics: &mut Metrics) {
        for analyzer in &self.analyzers {
            let section = analyzer.analyze(ctx);
            log_debug!("{} analyzer produced {} metrics", analyzer.name(), section.len());
            metrics.extend(section);
        }
    }
}

impl Default for QualityMetricsEngine {
    /// Text, URL, identifier, author, thread and temporal analyzers, in
    /// that order.
    fn default() -> Self {
        Self::empty()
            .register(TextAnalyzer::default())
            .register(UrlAnalyzer)
            .register(IdentifierAnalyzer)
            .register(AuthorAnalyzer)
            .register(ThreadAnalyzer)
            .register(TemporalAnalyzer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::parse_lines;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn records(lines: &str) -> Vec<Record> {
        parse_lines(lines.as_bytes()).0
    }

    #[test]
    fn default_pipeline_order() {
        assert_eq!(
            QualityMetricsEngine::default().analyzer_names(),
            vec!["text", "url", "identifier", "author", "thread", "temporal"]
        );
    }

    #[test]
    fn empty_input_gives_empty_metrics() {
        let engine = QualityMetricsEngine::default();
        assert!(engine.analyze_records(&[]).is_empty());
        assert!(engine.analyze_files(&[]).is_empty());
    }

    #[test]
    fn field_free_records_only_report_totals() {
        let metrics = QualityMetricsEngine::default().analyze_records(&records("{}\n{\"x\":1}\n"));

        assert_eq!(metrics["total_items"], json!(2));
        assert_eq!(metrics["unique_page_urls"], json!(0));
        assert_eq!(metrics["unique_thread_urls"], json!(0));
        for absent in ["items_with_text", "unique_authors", "unique_threads", "temporal_coverage"] {
            assert!(!metrics.contains_key(absent), "{absent} should be omitted");
        }
    }

    #[test]
    fn file_analysis_lists_files_with_records() {
        let files = vec![
            LoadedFile {
                path: PathBuf::from("/data/posts.jsonl"),
                records: records("{\"id\":1,\"thread_url\":\"https://f.tn/threads/9/\"}\n"),
                malformed_lines: 0,
            },
            LoadedFile {
                path: PathBuf::from("/data/empty.jsonl"),
                records: Vec::new(),
                malformed_lines: 2,
            },
        ];

        let metrics = QualityMetricsEngine::default().analyze_files(&files);

        assert_eq!(metrics["files_analyzed"], json!(1));
        assert_eq!(
            metrics["file_types"]["posts.jsonl"],
            json!({"count": 1, "file_type": "posts"})
        );
        assert_eq!(metrics["unique_threads"], json!(1));
    }

    #[test]
    fn custom_registration_only_runs_registered() {
        let engine = QualityMetricsEngine::empty().register(TemporalAnalyzer);
        let metrics =
            engine.analyze_records(&records("{\"date\":\"2024-01-01\",\"text\":\"hello\"}\n"));
        assert_eq!(metrics["items_with_dates"], json!(1));
        assert!(!metrics.contains_key("items_with_text"));
    }

    fn arb_record() -> impl Strategy<Value = Record> {
        let keys = prop::sample::select(vec![
            "id",
            "post_id",
            "text",
            "content",
            "url",
            "thread_url",
            "thread_id",
            "author",
            "user",
            "date",
            "created_at",
        ]);
        let values = prop::sample::select(vec![
            Value::Null,
            json!(""),
            json!("  "),
            json!("a"),
            json!("a longer message body"),
            json!(0),
            json!(7),
            json!(true),
            json!([]),
            json!("https://f.tn/threads/1/page-2"),
            json!("//a.tn/x"),
            json!("2024-01-01T10:00:00"),
            json!("not a date"),
        ]);
        prop::collection::vec((keys, values), 0..6)
            .prop_map(|pairs| pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    proptest! {
        #[test]
        fn every_rate_stays_in_unit_interval(items in prop::collection::vec(arb_record(), 0..30)) {
            let metrics = QualityMetricsEngine::default().analyze_records(&items);
            for (key, value) in &metrics {
                if key.ends_with("_rate") || key.contains("coverage") {
                    let rate = value.as_f64().unwrap_or(f64::NAN);
                    prop_assert!(
                        (0.0..=1.0).contains(&rate),
                        "{} = {} is outside [0, 1]",
                        key,
                        value
                    );
                }
            }
        }
    }
}
