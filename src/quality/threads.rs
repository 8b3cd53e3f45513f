use regex::Regex;
use serde_json::json;
use std::{collections::HashMap, sync::LazyLock};

use crate::records::{
    fields::{first_populated, is_populated, value_to_text, THREAD_ID_FIELDS},
    Record,
};

use super::{
    stats::{rate, ratio},
    AnalysisContext, Analyzer, Metrics,
};

/// Forum path shapes carrying a thread id, tried in order.
static THREAD_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/threads/(\d+)",
        r"/t/([^/]+)",
        r"/topic/(\d+)",
        r"/discussion/(\d+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("thread id pattern is valid"))
    .collect()
});

/// Thread id of a record: parsed from its thread (or page) URL, else an
/// explicit `thread_id` / `topic_id` field.
pub fn thread_id(record: &Record) -> Option<String> {
    let url = record
        .get("thread_url")
        .filter(|value| is_populated(value))
        .or_else(|| record.get("url"))
        .and_then(|value| value.as_str());

    let from_url = url.and_then(|url| {
        THREAD_ID_PATTERNS.iter().find_map(|pattern| {
            pattern
                .captures(url)
                .and_then(|captures| captures.get(1))
                .map(|id| id.as_str().to_string())
        })
    });

    from_url
        .filter(|id| !id.is_empty())
        .or_else(|| first_populated(record, THREAD_ID_FIELDS).map(value_to_text))
}

/// Groups records into threads.
pub struct ThreadAnalyzer;

impl Analyzer for ThreadAnalyzer {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Metrics {
        let mut sizes: HashMap<String, u64> = HashMap::new();
        let mut threaded = 0usize;

        for id in ctx.records.iter().filter_map(thread_id) {
            threaded += 1;
            *sizes.entry(id).or_insert(0) += 1;
        }

        let mut metrics = Metrics::new();
        if threaded == 0 {
            return metrics;
        }

        let unique = sizes.len();
        metrics.insert("unique_threads".into(), json!(unique));
        metrics.insert("total_thread_items".into(), json!(threaded));
        metrics.insert(
            "avg_items_per_thread".into(),
            json!(ratio(threaded as f64, unique as f64)),
        );
        metrics.insert(
            "max_items_per_thread".into(),
            json!(sizes.values().copied().max().unwrap_or(0)),
        );
        metrics.insert(
            "thread_coverage_breadth".into(),
            json!(rate(unique, ctx.total_items)),
        );
        metrics
    }
}
