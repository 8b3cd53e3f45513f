use serde_json::json;
use std::collections::HashMap;

use crate::records::fields::{first_populated, value_to_text, AUTHOR_FIELDS};

use super::{
    stats::{rate, ratio},
    AnalysisContext, Analyzer, Metrics,
};

/// Author attribution coverage and spread.
pub struct AuthorAnalyzer;

impl Analyzer for AuthorAnalyzer {
    fn name(&self) -> &'static str {
        "author"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Metrics {
        let mut per_author: HashMap<String, u64> = HashMap::new();
        let mut attributed = 0usize;

        for author in ctx
            .records
            .iter()
            .filter_map(|record| first_populated(record, AUTHOR_FIELDS))
        {
            attributed += 1;
            *per_author.entry(value_to_text(author)).or_insert(0) += 1;
        }

        let mut metrics = Metrics::new();
        if attributed == 0 {
            return metrics;
        }

        let unique = per_author.len();
        metrics.insert("items_with_authors".into(), json!(attributed));
        metrics.insert("unique_authors".into(), json!(unique));
        metrics.insert(
            "items_per_author".into(),
            json!(ratio(attributed as f64, unique as f64)),
        );
        metrics.insert(
            "author_coverage_rate".into(),
            json!(rate(attributed, ctx.total_items)),
        );
        metrics.insert(
            "top_author_items".into(),
            json!(per_author.values().copied().max().unwrap_or(0)),
        );
        metrics
    }
}
