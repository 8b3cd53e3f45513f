use serde_json::json;
use std::collections::HashSet;

use crate::records::fields::{first_present, value_to_text, ID_FIELDS};

use super::{stats::rate, AnalysisContext, Analyzer, Metrics};

/// Identifier uniqueness. Records without any id-like field are left out
/// of the denominator.
pub struct IdentifierAnalyzer;

impl Analyzer for IdentifierAnalyzer {
    fn name(&self) -> &'static str {
        "identifier"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Metrics {
        let ids: Vec<String> = ctx
            .records
            .iter()
            .filter_map(|record| first_present(record, ID_FIELDS))
            .map(value_to_text)
            .collect();

        let mut metrics = Metrics::new();
        if ids.is_empty() {
            return metrics;
        }

        let unique = ids.iter().collect::<HashSet<_>>().len();
        let duplicates = ids.len() - unique;

        metrics.insert("items_with_ids".into(), json!(ids.len()));
        metrics.insert("unique_ids".into(), json!(unique));
        metrics.insert("duplicate_items".into(), json!(duplicates));
        metrics.insert("duplication_rate".into(), json!(rate(duplicates, ids.len())));
        metrics
    }
}
