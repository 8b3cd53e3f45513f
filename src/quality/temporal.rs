use serde_json::json;

use crate::records::fields::{first_populated, DATE_FIELDS};

use super::{stats::rate, AnalysisContext, Analyzer, Metrics};

/// Share of records carrying any date-like value. Formats are not parsed.
pub struct TemporalAnalyzer;

impl Analyzer for TemporalAnalyzer {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Metrics {
        let dated = ctx
            .records
            .iter()
            .filter(|record| first_populated(record, DATE_FIELDS).is_some())
            .count();

        let mut metrics = Metrics::new();
        if dated > 0 {
            metrics.insert("items_with_dates".into(), json!(dated));
            metrics.insert("temporal_coverage".into(), json!(rate(dated, ctx.total_items)));
        }
        metrics
    }
}
