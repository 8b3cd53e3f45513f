use serde_json::json;

use crate::records::fields::{first_text, TEXT_FIELDS};

use super::{
    stats::{rate, ratio, LengthSummary},
    AnalysisContext, Analyzer, Metrics,
};

/// Texts at least this many characters long count as non-trivial.
pub const MIN_NONTRIVIAL_TEXT_LENGTH: usize = 50;

/// Text presence and length distribution.
///
/// Length is measured in characters, not bytes.
pub struct TextAnalyzer {
    pub min_nontrivial_length: usize,
}

impl Default for TextAnalyzer {
    fn default() -> Self {
        Self {
            min_nontrivial_length: MIN_NONTRIVIAL_TEXT_LENGTH,
        }
    }
}

impl Analyzer for TextAnalyzer {
    fn name(&self) -> &'static str {
        "text"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Metrics {
        let mut metrics = Metrics::new();
        let mut lengths = Vec::new();
        let mut post_lengths = Vec::new();
        let mut page_lengths = Vec::new();
        let mut non_trivial = 0usize;

        for record in ctx.records {
            let Some(text) = first_text(record, TEXT_FIELDS) else {
                continue;
            };
            let length = text.chars().count();
            lengths.push(length);

            if length >= self.min_nontrivial_length {
                non_trivial += 1;
            }

            // Coarse record type: forum posts carry a thread url or post id,
            // plain pages only a url.
            if record.contains_key("thread_url") || record.contains_key("post_id") {
                post_lengths.push(length);
            } else if record.contains_key("url") {
                page_lengths.push(length);
            }
        }

        let Some(summary) = LengthSummary::from_lengths(lengths) else {
            return metrics;
        };

        metrics.insert("items_with_text".into(), json!(summary.count));
        metrics.insert(
            "items_missing_text".into(),
            json!(ctx.total_items.saturating_sub(summary.count)),
        );
        metrics.insert("non_trivial_items".into(), json!(non_trivial));
        metrics.insert(
            "non_trivial_text_rate".into(),
            json!(rate(non_trivial, ctx.total_items)),
        );
        metrics.insert("avg_text_length".into(), json!(summary.mean));
        metrics.insert("total_text_chars".into(), json!(summary.total));

        for (type_name, bucket) in [("posts", &post_lengths), ("pages", &page_lengths)] {
            if bucket.is_empty() {
                continue;
            }
            let total: usize = bucket.iter().sum();
            metrics.insert(
                format!("avg_{type_name}_text_length"),
                json!(ratio(total as f64, bucket.len() as f64)),
            );
            metrics.insert(format!("{type_name}_count"), json!(bucket.len()));
        }

        metrics.insert("min_text_length".into(), json!(summary.min));
        metrics.insert("max_text_length".into(), json!(summary.max));
        metrics.insert("median_text_length".into(), json!(summary.median));
        metrics.insert("text_length_p25".into(), json!(summary.p25));
        metrics.insert("text_length_p75".into(), json!(summary.p75));

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{parse_lines, Record};
    use serde_json::Value;

    fn analyze(lines: &str) -> Metrics {
        let records: Vec<Record> = parse_lines(lines.as_bytes()).0;
        TextAnalyzer::default().analyze(&AnalysisContext::new(&records))
    }

    #[test]
    fn length_distribution() {
        let metrics = analyze(&format!(
            "{{\"text\":\"{}\"}}\n{{\"content\":\"{}\"}}\n{{\"body\":\"{}\"}}\n{{\"message\":\"{}\"}}\n{{}}\n",
            "a".repeat(10),
            "b".repeat(20),
            "c".repeat(30),
            "d".repeat(40),
        ));

        assert_eq!(metrics["items_with_text"], json!(4));
        assert_eq!(metrics["items_missing_text"], json!(1));
        assert_eq!(metrics["median_text_length"], json!(30));
        assert_eq!(metrics["text_length_p25"], json!(20));
        assert_eq!(metrics["text_length_p75"], json!(40));
        assert_eq!(metrics["min_text_length"], json!(10));
        assert_eq!(metrics["max_text_length"], json!(40));
        assert_eq!(metrics["total_text_chars"], json!(100));
        assert_eq!(metrics["avg_text_length"], json!(25.0));
        assert_eq!(metrics["non_trivial_items"], json!(0));
    }

    #[test]
    fn non_trivial_threshold_is_inclusive() {
        let long = "x".repeat(MIN_NONTRIVIAL_TEXT_LENGTH);
        let metrics = analyze(&format!("{{\"text\":\"{long}\"}}\n{{\"text\":\"short\"}}\n"));
        assert_eq!(metrics["non_trivial_items"], json!(1));
        assert_eq!(metrics["non_trivial_text_rate"], json!(0.5));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let metrics = analyze("{\"text\":\"عسلامة\"}\n");
        assert_eq!(metrics["total_text_chars"], json!(6));
    }

    #[test]
    fn buckets_by_record_shape() {
        let metrics = analyze(concat!(
            "{\"text\":\"abcd\",\"thread_url\":\"t\"}\n",
            "{\"text\":\"ab\",\"post_id\":1}\n",
            "{\"text\":\"abcdef\",\"url\":\"u\"}\n",
            "{\"text\":\"z\"}\n",
        ));
        assert_eq!(metrics["posts_count"], json!(2));
        assert_eq!(metrics["avg_posts_text_length"], json!(3.0));
        assert_eq!(metrics["pages_count"], json!(1));
        assert_eq!(metrics["avg_pages_text_length"], json!(6.0));
    }

    #[test]
    fn no_text_means_no_metrics() {
        let metrics = analyze("{\"text\":\"  \"}\n{\"text\":42}\n");
        assert!(metrics.is_empty());
        assert!(!metrics.values().any(Value::is_null));
    }
}
