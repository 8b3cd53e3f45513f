use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use url::Url;

use crate::records::{
    fields::{str_field, URL_FIELDS},
    Record,
};

use super::{AnalysisContext, Analyzer, Metrics};

const TOP_DOMAINS: usize = 3;

/// Page vs thread URLs, host distribution and structural URL patterns.
pub struct UrlAnalyzer;

/// `host[:port]` of an absolute or scheme-relative (`//host/path`) URL;
/// `None` for relative or unparsable input.
///
/// The host comes back normalised: lowercased, without userinfo, and without
/// the scheme's default port.
pub fn url_host(raw: &str) -> Option<String> {
    let parsed = match raw.strip_prefix("//") {
        Some(rest) => Url::parse(&format!("http://{rest}")).ok()?,
        None => Url::parse(raw).ok()?,
    };
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn is_thread_path(url: &str) -> bool {
    url.contains("/threads/")
}

fn is_post_redirect(url: &str) -> bool {
    url.contains("/post-")
}

fn is_paginated(url: &str) -> bool {
    url.contains("/page-") || url.contains("page=")
}

/// Pattern counters, in reporting order.
const PATTERNS: [(&str, fn(&str) -> bool); 3] = [
    ("thread_pattern_count", is_thread_path),
    ("post_redirect_count", is_post_redirect),
    ("pagination_count", is_paginated),
];

fn is_page_record(record: &Record) -> bool {
    !(record.contains_key("thread_url") || record.contains_key("post_id"))
}

/// Occurrence counter that remembers first-seen order for tie-breaks.
#[derive(Default)]
struct OrderedCounts {
    counts: HashMap<String, (usize, u64)>,
}

impl OrderedCounts {
    fn add(&mut self, key: String) {
        let next = self.counts.len();
        self.counts.entry(key).or_insert((next, 0)).1 += 1;
    }

    fn len(&self) -> usize {
        self.counts.len()
    }

    fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Highest counts first; equal counts keep first-seen order.
    fn top(&self, n: usize) -> Vec<(&str, u64)> {
        let mut entries: Vec<_> = self
            .counts
            .iter()
            .map(|(key, (order, count))| (key.as_str(), *order, *count))
            .collect();
        entries.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));
        entries
            .into_iter()
            .take(n)
            .map(|(key, _, count)| (key, count))
            .collect()
    }
}

impl Analyzer for UrlAnalyzer {
    fn name(&self) -> &'static str {
        "url"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Metrics {
        let mut page_urls: HashSet<&str> = HashSet::new();
        let mut thread_urls: HashSet<&str> = HashSet::new();
        let mut mentions: Vec<&str> = Vec::new();
        let mut domains = OrderedCounts::default();
        let mut pattern_counts = [0u64; PATTERNS.len()];

        for record in ctx.records {
            if is_page_record(record) {
                if let Some(url) = str_field(record, "url") {
                    page_urls.insert(url);
                    mentions.push(url);
                }
            }

            if let Some(thread_url) = str_field(record, "thread_url") {
                thread_urls.insert(thread_url);
                mentions.push(thread_url);
            }

            for url in URL_FIELDS.iter().filter_map(|field| str_field(record, field)) {
                if let Some(host) = url_host(url) {
                    domains.add(host);
                }
                for (slot, (_, matches)) in pattern_counts.iter_mut().zip(PATTERNS.iter()) {
                    if matches(url) {
                        *slot += 1;
                    }
                }
            }
        }

        let mut metrics = Metrics::new();
        metrics.insert("unique_page_urls".into(), json!(page_urls.len()));
        metrics.insert("unique_thread_urls".into(), json!(thread_urls.len()));

        if mentions.is_empty() {
            return metrics;
        }

        let combined: HashSet<&str> = mentions.iter().copied().collect();
        metrics.insert("total_url_mentions".into(), json!(mentions.len()));
        metrics.insert("unique_urls_combined".into(), json!(combined.len()));

        if !domains.is_empty() {
            metrics.insert("unique_domains".into(), json!(domains.len()));
            let top: Metrics = domains
                .top(TOP_DOMAINS)
                .into_iter()
                .map(|(domain, count)| (domain.to_string(), json!(count)))
                .collect();
            metrics.insert("top_domains".into(), Value::Object(top));
        }

        let patterns: Metrics = PATTERNS
            .iter()
            .zip(pattern_counts)
            .filter(|(_, count)| *count > 0)
            .map(|((name, _), count)| (name.to_string(), json!(count)))
            .collect();
        if !patterns.is_empty() {
            metrics.insert("url_patterns".into(), Value::Object(patterns));
        }

        metrics
    }
}
