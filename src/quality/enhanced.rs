//! Post-level analysis run by the benchmark report over post-like files:
//! content/id duplication, author coverage and crawl depth.
//!
//! Id duplication and content duplication are measured independently.
//! A record with an id but no text still counts towards `total_posts`,
//! and text is fingerprinted whether or not the record has an id, so the
//! two rates need not agree.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

use crate::records::{
    fields::{first_populated, is_populated, str_field, value_to_text},
    Record,
};

use super::stats::{rate, ratio};

const POST_ID_FIELDS: &[&str] = &["post_id", "id"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicationMetrics {
    pub total_posts: usize,
    pub unique_post_ids: usize,
    pub unique_content_hashes: usize,
    pub duplicate_count: usize,
    pub duplication_rate: f64,
    pub id_duplication_rate: f64,
    pub content_duplication_rate: f64,
    pub duplicate_id_count: usize,
    pub max_duplications: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_duplicated_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorCoverage {
    pub posts_with_authors: usize,
    pub posts_without_authors: usize,
    pub author_coverage_rate: f64,
    pub unique_authors: usize,
    pub avg_posts_per_author: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlMetrics {
    pub unique_threads: usize,
    pub unique_pages: usize,
    pub avg_thread_depth: f64,
    pub min_thread_depth: usize,
    pub max_thread_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedMetrics {
    pub duplication: DuplicationMetrics,
    pub authors: AuthorCoverage,
    pub crawl: CrawlMetrics,
}

/// Content fingerprint: hex SHA-256 of the text.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Counts keyed by value, remembering the order keys first appeared in.
struct FirstSeenCounter<K> {
    order: Vec<K>,
    counts: HashMap<K, usize>,
}

impl<K: std::hash::Hash + Eq + Clone> FirstSeenCounter<K> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            counts: HashMap::new(),
        }
    }

    fn add(&mut self, key: K) {
        let count = self.counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            self.order.push(key);
        }
        *count += 1;
    }

    fn total(&self) -> usize {
        self.counts.values().sum()
    }

    fn unique(&self) -> usize {
        self.counts.len()
    }

    /// Most frequent key; ties go to the key seen first.
    fn most_common(&self) -> Option<(&K, usize)> {
        let mut best: Option<(&K, usize)> = None;
        for key in &self.order {
            let count = self.counts[key];
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((key, count));
            }
        }
        best
    }
}

pub struct EnhancedAnalyzer;

impl EnhancedAnalyzer {
    /// `None` for an empty record set.
    pub fn analyze(records: &[Record]) -> Option<EnhancedMetrics> {
        if records.is_empty() {
            return None;
        }

        Some(EnhancedMetrics {
            duplication: Self::duplication(records),
            authors: Self::author_coverage(records),
            crawl: Self::crawl(records),
        })
    }

    pub fn duplication(records: &[Record]) -> DuplicationMetrics {
        // Ids are keyed by their JSON rendering so `1` and "1" stay distinct;
        // the display form is kept for reporting.
        let mut ids: FirstSeenCounter<String> = FirstSeenCounter::new();
        let mut display: HashMap<String, String> = HashMap::new();
        let mut hashes: HashSet<String> = HashSet::new();
        let mut duplicate_count = 0usize;

        for record in records {
            if let Some(id) = first_populated(record, POST_ID_FIELDS) {
                let key = id.to_string();
                display.entry(key.clone()).or_insert_with(|| value_to_text(id));
                ids.add(key);
            }

            if let Some(text) = str_field(record, "text").filter(|text| !text.is_empty()) {
                if !hashes.insert(fingerprint(text)) {
                    duplicate_count += 1;
                }
            }
        }

        let total_posts = ids.total();
        let unique_post_ids = ids.unique();
        let unique_content_hashes = hashes.len();
        let repeated = ids.counts.values().filter(|count| **count > 1).count();
        let most_common = ids.most_common();
        let max_duplications = most_common.map_or(0, |(_, count)| count);

        DuplicationMetrics {
            total_posts,
            unique_post_ids,
            unique_content_hashes,
            duplicate_count,
            duplication_rate: rate(duplicate_count, total_posts),
            id_duplication_rate: rate(total_posts - unique_post_ids, total_posts),
            content_duplication_rate: rate(
                total_posts.saturating_sub(unique_content_hashes),
                total_posts,
            ),
            duplicate_id_count: repeated,
            max_duplications,
            most_duplicated_id: most_common
                .filter(|(_, count)| *count > 1)
                .and_then(|(key, _)| display.get(key).cloned()),
        }
    }

    pub fn author_coverage(records: &[Record]) -> AuthorCoverage {
        let mut authors: HashSet<String> = HashSet::new();
        let mut with_author = 0usize;

        for author in records
            .iter()
            .filter_map(|record| record.get("author"))
            .filter(|author| !author.is_null())
        {
            with_author += 1;
            authors.insert(author.to_string());
        }

        AuthorCoverage {
            posts_with_authors: with_author,
            posts_without_authors: records.len() - with_author,
            author_coverage_rate: rate(with_author, records.len()),
            unique_authors: authors.len(),
            avg_posts_per_author: ratio(with_author as f64, authors.len() as f64),
        }
    }

    pub fn crawl(records: &[Record]) -> CrawlMetrics {
        let mut threads: HashMap<&str, usize> = HashMap::new();
        let mut pages: HashSet<&str> = HashSet::new();

        for record in records {
            let thread_url = record
                .get("thread_url")
                .filter(|value| is_populated(value))
                .or_else(|| record.get("url"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if let Some((_, rest)) = thread_url.split_once("/threads/") {
                let id = rest.split('/').next().unwrap_or_default();
                *threads.entry(id).or_insert(0) += 1;
            }

            if let Some(url) = str_field(record, "url").filter(|url| !url.is_empty()) {
                pages.insert(url);
            }
        }

        let depths: Vec<usize> = threads.values().copied().collect();
        CrawlMetrics {
            unique_threads: threads.len(),
            unique_pages: pages.len(),
            avg_thread_depth: ratio(depths.iter().sum::<usize>() as f64, depths.len() as f64),
            min_thread_depth: depths.iter().copied().min().unwrap_or(0),
            max_thread_depth: depths.iter().copied().max().unwrap_or(0),
        }
    }
}
