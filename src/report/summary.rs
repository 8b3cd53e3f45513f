//! Human-readable console summaries of a finished run.

use serde_json::Value;
use std::{fmt::Write as _, fs, path::Path};

use super::BenchmarkReport;

/// Lines of collector output shown after a failed run.
pub const LOG_TAIL_LINES: usize = 30;

enum Format {
    Count,
    OneDecimal,
    Chars,
    Percent,
}

const QUALITY_LINES: &[(&str, &str, Format)] = &[
    ("unique_page_urls", "Unique page URLs", Format::Count),
    ("unique_thread_urls", "Unique thread URLs", Format::Count),
    ("unique_threads", "Unique threads", Format::Count),
    ("avg_items_per_thread", "Avg items/thread", Format::OneDecimal),
    ("unique_authors", "Unique authors", Format::Count),
    ("avg_text_length", "Avg text length", Format::Chars),
    ("non_trivial_text_rate", "Non-trivial text", Format::Percent),
];

fn render(value: &Value, format: &Format) -> String {
    let number = value.as_f64().unwrap_or(0.0);
    match format {
        Format::Count => value.to_string(),
        Format::OneDecimal => format!("{number:.1}"),
        Format::Chars => format!("{number:.0} chars"),
        Format::Percent => format!("{:.1}%", number * 100.0),
    }
}

/// `[COMPLETE]` line followed by the enhanced and quality blocks that apply.
pub fn success_summary(report: &BenchmarkReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n[COMPLETE] Runtime: {:.1}s | Items: {} | Memory: {:.1}MB",
        report.total_runtime_seconds, report.items_extracted, report.peak_memory_mb
    );

    if let Some(enhanced) = &report.enhanced_metrics {
        let dup = &enhanced.duplication;
        let _ = writeln!(out, "\n[DUPLICATION METRICS]");
        let _ = writeln!(out, "  Duplication rate: {:.1}%", dup.duplication_rate * 100.0);
        let _ = writeln!(out, "  Unique content: {} items", dup.unique_content_hashes);
        let _ = writeln!(out, "  Unique post IDs: {}", dup.unique_post_ids);
        if dup.max_duplications > 1 {
            let _ = writeln!(out, "  Max duplications: {}x", dup.max_duplications);
        }

        let authors = &enhanced.authors;
        let _ = writeln!(out, "\n[AUTHOR METRICS]");
        let _ = writeln!(out, "  Author coverage: {:.1}%", authors.author_coverage_rate * 100.0);
        let _ = writeln!(out, "  Unique authors: {}", authors.unique_authors);
        let _ = writeln!(
            out,
            "  Posts with authors: {}/{}",
            authors.posts_with_authors,
            authors.posts_with_authors + authors.posts_without_authors
        );

        let crawl = &enhanced.crawl;
        let _ = writeln!(out, "\n[CRAWL METRICS]");
        let _ = writeln!(out, "  Unique threads: {}", crawl.unique_threads);
        let _ = writeln!(out, "  Avg thread depth: {:.1} posts/thread", crawl.avg_thread_depth);
        let _ = writeln!(out, "  Max thread depth: {} posts", crawl.max_thread_depth);
    }

    let quality: Vec<String> = QUALITY_LINES
        .iter()
        .filter_map(|(key, label, format)| {
            report
                .metric(key)
                .map(|value| format!("  {label}: {}", render(value, format)))
        })
        .collect();
    let _ = writeln!(out, "[QUALITY METRICS]");
    let _ = writeln!(out, "  Items/sec: {:.2}", report.items_per_second);
    for line in quality {
        let _ = writeln!(out, "{line}");
    }

    out
}

/// `[ERROR]` lines naming the exit code and the log, plus the log tail.
pub fn error_summary(report: &BenchmarkReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n[ERROR] Collector '{}' failed with exit code {}",
        report.collector_name, report.exit_code
    );
    let _ = writeln!(out, "[ERROR] See log: {}", report.log_file);
    if let Some(tail) = log_tail(Path::new(&report.log_file), LOG_TAIL_LINES) {
        let _ = writeln!(out, "[ERROR] Log tail:");
        let _ = write!(out, "{tail}");
    }
    out
}

/// Last `lines` lines of a log file. `None` if it is unreadable or empty.
pub fn log_tail(path: &Path, lines: usize) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    let text = String::from_utf8_lossy(&bytes);
    let all: Vec<&str> = text.lines().collect();
    if all.is_empty() {
        return None;
    }

    let start = all.len().saturating_sub(lines);
    let mut tail = all[start..].join("\n");
    tail.push('\n');
    Some(tail)
}
