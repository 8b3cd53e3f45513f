pub mod fields;

use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Extension of the line-delimited JSON files the engine understands.
pub const JSONL_EXTENSION: &str = "jsonl";

/// One collected item: a schema-less JSON object.
pub type Record = Map<String, Value>;

/// Coarse content type of an output file, used for per-file stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Posts,
    Comments,
    Pages,
    Unknown,
}

/// Records read from one file, in line order.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub records: Vec<Record>,
    /// Lines that were not valid JSON objects. Informational only; never
    /// counted as items.
    pub malformed_lines: usize,
}

impl LoadedFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn kind(&self) -> FileKind {
        guess_file_kind(&self.file_name(), &self.records)
    }
}

pub fn is_jsonl(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case(JSONL_EXTENSION))
}

/// Post-like files feed the duplication / crawl analysis.
pub fn is_posts_file(path: &Path) -> bool {
    is_jsonl(path)
        && path
            .file_name()
            .map_or(false, |name| name.to_string_lossy().contains("posts"))
}

/// Loads JSONL output files into memory.
///
/// Missing files and malformed lines are skipped; nothing here fails the
/// benchmark. No reordering or deduplication happens at load time.
pub struct RecordStore;

impl RecordStore {
    /// All records of all files, file order then line order.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Vec<Record> {
        Self::load_files(paths)
            .into_iter()
            .flat_map(|file| file.records)
            .collect()
    }

    /// Per-file results, omitting files that do not exist.
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Vec<LoadedFile> {
        paths
            .iter()
            .filter_map(|path| Self::load_file(path.as_ref()))
            .collect()
    }

    /// `None` when the file does not exist or cannot be read.
    pub fn load_file(path: &Path) -> Option<LoadedFile> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log_debug!("output file {} not found; contributes no records", path.display());
                return None;
            }
            Err(err) => {
                log_warn!("could not read {}: {err}", path.display());
                return None;
            }
        };

        let (records, malformed_lines) = parse_lines(&bytes);
        if malformed_lines > 0 {
            log_debug!(
                "{}: kept {} records, dropped {} malformed lines",
                path.display(),
                records.len(),
                malformed_lines
            );
        }

        Some(LoadedFile {
            path: path.to_path_buf(),
            records,
            malformed_lines,
        })
    }
}

/// Parse newline-delimited JSON objects. Returns the records and the number
/// of non-blank lines that were dropped.
pub fn parse_lines(bytes: &[u8]) -> (Vec<Record>, usize) {
    let mut records = Vec::new();
    let mut malformed = 0;

    for line in bytes.split(|byte| *byte == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<Value>(line) {
            Ok(Value::Object(record)) => records.push(record),
            Ok(_) | Err(_) => malformed += 1,
        }
    }

    (records, malformed)
}

/// Guess what a file holds from its name, falling back to the shape of its
/// first record.
pub fn guess_file_kind(file_name: &str, records: &[Record]) -> FileKind {
    let lower = file_name.to_lowercase();
    if lower.contains("post") {
        return FileKind::Posts;
    }
    if lower.contains("comment") {
        return FileKind::Comments;
    }
    if lower.contains("page") || lower.contains("raw") {
        return FileKind::Pages;
    }

    match records.first() {
        Some(sample) if sample.contains_key("thread_url") || sample.contains_key("post_id") => {
            FileKind::Posts
        }
        Some(sample) if sample.contains_key("comment") || sample.contains_key("parent_id") => {
            FileKind::Comments
        }
        Some(sample) if sample.contains_key("url") && sample.contains_key("text") => {
            FileKind::Pages
        }
        _ => FileKind::Unknown,
    }
}
