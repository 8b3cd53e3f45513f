//! Known collectors and how to launch them.
//!
//! Each entry turns a collector name, a limit and a per-run data directory
//! into a command line plus the files the collector is expected to write.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::settings::Settings;

/// Every collector name [`plan`] accepts.
pub const COLLECTORS: &[&str] = &[
    "reddit",
    "sites",
    "tunisia_sat",
    "derja_ninja",
    "youtube",
    "facebook",
    "scrapy_reddit",
    "scrapy_sites",
    "scrapy_tunisia_sat",
    "scrapy_derja_ninja",
    "scrapy_youtube",
    "scrapy_facebook_groups",
];

const SCRAPY_PREFIX: &str = "scrapy_";

#[derive(Debug, Clone, PartialEq)]
pub struct CollectorPlan {
    /// argv; the first element is the program.
    pub command: Vec<String>,
    pub output_files: Vec<PathBuf>,
}

impl CollectorPlan {
    /// Create the parent directory of every expected output file.
    pub fn prepare(&self) -> Result<()> {
        for parent in self.output_files.iter().filter_map(|file| file.parent()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        Ok(())
    }
}

pub fn is_known(name: &str) -> bool {
    COLLECTORS.contains(&name)
}

/// What the limit counts for a collector, for the start banner.
pub fn item_kind(name: &str) -> &'static str {
    if name.contains("reddit") {
        "posts"
    } else if name.contains("youtube") {
        "pages (videos)"
    } else if name.contains("facebook") {
        "posts per group"
    } else {
        "pages"
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn script(settings: &Settings, file: &str) -> String {
    path_arg(&settings.collectors_dir.join(file))
}

/// Command line and expected outputs for `name`.
///
/// Fails for names outside [`COLLECTORS`].
pub fn plan(
    name: &str,
    limit: u32,
    run_data_dir: &Path,
    settings: &Settings,
) -> Result<CollectorPlan> {
    if let Some(spider) = name.strip_prefix(SCRAPY_PREFIX) {
        return scrapy_plan(spider, limit, run_data_dir);
    }

    let python = settings.python.clone();
    let limit = limit.to_string();
    let out = |file: &str| run_data_dir.join(file);

    let plan = match name {
        "reddit" => {
            let posts = out("posts.jsonl");
            let comments = out("comments.jsonl");
            CollectorPlan {
                command: vec![
                    python,
                    script(settings, "collect_reddit.py"),
                    "--sub".into(),
                    "Tunisia".into(),
                    "--limit".into(),
                    limit,
                    "--sort".into(),
                    "new".into(),
                    "--out_posts".into(),
                    path_arg(&posts),
                    "--out_comments".into(),
                    path_arg(&comments),
                ],
                output_files: vec![posts, comments],
            }
        }
        "sites" => {
            let pages = out("sites.jsonl");
            CollectorPlan {
                command: vec![
                    python,
                    script(settings, "collect_sites.py"),
                    "--start_urls".into(),
                    "https://www.pm.gov.tn".into(),
                    "--domains".into(),
                    "pm.gov.tn".into(),
                    "--max_pages".into(),
                    limit,
                    "--out".into(),
                    path_arg(&pages),
                ],
                output_files: vec![pages],
            }
        }
        "tunisia_sat" => {
            let raw = out("raw.jsonl");
            let posts = out("posts.jsonl");
            let vocab = out("vocab.json");
            CollectorPlan {
                command: vec![
                    python,
                    script(settings, "collect_tunisia_sat.py"),
                    "--max_pages".into(),
                    limit,
                    "--out_vocab".into(),
                    path_arg(&vocab),
                    "--out_raw".into(),
                    path_arg(&raw),
                    "--out_posts".into(),
                    path_arg(&posts),
                ],
                output_files: vec![raw, posts, vocab],
            }
        }
        "derja_ninja" => {
            let raw = out("pages.jsonl");
            let cards = out("cards.jsonl");
            let vocab = out("vocab.json");
            CollectorPlan {
                command: vec![
                    python,
                    script(settings, "collect_derja_ninja.py"),
                    "--max_pages".into(),
                    limit,
                    "--out_vocab".into(),
                    path_arg(&vocab),
                    "--out_raw".into(),
                    path_arg(&raw),
                    "--out_cards".into(),
                    path_arg(&cards),
                ],
                output_files: vec![raw, cards, vocab],
            }
        }
        "youtube" => {
            let videos = out("youtube.jsonl");
            CollectorPlan {
                command: vec![
                    "uv".into(),
                    "run".into(),
                    "python".into(),
                    script(settings, "collect_youtube.py"),
                    "--search".into(),
                    "darija tunisienne".into(),
                    "--pages".into(),
                    limit,
                    "--out".into(),
                    path_arg(&videos),
                ],
                output_files: vec![videos],
            }
        }
        // The limit is per group, matching the other collectors where it
        // bounds the main quantity collected.
        "facebook" => {
            let posts = out("facebook_groups.jsonl");
            CollectorPlan {
                command: vec![
                    python,
                    script(settings, "collect_facebook.py"),
                    "--groups".into(),
                    "Texas A&M Free and For Sale".into(),
                    "--per_group_limit".into(),
                    limit,
                    "--out".into(),
                    path_arg(&posts),
                ],
                output_files: vec![posts],
            }
        }
        _ => bail!("Unknown collector '{name}'"),
    };

    Ok(plan)
}

fn scrapy_plan(spider: &str, limit: u32, run_data_dir: &Path) -> Result<CollectorPlan> {
    let out_dir = run_data_dir.join("output");
    let processed = run_data_dir.join("processed");

    let mut command: Vec<String> = vec![
        "uv".into(),
        "run".into(),
        "scrapy".into(),
        "crawl".into(),
        spider.into(),
        "-s".into(),
        format!("OUTPUT_DIR={}", out_dir.display()),
        "-s".into(),
        "LOG_LEVEL=INFO".into(),
    ];
    let mut spider_args = |pairs: &[(&str, String)]| {
        for (key, value) in pairs {
            command.push("-a".into());
            command.push(format!("{key}={value}"));
        }
    };

    let output_files = match spider {
        "reddit" => {
            spider_args(&[("limit", limit.to_string()), ("sub", "Tunisia".into())]);
            vec![out_dir.join("reddit_posts.jsonl")]
        }
        "sites" => {
            spider_args(&[
                ("max_pages", limit.to_string()),
                ("start_urls", "https://www.pm.gov.tn".into()),
                ("domains", "pm.gov.tn".into()),
            ]);
            vec![out_dir.join("sites.jsonl")]
        }
        "tunisia_sat" => {
            spider_args(&[("max_pages", limit.to_string())]);
            vec![
                out_dir.join("tunisia_sat_posts.jsonl"),
                out_dir.join("tunisia_sat_pages.jsonl"),
                processed.join("tunisia_sat_words.json"),
            ]
        }
        "derja_ninja" => {
            spider_args(&[("max_pages", limit.to_string())]);
            vec![
                out_dir.join("derja_ninja_pages.jsonl"),
                out_dir.join("derja_ninja_cards.jsonl"),
                processed.join("derja_ninja_words.json"),
            ]
        }
        "youtube" => {
            spider_args(&[
                ("pages", limit.to_string()),
                ("search", "darija tunisienne".into()),
            ]);
            vec![out_dir.join("youtube.jsonl")]
        }
        "facebook_groups" => {
            spider_args(&[
                ("groups", "Texas A&M Free and For Sale".into()),
                ("per_group_limit", limit.to_string()),
            ]);
            vec![out_dir.join("facebook_groups.jsonl")]
        }
        _ => bail!("Unknown scrapy spider '{spider}'"),
    };

    Ok(CollectorPlan {
        command,
        output_files,
    })
}
