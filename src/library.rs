//! Local library scanning: turns `<year> <title>` movie folders into search inputs.
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::models::LibraryEntry;

pub const DEFAULT_PATTERN: &str = r"^(\d{4})\s(.*)$";

pub static DEFAULT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_PATTERN).expect("default library pattern compiles"));

/// Lists the immediate subdirectories of `dir` whose names match `pattern`.
///
/// Matching names are split on their first whitespace into year and title,
/// regardless of the pattern's capture groups.
pub fn scan_library(dir: &Path, pattern: &Regex) -> Result<Vec<LibraryEntry>> {
    let mut entries = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for item in walker {
        let item = item.with_context(|| format!("Failed to read library {}", dir.display()))?;
        if !item.file_type().is_dir() {
            continue;
        }
        let Some(name) = item.file_name().to_str() else {
            debug!("Skipping non UTF-8 entry {:?}", item.file_name());
            continue;
        };
        if !pattern.is_match(name) {
            debug!("Skipping '{}': name does not match pattern", name);
            continue;
        }
        match parse_folder_name(name) {
            Some(entry) => entries.push(entry),
            None => debug!("Skipping '{}': no whitespace after year", name),
        }
    }

    info!(
        "Found {} movie folders in {}",
        entries.len(),
        dir.display()
    );
    Ok(entries)
}

pub fn parse_folder_name(name: &str) -> Option<LibraryEntry> {
    let (year, title) = name.split_once(char::is_whitespace)?;
    Some(LibraryEntry {
        title: title.to_string(),
        year: year.to_string(),
    })
}

pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("Invalid library pattern '{}'", pattern))
}
