//! The batch run: scan, resolve ids, fetch details, write.
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::fanout::{fan_out, TaskError};
use crate::library::scan_library;
use crate::models::{LibraryEntry, MovieDetail, MovieId};
use crate::output::write_jsonl;
use crate::tmdb::{CatalogApi, CatalogError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub matched: usize,
    pub resolved: usize,
    pub fetched: usize,
    pub search_failures: usize,
    pub detail_failures: usize,
    pub written: usize,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.search_failures == 0 && self.detail_failures == 0 && self.written == self.matched
    }
}

pub async fn run(config: &Config, catalog: Arc<dyn CatalogApi>) -> Result<RunSummary> {
    let entries = scan_library(&config.library_dir, &config.pattern)?;

    let genres = catalog
        .list_genres()
        .await
        .context("Failed to fetch TMDB genre list")?;
    write_jsonl(&config.genres_path(), [&genres])?;
    info!("Fetched {} genres", genres.genres.len());

    let matched = entries.len();
    let (ids, search_failures) = resolve_ids(catalog.clone(), entries, config.concurrency).await;
    let resolved = ids.len();
    let (details, detail_failures) = fetch_details(catalog, ids, config.concurrency).await;
    let fetched = details.len();

    let written = write_jsonl(&config.details_path(), &details)?;

    let summary = RunSummary {
        matched,
        resolved,
        fetched,
        search_failures,
        detail_failures,
        written,
    };
    info!(
        matched = summary.matched,
        resolved = summary.resolved,
        fetched = summary.fetched,
        search_failures = summary.search_failures,
        detail_failures = summary.detail_failures,
        "Run finished"
    );
    Ok(summary)
}

/// Searches every entry concurrently. Returns the ids found, in entry order,
/// and how many entries could not be resolved.
pub async fn resolve_ids(
    catalog: Arc<dyn CatalogApi>,
    entries: Vec<LibraryEntry>,
    concurrency: usize,
) -> (Vec<MovieId>, usize) {
    let labels: Vec<String> = entries
        .iter()
        .map(|e| format!("{} ({})", e.title, e.year))
        .collect();

    let batch = fan_out(entries, concurrency, move |entry: LibraryEntry| {
        let catalog = catalog.clone();
        async move { catalog.search_movie_id(&entry.title, &entry.year).await }
    })
    .await;

    let (found, failed) = batch.into_parts();
    for (index, err) in &failed {
        warn!("{}", search_failure_message(&labels[*index], err));
    }
    (found.into_iter().map(|(_, id)| id).collect(), failed.len())
}

/// Only an empty result list counts as "no match"; anything else is a failed
/// lookup and is reported with its cause.
fn search_failure_message(label: &str, err: &TaskError<CatalogError>) -> String {
    match err {
        TaskError::Failed(CatalogError::NoMatch { .. }) => format!("No TMDB match for '{}'", label),
        other => format!("TMDB search failed for '{}': {}", label, other),
    }
}

/// Fetches the full record for every id concurrently, keeping id order.
pub async fn fetch_details(
    catalog: Arc<dyn CatalogApi>,
    ids: Vec<MovieId>,
    concurrency: usize,
) -> (Vec<MovieDetail>, usize) {
    let requested = ids.clone();
    let batch = fan_out(ids, concurrency, move |id: MovieId| {
        let catalog = catalog.clone();
        async move { catalog.fetch_movie_detail(id).await }
    })
    .await;

    let (details, failed) = batch.into_parts();
    for (index, err) in &failed {
        warn!("Failed to fetch TMDB movie {}: {}", requested[*index], err);
    }
    (details.into_iter().map(|(_, d)| d).collect(), failed.len())
}
