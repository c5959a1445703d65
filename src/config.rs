use anyhow::{anyhow, Result};
use clap::Parser;
use regex::Regex;
use std::path::PathBuf;
use tracing::info;

use crate::library::{compile_pattern, DEFAULT_PATTERN};
use crate::output::{GENRES_FILE, MOVIE_DETAILS_FILE};
use crate::tmdb::{CatalogConfig, Ranking, DEFAULT_BASE_URL};

pub const TOKEN_VAR: &str = "TMDB_ACCESS_TOKEN";
pub const BASE_URL_VAR: &str = "TMDB_BASE_URL";

/// Resolve every `<year> <title>` folder in a movie library against TMDB and
/// dump genres and movie details as JSON lines.
#[derive(Parser)]
#[command(name = "cinescan", version, about)]
pub struct Cli {
    /// Directory whose subfolders are named `<year> <title>`
    pub library_dir: PathBuf,

    /// Folder names must match this regex to be looked up
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pub pattern: String,

    /// Where genres.jsonl and moviedetails.jsonl are written
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Maximum TMDB requests in flight
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,

    /// How to choose between several search hits
    #[arg(long, value_enum, default_value_t = Ranking::First)]
    pub ranking: Ranking,

    /// Retries for transport errors, 429 and 5xx responses
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// TMDB API read access token
    #[arg(long, env = TOKEN_VAR, hide_env_values = true)]
    pub access_token: Option<String>,

    /// Override the TMDB API root, e.g. for a local mirror
    #[arg(long, env = BASE_URL_VAR)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub library_dir: PathBuf,
    pub pattern: Regex,
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub catalog: CatalogConfig,
}

impl Config {
    /// The token and base URL come from `--access-token`/`--base-url` or
    /// their environment variables, whichever clap found.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let token = cli
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("{} (or --access-token) must be set", TOKEN_VAR))?;
        let pattern = compile_pattern(&cli.pattern)?;

        let mut catalog = CatalogConfig::new(token);
        catalog.base_url = cli
            .base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        catalog.max_retries = cli.max_retries;
        catalog.ranking = cli.ranking.policy();

        let concurrency = cli.concurrency.clamp(1, 64);
        info!(
            "Library {} (pattern {}), concurrency {}, ranking {:?}",
            cli.library_dir.display(),
            pattern.as_str(),
            concurrency,
            cli.ranking
        );

        Ok(Self {
            library_dir: cli.library_dir,
            pattern,
            output_dir: cli.output_dir,
            concurrency,
            catalog,
        })
    }

    pub fn genres_path(&self) -> PathBuf {
        self.output_dir.join(GENRES_FILE)
    }

    pub fn details_path(&self) -> PathBuf {
        self.output_dir.join(MOVIE_DETAILS_FILE)
    }
}
