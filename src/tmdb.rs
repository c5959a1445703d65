use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::{GenreCollection, MovieDetail, MovieId, ResultPage};

mod client;
pub mod ranking;

pub use client::{CatalogConfig, TmdbClient, DEFAULT_BASE_URL};
pub use ranking::{FirstResult, MostPopular, Ranking, RankingPolicy};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} -> {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("JSON parse failed for {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("No TMDB movie found for '{title}' ({year})")]
    NoMatch { title: String, year: String },
}

/// The remote movie catalog, as seen by the pipeline.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_genres(&self) -> Result<GenreCollection, CatalogError>;
    async fn search_movies(&self, title: &str, year: &str) -> Result<ResultPage, CatalogError>;
    /// Picks one identifier out of the search results for `title` and `year`.
    async fn search_movie_id(&self, title: &str, year: &str) -> Result<MovieId, CatalogError>;
    async fn fetch_movie_detail(&self, id: MovieId) -> Result<MovieDetail, CatalogError>;
}
