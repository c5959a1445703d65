use serde::{Deserialize, Serialize};

/// TMDB catalog identifier for a movie.
pub type MovieId = i64;

/// A movie folder found in the local library, split into its year prefix and title.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub title: String,
    pub year: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Genre {
    pub name: String,
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct GenreCollection {
    pub genres: Vec<Genre>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SearchCandidate {
    pub id: MovieId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub adult: bool,
}

/// One page of `/search/movie` results.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ResultPage {
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub results: Vec<SearchCandidate>,
    #[serde(default)]
    pub total_pages: i64,
    #[serde(default)]
    pub total_results: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct BelongsToCollection {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ProductionCompany {
    pub id: i64,
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub origin_country: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ProductionCountry {
    pub iso_3166_1: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SpokenLanguage {
    #[serde(default)]
    pub english_name: String,
    pub iso_639_1: String,
    #[serde(default)]
    pub name: String,
}

/// Full `/movie/{id}` record as written to `moviedetails.jsonl`.
///
/// Fields TMDB may send as `null` are optional; fields it may omit fall back to
/// their defaults so older or sparse records still decode.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct MovieDetail {
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub belongs_to_collection: Option<BelongsToCollection>,
    #[serde(default)]
    pub budget: i64,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub homepage: Option<String>,
    pub id: MovieId,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub original_language: String,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub production_companies: Vec<ProductionCompany>,
    #[serde(default)]
    pub production_countries: Vec<ProductionCountry>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub revenue: i64,
    #[serde(default)]
    pub runtime: Option<i64>,
    #[serde(default)]
    pub spoken_languages: Vec<SpokenLanguage>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub video: bool,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: i64,
}
