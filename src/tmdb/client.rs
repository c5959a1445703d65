use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CatalogApi, CatalogError, FirstResult, RankingPolicy};
use crate::models::{GenreCollection, MovieDetail, MovieId, ResultPage};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Everything the TMDB client needs, resolved once at startup.
#[derive(Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    pub access_token: String,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    /// Upper bound on a server-requested `Retry-After` wait.
    pub max_retry_after: Duration,
    pub ranking: Arc<dyn RankingPolicy>,
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("max_retry_after", &self.max_retry_after)
            .field("ranking", &self.ranking)
            .finish()
    }
}

impl CatalogConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: access_token.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_retry_after: MAX_RETRY_AFTER,
            ranking: Arc::new(FirstResult),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    config: CatalogConfig,
}

impl TmdbClient {
    pub fn new(mut config: CatalogConfig) -> Result<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let user_agent = format!("cinescan/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self { client, config })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        let mut attempt = 0u32;
        loop {
            debug!("GET {} (attempt {})", url, attempt + 1);
            let sent = self
                .client
                .get(url)
                .bearer_auth(&self.config.access_token)
                .header(ACCEPT, "application/json")
                .send()
                .await;

            let res = match sent {
                Ok(res) => res,
                Err(e) if attempt < self.config.max_retries => {
                    let wait = self.backoff(attempt);
                    warn!("TMDB request failed ({}), retrying in {:?}", e, wait);
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                    continue;
                }
                Err(source) => {
                    return Err(CatalogError::Transport {
                        url: url.to_string(),
                        source,
                    })
                }
            };

            let status = res.status();
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < self.config.max_retries {
                let wait = retry_after(res.headers(), self.config.max_retry_after)
                    .unwrap_or_else(|| self.backoff(attempt));
                warn!("TMDB returned {} for {}, retrying in {:?}", status, url, wait);
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            let text = res.text().await.map_err(|source| CatalogError::Transport {
                url: url.to_string(),
                source,
            })?;
            if !status.is_success() {
                return Err(CatalogError::Status {
                    url: url.to_string(),
                    status,
                    body: text,
                });
            }
            return serde_json::from_str(&text).map_err(|source| CatalogError::Decode {
                url: url.to_string(),
                source,
            });
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config
            .retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[async_trait]
impl CatalogApi for TmdbClient {
    async fn list_genres(&self) -> Result<GenreCollection, CatalogError> {
        let url = format!("{}/genre/movie/list?language=en", self.config.base_url);
        self.get_json(&url).await
    }

    async fn search_movies(&self, title: &str, year: &str) -> Result<ResultPage, CatalogError> {
        let url = format!(
            "{}/search/movie?query={}&include_adult=true&language=en-US&year={}",
            self.config.base_url,
            urlencoding::encode(title),
            urlencoding::encode(year)
        );
        self.get_json(&url).await
    }

    async fn search_movie_id(&self, title: &str, year: &str) -> Result<MovieId, CatalogError> {
        let page = self.search_movies(title, year).await?;
        self.config
            .ranking
            .pick(&page.results)
            .map(|c| c.id)
            .ok_or_else(|| CatalogError::NoMatch {
                title: title.to_string(),
                year: year.to_string(),
            })
    }

    async fn fetch_movie_detail(&self, id: MovieId) -> Result<MovieDetail, CatalogError> {
        let url = format!("{}/movie/{id}", self.config.base_url);
        self.get_json(&url).await
    }
}

fn retry_after(headers: &HeaderMap, cap: Duration) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(cap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmdb::MostPopular;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "test-token";

    fn client_for(server: &MockServer) -> TmdbClient {
        let mut config = CatalogConfig::new(TOKEN);
        config.base_url = server.uri();
        config.max_retries = 2;
        config.retry_base_delay = Duration::from_millis(1);
        TmdbClient::new(config).expect("client builds")
    }

    fn search_body(hits: serde_json::Value) -> serde_json::Value {
        json!({ "page": 1, "results": hits, "total_pages": 1, "total_results": 2 })
    }

    #[tokio::test]
    async fn lists_genres_with_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/genre/movie/list"))
            .and(query_param("language", "en"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "genres": [{ "id": 28, "name": "Action" }, { "id": 18, "name": "Drama" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let genres = client_for(&server).list_genres().await.unwrap();
        assert_eq!(genres.genres.len(), 2);
        assert_eq!(genres.genres[1].name, "Drama");
    }

    #[tokio::test]
    async fn search_sends_query_parameters_and_takes_first_hit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .and(query_param("query", "The Matrix"))
            .and(query_param("year", "1999"))
            .and(query_param("include_adult", "true"))
            .and(query_param("language", "en-US"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([
                { "id": 603, "title": "The Matrix", "popularity": 12.0 },
                { "id": 55931, "title": "The Matrix Revisited", "popularity": 40.0 }
            ]))))
            .mount(&server)
            .await;

        let id = client_for(&server)
            .search_movie_id("The Matrix", "1999")
            .await
            .unwrap();
        assert_eq!(id, 603);
    }

    #[tokio::test]
    async fn popularity_ranking_is_applied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([
                { "id": 603, "title": "The Matrix", "popularity": 12.0 },
                { "id": 55931, "title": "The Matrix Revisited", "popularity": 40.0 }
            ]))))
            .mount(&server)
            .await;

        let mut config = CatalogConfig::new(TOKEN);
        config.base_url = server.uri();
        config.ranking = Arc::new(MostPopular);
        let client = TmdbClient::new(config).unwrap();
        assert_eq!(client.search_movie_id("The Matrix", "1999").await.unwrap(), 55931);
    }

    #[tokio::test]
    async fn empty_search_is_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([]))))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .search_movie_id("Nothing Here", "2042")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NoMatch { ref title, ref year } if title == "Nothing Here" && year == "2042"));
    }

    #[tokio::test]
    async fn fetches_movie_detail_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/27205"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 27205,
                "title": "Inception",
                "original_title": "Inception",
                "runtime": 148,
                "belongs_to_collection": null,
                "genres": [{ "id": 28, "name": "Action" }]
            })))
            .mount(&server)
            .await;

        let detail = client_for(&server).fetch_movie_detail(27205).await.unwrap();
        assert_eq!(detail.title, "Inception");
        assert_eq!(detail.runtime, Some(148));
    }

    #[tokio::test]
    async fn retries_rate_limited_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 603, "title": "The Matrix" })))
            .expect(1)
            .mount(&server)
            .await;

        let detail = client_for(&server).fetch_movie_detail(603).await.unwrap();
        assert_eq!(detail.id, 603);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/1"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_movie_detail(1).await.unwrap_err();
        match err {
            CatalogError::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/404"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_movie_detail(404).await.unwrap_err();
        assert!(matches!(err, CatalogError::Status { status, .. } if status == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/genre/movie/list"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).list_genres().await.unwrap_err();
        assert!(matches!(err, CatalogError::Decode { .. }));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let mut config = CatalogConfig::new(TOKEN);
        config.retry_base_delay = Duration::from_millis(100);
        let client = TmdbClient::new(config).unwrap();
        assert_eq!(client.backoff(0), Duration::from_millis(100));
        assert_eq!(client.backoff(1), Duration::from_millis(200));
        assert_eq!(client.backoff(3), Duration::from_millis(800));
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let mut config = CatalogConfig::new(TOKEN);
        config.base_url = "http://localhost:1234/3/".to_string();
        let client = TmdbClient::new(config).unwrap();
        assert_eq!(client.config.base_url, "http://localhost:1234/3");
    }

    #[tokio::test]
    async fn honors_retry_after_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 603, "title": "The Matrix" })))
            .expect(1)
            .mount(&server)
            .await;

        let detail = client_for(&server).fetch_movie_detail(603).await.unwrap();
        assert_eq!(detail.title, "The Matrix");
    }

    #[tokio::test]
    async fn huge_retry_after_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "86400"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 603, "title": "The Matrix" })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = CatalogConfig::new(TOKEN);
        config.base_url = server.uri();
        config.retry_base_delay = Duration::from_millis(1);
        config.max_retry_after = Duration::from_millis(10);
        let client = TmdbClient::new(config).unwrap();

        let detail = tokio::time::timeout(Duration::from_secs(5), client.fetch_movie_detail(603))
            .await
            .expect("capped wait finishes quickly")
            .unwrap();
        assert_eq!(detail.id, 603);
    }

    #[test]
    fn retry_after_is_clamped_to_cap() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers, MAX_RETRY_AFTER), None);

        headers.insert(RETRY_AFTER, "2".parse().unwrap());
        assert_eq!(retry_after(&headers, MAX_RETRY_AFTER), Some(Duration::from_secs(2)));

        headers.insert(RETRY_AFTER, "86400".parse().unwrap());
        assert_eq!(retry_after(&headers, MAX_RETRY_AFTER), Some(MAX_RETRY_AFTER));

        // HTTP-date form falls back to backoff.
        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap());
        assert_eq!(retry_after(&headers, MAX_RETRY_AFTER), None);
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = CatalogConfig::new(TOKEN);
        config.base_url = format!("http://{addr}");
        config.max_retries = 1;
        config.retry_base_delay = Duration::from_millis(1);
        let client = TmdbClient::new(config).unwrap();

        let err = client.list_genres().await.unwrap_err();
        assert!(matches!(err, CatalogError::Transport { .. }), "got {err:?}");
    }

    #[test]
    fn debug_output_hides_access_token() {
        let config = CatalogConfig::new("super-secret-token");
        let client = TmdbClient::new(config.clone()).unwrap();
        for rendered in [format!("{config:?}"), format!("{client:?}")] {
            assert!(!rendered.contains("super-secret-token"), "{rendered}");
            assert!(rendered.contains("<redacted>"));
        }
    }
}
