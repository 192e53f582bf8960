//! Naver open-API search client and query expansion
//!
//! The provider sits behind a trait so the pipeline and tests can swap in a
//! stub. The primary local search is fatal on upstream failure; the secondary
//! lookups (web, image, blog, page fetch) degrade to empty results because
//! they only feed best-effort enrichment.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::KidsonError;
use crate::config::NaverConfig;
use crate::geo;
use crate::keywords;
use crate::models::{BlogReview, Coordinates, RawPlaceRecord};
use crate::text::{normalize_space, strip_html, to_https_url};

/// Queries issued when the caller does not supply any
pub const DEFAULT_QUERIES: &[&str] = &[
    "실내놀이터",
    "어린이도서관",
    "공원",
    "유적지",
    "박물관",
    "미술관",
    "공연장",
    "키즈카페",
    "유아 동반 식당",
    "어린이서점",
    "완구점",
];

const PLACE_HTML_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; KidsonBot/1.0; +https://github.com/thoughtt1/kidson)";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sort order for blog searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlogSort {
    Similarity,
    Date,
}

impl BlogSort {
    fn as_param(self) -> &'static str {
        match self {
            BlogSort::Similarity => "sim",
            BlogSort::Date => "date",
        }
    }
}

/// One secondary web-search hit
#[derive(Debug, Clone, Default)]
pub struct WebSearchItem {
    pub title: String,
    pub description: String,
    pub link: String,
}

/// First hit of an image search
#[derive(Debug, Clone, Default)]
pub struct ImageSnippet {
    pub thumbnail: String,
    pub link: String,
}

/// One page of blog-search results
#[derive(Debug, Clone, Default)]
pub struct BlogSearchPage {
    pub total: u64,
    pub reviews: Vec<BlogReview>,
}

/// External place-search collaborator
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Primary local search; upstream failure is an error
    async fn local_search(&self, query: &str, display: usize) -> Result<Vec<RawPlaceRecord>>;

    /// Secondary web search used for place-link resolution
    async fn web_search(&self, query: &str, display: usize) -> Result<Vec<WebSearchItem>>;

    /// Best image hit for a query
    async fn image_search(&self, query: &str) -> Result<Option<ImageSnippet>>;

    /// Blog review search
    async fn blog_search(&self, query: &str, display: usize, sort: BlogSort)
    -> Result<BlogSearchPage>;

    /// Raw HTML of a place home page, for og:image extraction
    async fn fetch_page_html(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Default, Deserialize)]
struct LocalSearchResponse {
    #[serde(default)]
    items: Vec<RawPlaceRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct WebSearchResponse {
    #[serde(default)]
    items: Vec<RawWebItem>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWebItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Default, Deserialize)]
struct ImageSearchResponse {
    #[serde(default)]
    items: Vec<RawImageItem>,
}

#[derive(Debug, Default, Deserialize)]
struct RawImageItem {
    #[serde(default)]
    thumbnail: String,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Default, Deserialize)]
struct BlogSearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    items: Vec<RawBlogItem>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBlogItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    bloggername: String,
    #[serde(default)]
    postdate: String,
}

/// HTTP client for the Naver open APIs
pub struct NaverSearchClient {
    client: reqwest::Client,
    credentials: NaverConfig,
}

impl NaverSearchClient {
    pub fn new(credentials: NaverConfig) -> Result<Self> {
        if credentials.client_id.is_empty() || credentials.client_secret.is_empty() {
            return Err(KidsonError::config(
                "NAVER_SEARCH_CLIENT_ID / NAVER_SEARCH_CLIENT_SECRET are required",
            )
            .into());
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(PLACE_HTML_USER_AGENT)
            .build()
            .with_context(|| "Failed to create HTTP client")?;
        Ok(Self {
            client,
            credentials,
        })
    }

    async fn get_api(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .header("X-Naver-Client-Id", &self.credentials.client_id)
            .header("X-Naver-Client-Secret", &self.credentials.client_secret)
            .send()
            .await
            .with_context(|| "Naver API request failed")?;
        Ok(response)
    }
}

#[async_trait]
impl SearchProvider for NaverSearchClient {
    #[instrument(skip(self, display))]
    async fn local_search(&self, query: &str, display: usize) -> Result<Vec<RawPlaceRecord>> {
        let url = format!(
            "https://openapi.naver.com/v1/search/local.json?query={}&display={}&start=1&sort=comment",
            urlencoding::encode(query),
            display
        );
        let response = self.get_api(&url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(KidsonError::provider(format!(
                "Naver local API failed ({})",
                status.as_u16()
            ))
            .into());
        }
        let payload: LocalSearchResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse Naver local search response")?;
        debug!(query, count = payload.items.len(), "local search results");
        Ok(payload.items)
    }

    #[instrument(skip(self, display))]
    async fn web_search(&self, query: &str, display: usize) -> Result<Vec<WebSearchItem>> {
        let cleaned = normalize_space(query);
        if cleaned.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!(
            "https://openapi.naver.com/v1/search/webkr.json?query={}&display={}&start=1&sort=sim",
            urlencoding::encode(&cleaned),
            display
        );
        let response = self.get_api(&url).await?;
        if !response.status().is_success() {
            warn!(query, status = %response.status(), "web search failed");
            return Ok(Vec::new());
        }
        let payload: WebSearchResponse = response.json().await.unwrap_or_default();
        Ok(payload
            .items
            .into_iter()
            .map(|item| WebSearchItem {
                title: strip_html(&item.title).trim().to_string(),
                description: strip_html(&item.description).trim().to_string(),
                link: to_https_url(&item.link),
            })
            .filter(|item| !item.link.is_empty())
            .collect())
    }

    #[instrument(skip(self))]
    async fn image_search(&self, query: &str) -> Result<Option<ImageSnippet>> {
        if query.trim().is_empty() {
            return Ok(None);
        }
        let url = format!(
            "https://openapi.naver.com/v1/search/image.json?query={}&display=1&start=1&sort=sim",
            urlencoding::encode(query)
        );
        let response = self.get_api(&url).await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let payload: ImageSearchResponse = response.json().await.unwrap_or_default();
        Ok(payload.items.into_iter().next().map(|item| ImageSnippet {
            thumbnail: to_https_url(&item.thumbnail),
            link: to_https_url(&item.link),
        }))
    }

    #[instrument(skip(self, display))]
    async fn blog_search(
        &self,
        query: &str,
        display: usize,
        sort: BlogSort,
    ) -> Result<BlogSearchPage> {
        let cleaned = normalize_space(query);
        if cleaned.is_empty() {
            return Ok(BlogSearchPage::default());
        }
        let url = format!(
            "https://openapi.naver.com/v1/search/blog.json?query={}&display={}&start=1&sort={}",
            urlencoding::encode(&cleaned),
            display,
            sort.as_param()
        );
        let response = self.get_api(&url).await?;
        if !response.status().is_success() {
            return Ok(BlogSearchPage::default());
        }
        let payload: BlogSearchResponse = response.json().await.unwrap_or_default();
        let reviews = payload
            .items
            .into_iter()
            .map(|item| BlogReview {
                title: strip_html(&item.title).trim().to_string(),
                description: strip_html(&item.description).trim().to_string(),
                link: to_https_url(&item.link),
                blogger_name: strip_html(&item.bloggername).trim().to_string(),
                post_date: item.postdate,
            })
            .filter(|review| !review.title.is_empty() || !review.description.is_empty())
            .collect();
        Ok(BlogSearchPage {
            total: payload.total,
            reviews,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_page_html(&self, url: &str) -> Result<String> {
        let safe_url = to_https_url(url);
        if safe_url.is_empty() {
            return Ok(String::new());
        }
        let response = self
            .client
            .get(&safe_url)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "ko-KR,ko;q=0.9,en-US;q=0.8")
            .send()
            .await
            .with_context(|| "Place page fetch failed")?;
        if !response.status().is_success() {
            return Ok(String::new());
        }
        Ok(response.text().await.unwrap_or_default())
    }
}

/// Parse the comma-separated `queries` parameter, falling back to defaults
#[must_use]
pub fn parse_queries(raw: Option<&str>) -> Vec<String> {
    let parsed: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .filter(|query| !keywords::is_excluded_search_query(query))
        .map(str::to_string)
        .collect();
    if parsed.is_empty() {
        DEFAULT_QUERIES.iter().map(|q| (*q).to_string()).collect()
    } else {
        parsed
    }
}

/// Build up to `variants_limit - 1` area-hint candidates from the free-text
/// hint (longest token prefixes first) and the origin's guessed region.
#[must_use]
pub fn build_area_hint_candidates(
    area_hint: &str,
    origin: Option<Coordinates>,
    variants_limit: usize,
) -> Vec<String> {
    let mut candidates = Vec::new();
    let normalized = normalize_space(area_hint);

    if !normalized.is_empty() {
        let tokens: Vec<&str> = normalized.split(' ').collect();
        if tokens.len() >= 3 {
            candidates.push(tokens[..3].join(" "));
        }
        if tokens.len() >= 2 {
            candidates.push(tokens[..2].join(" "));
        }
        candidates.push(tokens[0].to_string());
    }

    if let Some(origin) = origin {
        let region = guess_region_by_coords(origin.lat, origin.lng);
        if !region.is_empty() {
            candidates.push(region);
        }
    }

    let mut unique = Vec::new();
    for candidate in candidates {
        let candidate = normalize_space(&candidate);
        if !candidate.is_empty() && !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique.truncate(variants_limit.saturating_sub(1));
    unique
}

/// Combine a base query with area hints into deduplicated search variants
#[must_use]
pub fn build_search_queries(
    base_query: &str,
    area_hints: &[String],
    variants_limit: usize,
) -> Vec<String> {
    let query = normalize_space(base_query);
    if query.is_empty() {
        return Vec::new();
    }

    let mut search_queries = Vec::new();
    for hint in area_hints {
        let combined = normalize_space(&format!("{hint} {query}"));
        if !search_queries.contains(&combined) {
            search_queries.push(combined);
        }
    }
    if !search_queries.contains(&query) {
        search_queries.push(query);
    }
    search_queries.truncate(variants_limit);
    search_queries
}

/// Coarse Korean region lookup by coordinate bounding boxes, used to anchor
/// text searches when only an origin is known
#[must_use]
pub fn guess_region_by_coords(lat: f64, lng: f64) -> String {
    if !geo::is_valid_lat_lng(lat, lng) {
        return String::new();
    }

    struct MetroRegion {
        name: &'static str,
        lat_min: f64,
        lat_max: f64,
        lng_min: f64,
        lng_max: f64,
    }

    const METRO_REGIONS: &[MetroRegion] = &[
        MetroRegion { name: "서울", lat_min: 37.41, lat_max: 37.72, lng_min: 126.76, lng_max: 127.19 },
        MetroRegion { name: "인천", lat_min: 37.33, lat_max: 37.79, lng_min: 126.35, lng_max: 126.93 },
        MetroRegion { name: "부산", lat_min: 35.02, lat_max: 35.35, lng_min: 128.78, lng_max: 129.32 },
        MetroRegion { name: "대구", lat_min: 35.73, lat_max: 36.02, lng_min: 128.41, lng_max: 128.75 },
        MetroRegion { name: "대전", lat_min: 36.18, lat_max: 36.5, lng_min: 127.24, lng_max: 127.55 },
        MetroRegion { name: "광주", lat_min: 35.03, lat_max: 35.25, lng_min: 126.76, lng_max: 127.0 },
        MetroRegion { name: "울산", lat_min: 35.43, lat_max: 35.73, lng_min: 129.13, lng_max: 129.46 },
        MetroRegion { name: "세종", lat_min: 36.45, lat_max: 36.7, lng_min: 127.18, lng_max: 127.38 },
        MetroRegion { name: "제주", lat_min: 33.1, lat_max: 33.65, lng_min: 126.1, lng_max: 126.98 },
    ];

    for region in METRO_REGIONS {
        if lat >= region.lat_min
            && lat <= region.lat_max
            && lng >= region.lng_min
            && lng <= region.lng_max
        {
            return region.name.to_string();
        }
    }

    const PROVINCES: &[(&str, f64, f64, f64, f64)] = &[
        ("경기", 36.8, 38.5, 126.2, 127.9),
        ("강원", 37.0, 38.6, 127.1, 129.4),
        ("충남", 36.1, 37.4, 126.7, 127.9),
        ("충북", 36.2, 37.6, 127.3, 128.8),
        ("전북", 35.4, 36.4, 126.3, 127.6),
        ("전남", 34.4, 35.6, 126.0, 127.4),
        ("경북", 35.2, 37.2, 127.8, 129.6),
        ("경남", 34.6, 35.6, 127.5, 129.2),
    ];

    for (name, lat_min, lat_max, lng_min, lng_max) in PROVINCES {
        if lat >= *lat_min && lat <= *lat_max && lng >= *lng_min && lng <= *lng_max {
            return (*name).to_string();
        }
    }

    String::new()
}
