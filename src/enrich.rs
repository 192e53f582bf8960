//! Best-effort place enrichment
//!
//! Resolves canonical Naver place links, a representative photo, blog review
//! snippets and an estimated rating. Every lookup is isolated per place: a
//! timeout or upstream error leaves that place with empty enrichment and
//! never fails the batch. Resolved links are cached with a TTL and a
//! capacity bound.

use futures::future::join_all;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::cache::TtlCache;
use crate::config::{CacheConfig, SearchConfig};
use crate::models::{BlogReview, Place};
use crate::search::{BlogSort, SearchProvider, WebSearchItem};
use crate::text::{
    decode_html_entities, extract_meta_content, normalize_compare_text, to_https_url,
};

const MAX_BLOG_REVIEWS_KEPT: usize = 6;

/// Canonical link set for one place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceLinks {
    pub place_link: String,
    pub review_link: String,
    pub blog_review_link: String,
    pub mobile_home_link: String,
}

/// Enrichment payload for one place
#[derive(Debug, Clone, Default)]
pub struct PlaceDetail {
    pub links: PlaceLinks,
    pub photo_thumbnail: String,
    pub photo_link: String,
    pub blog_review_total: u64,
    pub blog_reviews: Vec<BlogReview>,
    pub rating_estimated: Option<f64>,
}

/// Enrichment service over a search provider, with a link-resolution cache
pub struct Enricher {
    provider: Arc<dyn SearchProvider>,
    link_cache: TtlCache<PlaceLinks>,
    search: SearchConfig,
}

impl Enricher {
    #[must_use]
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        search: SearchConfig,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            provider,
            link_cache: TtlCache::new(
                Duration::from_secs(cache.place_lookup_ttl_secs),
                cache.place_lookup_capacity,
            ),
            search,
        }
    }

    /// Enrich the first `max_detail_items` places concurrently, joining all
    /// lookups; failures leave the place unenriched.
    pub async fn enrich_places(&self, places: &mut [Place], area_hint: &str) {
        let detail_count = places.len().min(self.search.max_detail_items);
        let lookups = places[..detail_count]
            .iter()
            .map(|place| self.fetch_place_detail(place, area_hint));
        let details = join_all(lookups).await;

        for (place, detail) in places[..detail_count].iter_mut().zip(details) {
            let Some(detail) = detail else { continue };
            let fallback = build_map_search_url_for_place(place);
            place.place_link = if detail.links.place_link.is_empty() {
                fallback.clone()
            } else {
                detail.links.place_link.clone()
            };
            place.review_link = non_empty_or(&detail.links.review_link, &place.place_link);
            place.blog_review_link =
                non_empty_or(&detail.links.blog_review_link, &place.place_link);
            if !detail.links.mobile_home_link.is_empty() {
                place.mobile_home_link = detail.links.mobile_home_link.clone();
            }
            place.photo_thumbnail = detail.photo_thumbnail;
            place.photo_link = non_empty_or(&detail.photo_link, &place.place_link);
            place.blog_review_total = detail.blog_review_total;
            place.blog_reviews = detail.blog_reviews;
            place.rating_estimated = detail.rating_estimated;
            if detail.rating_estimated.is_some() {
                place.rating_source = Some("estimated_from_blog_reviews".to_string());
            }
        }
    }

    /// Fetch links, photo and blog snippets for one place. Returns `None`
    /// only when the place has no usable name.
    #[instrument(skip(self, place), fields(place = %place.name))]
    pub async fn fetch_place_detail(&self, place: &Place, area_hint: &str) -> Option<PlaceDetail> {
        if place.name.trim().is_empty() {
            return None;
        }

        let location_hint = [area_hint, place.best_address()]
            .iter()
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let image_query = join_non_empty(&[&location_hint, &place.name]);
        let blog_query = join_non_empty(&[&location_hint, &place.name, "리뷰"]);

        let links = self.resolve_place_links(place, area_hint).await;
        let (representative_image, image_snippet, blog_payload) = futures::join!(
            self.fetch_representative_image(&links.mobile_home_link),
            async {
                self.provider
                    .image_search(&image_query)
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or_default()
            },
            self.fetch_blog_reviews(&blog_query),
        );

        let rating_estimated = estimate_rating_from_review_count(blog_payload.0);
        let photo_thumbnail = if representative_image.is_empty() {
            image_snippet.thumbnail
        } else {
            representative_image
        };
        let place_link = non_empty_or(&links.place_link, &build_map_search_url_for_place(place));
        let photo_link = non_empty_or(&place_link, &image_snippet.link);

        Some(PlaceDetail {
            links,
            photo_thumbnail,
            photo_link,
            blog_review_total: blog_payload.0,
            blog_reviews: blog_payload.1,
            rating_estimated,
        })
    }

    /// Resolve canonical place links: direct link first, then a scored web
    /// search, then the map-search fallback. Cached by place identity.
    pub async fn resolve_place_links(&self, place: &Place, area_hint: &str) -> PlaceLinks {
        let cache_key = build_place_cache_key(place);
        if let Some(cached) = self.link_cache.get(&cache_key) {
            return cached;
        }

        if let Some(direct) = normalize_naver_place_links(&place.place_link) {
            self.link_cache.put(&cache_key, direct.clone());
            return direct;
        }

        let web_query = build_web_lookup_query(place, area_hint);
        let candidates = self
            .provider
            .web_search(&web_query, self.search.web_lookup_display)
            .await
            .unwrap_or_default();
        let resolved = pick_best_place_candidate(&candidates, place)
            .and_then(|candidate| normalize_naver_place_links(&candidate.link))
            .unwrap_or_else(|| build_fallback_place_links(place));

        self.link_cache.put(&cache_key, resolved.clone());
        resolved
    }

    async fn fetch_representative_image(&self, mobile_home_link: &str) -> String {
        if mobile_home_link.is_empty() {
            return String::new();
        }
        let html = match self.provider.fetch_page_html(mobile_home_link).await {
            Ok(html) => html,
            Err(error) => {
                debug!(%error, "representative image fetch failed");
                return String::new();
            }
        };
        let og_image = {
            let by_property = extract_meta_content(&html, "property", "og:image");
            if by_property.is_empty() {
                extract_meta_content(&html, "name", "twitter:image")
            } else {
                by_property
            }
        };
        to_https_url(&decode_html_entities(&og_image))
    }

    /// Merge three blog-search plans, dedupe by link, keep at most six
    async fn fetch_blog_reviews(&self, query: &str) -> (u64, Vec<BlogReview>) {
        if query.trim().is_empty() {
            return (0, Vec::new());
        }

        let with_kids_query = format!("{query} 아이와 함께");
        let plans = [
            (query, 5usize, BlogSort::Similarity),
            (query, 5, BlogSort::Date),
            (with_kids_query.as_str(), 4, BlogSort::Similarity),
        ];
        let pages = join_all(
            plans
                .iter()
                .map(|(q, display, sort)| self.provider.blog_search(q, *display, *sort)),
        )
        .await;

        let mut max_total = 0u64;
        let mut merged: Vec<BlogReview> = Vec::new();
        let mut seen_keys: Vec<String> = Vec::new();
        for page in pages.into_iter().flatten() {
            max_total = max_total.max(page.total);
            for review in page.reviews {
                let key = if review.link.trim().is_empty() {
                    format!("{}|{}", review.title, review.post_date)
                } else {
                    review.link.trim().to_string()
                };
                if key.is_empty() || seen_keys.contains(&key) {
                    continue;
                }
                seen_keys.push(key);
                merged.push(review);
            }
        }
        merged.truncate(MAX_BLOG_REVIEWS_KEPT);
        (max_total.max(merged.len() as u64), merged)
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn join_non_empty(values: &[&str]) -> String {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identity cache key: normalized name + normalized address
#[must_use]
pub fn build_place_cache_key(place: &Place) -> String {
    [
        normalize_compare_text(&place.name),
        normalize_compare_text(place.best_address()),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("|")
}

/// Log-scaled rating estimate from the blog review count, bounded to [0, 5]
#[must_use]
pub fn estimate_rating_from_review_count(review_count: u64) -> Option<f64> {
    if review_count == 0 {
        return None;
    }
    let normalized = ((review_count + 1) as f64).log10();
    let score = (2.8 + normalized * 0.8).min(5.0);
    Some((score * 10.0).round() / 10.0)
}

#[must_use]
pub fn build_web_lookup_query(place: &Place, area_hint: &str) -> String {
    join_non_empty(&[area_hint, place.best_address(), &place.name, "네이버지도"])
}

/// Score web-search candidates by URL shape and name/address overlap
#[must_use]
pub fn pick_best_place_candidate<'a>(
    candidates: &'a [WebSearchItem],
    place: &Place,
) -> Option<&'a WebSearchItem> {
    let name_text = normalize_compare_text(&place.name);
    let address_text = normalize_compare_text(place.best_address());
    let mut best: Option<&WebSearchItem> = None;
    let mut best_score = f64::NEG_INFINITY;

    for candidate in candidates {
        let link = to_https_url(&candidate.link);
        if !is_likely_naver_place_url(&link) {
            continue;
        }

        let title_text = normalize_compare_text(&candidate.title);
        let desc_text = normalize_compare_text(&candidate.description);

        let mut score = 0.0;
        if link.contains("m.place.naver.com") {
            score += 7.0;
        }
        if link.contains("place.naver.com") {
            score += 6.0;
        }
        if link.contains("/entry/place/") {
            score += 5.0;
        }
        if !extract_place_id_from_url(&link).is_empty() {
            score += 4.0;
        }
        if !name_text.is_empty() && title_text.contains(&name_text) {
            score += 4.0;
        }
        if !name_text.is_empty() && desc_text.contains(&name_text) {
            score += 2.0;
        }
        if !address_text.is_empty()
            && (title_text.contains(&address_text) || desc_text.contains(&address_text))
        {
            score += 2.0;
        }

        if score > best_score {
            best_score = score;
            best = Some(candidate);
        }
    }

    best
}

#[must_use]
pub fn is_likely_naver_place_url(raw_url: &str) -> bool {
    let safe_url = to_https_url(raw_url);
    if safe_url.is_empty() {
        return false;
    }
    let Ok(parsed) = Url::parse(&safe_url) else {
        return false;
    };
    let host = parsed
        .host_str()
        .unwrap_or_default()
        .trim_start_matches("www.");
    if host == "m.place.naver.com" || host == "place.naver.com" {
        return true;
    }
    let path = parsed.path();
    host == "map.naver.com"
        && (path.contains("/entry/place/")
            || path.starts_with("/p/search/")
            || path.starts_with("/v5/search/"))
}

/// Canonicalize a raw Naver URL into the full link set, when recognizable
#[must_use]
pub fn normalize_naver_place_links(raw_url: &str) -> Option<PlaceLinks> {
    let safe_url = to_https_url(raw_url);
    if safe_url.is_empty() {
        return None;
    }
    let parsed = Url::parse(&safe_url).ok()?;
    let host = parsed
        .host_str()
        .unwrap_or_default()
        .trim_start_matches("www.");

    if host == "m.place.naver.com" || host == "place.naver.com" {
        let (token_type, id) = parse_place_token_from_path(parsed.path())?;
        return build_place_links_from_token(&token_type, &id);
    }

    if host == "map.naver.com" {
        let place_id = extract_place_id_from_url(&safe_url);
        if !place_id.is_empty() {
            return build_place_links_from_token("place", &place_id);
        }

        let path = parsed.path();
        if path.starts_with("/p/search/") || path.starts_with("/v5/search/") {
            let link = format!("https://map.naver.com{path}");
            return Some(PlaceLinks {
                place_link: link.clone(),
                review_link: link.clone(),
                blog_review_link: link,
                mobile_home_link: String::new(),
            });
        }
    }

    None
}

fn parse_place_token_from_path(pathname: &str) -> Option<(String, String)> {
    let segments: Vec<&str> = pathname
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.len() < 2 {
        return None;
    }
    let token_type = segments[0];
    let id = segments[1];
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((token_type.to_string(), id.to_string()))
}

/// Digits following an `entry/place/` path segment, if any
#[must_use]
pub fn extract_place_id_from_url(raw_url: &str) -> String {
    for marker in ["/p/entry/place/", "/v5/entry/place/", "/entry/place/"] {
        if let Some(pos) = raw_url.find(marker) {
            let digits: String = raw_url[pos + marker.len()..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if !digits.is_empty() {
                return digits;
            }
        }
    }
    String::new()
}

fn build_place_links_from_token(token_type: &str, id: &str) -> Option<PlaceLinks> {
    let safe_type = {
        let trimmed = token_type.trim();
        if trimmed.is_empty() { "place" } else { trimmed }
    };
    let safe_id = id.trim();
    if safe_id.is_empty() || !safe_id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mobile_base = format!("https://m.place.naver.com/{safe_type}/{safe_id}");
    Some(PlaceLinks {
        place_link: format!("{mobile_base}/home"),
        review_link: format!("{mobile_base}/review/visitor"),
        blog_review_link: format!("{mobile_base}/review/ugc"),
        mobile_home_link: format!("{mobile_base}/home"),
    })
}

/// Map-search URL fallback when no canonical link can be resolved
#[must_use]
pub fn build_fallback_place_links(place: &Place) -> PlaceLinks {
    let search_url = build_map_search_url_for_place(place);
    PlaceLinks {
        place_link: search_url.clone(),
        review_link: search_url.clone(),
        blog_review_link: search_url,
        mobile_home_link: String::new(),
    }
}

#[must_use]
pub fn build_map_search_url_for_place(place: &Place) -> String {
    let query = join_non_empty(&[place.name.trim(), place.best_address()]);
    let query = if query.is_empty() {
        "키즈 장소".to_string()
    } else {
        query
    };
    format!(
        "https://map.naver.com/p/search/{}",
        urlencoding::encode(&query)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;
    use rstest::rstest;

    fn sample_place() -> Place {
        let mut place = Place::new(
            "p1",
            "강변 놀이터",
            Coordinates::new(37.574, 126.976),
            12,
            72,
            35,
            "공원",
        );
        place.road_address = "서울 종로구 어딘가 1".to_string();
        place
    }

    #[rstest]
    #[case(0, None)]
    #[case(1, Some(3.0))]
    #[case(9, Some(3.6))]
    #[case(99, Some(4.4))]
    #[case(10_000, Some(5.0))]
    fn test_rating_estimate(#[case] count: u64, #[case] expected: Option<f64>) {
        assert_eq!(estimate_rating_from_review_count(count), expected);
    }

    #[test]
    fn test_rating_estimate_monotonic_and_bounded() {
        let mut last = 0.0;
        for count in [1u64, 5, 20, 100, 1000, 100_000] {
            let rating = estimate_rating_from_review_count(count).unwrap();
            assert!(rating >= last);
            assert!((0.0..=5.0).contains(&rating));
            last = rating;
        }
    }

    #[test]
    fn test_normalize_mobile_place_link() {
        let links =
            normalize_naver_place_links("https://m.place.naver.com/place/12345/home").unwrap();
        assert_eq!(links.place_link, "https://m.place.naver.com/place/12345/home");
        assert_eq!(
            links.review_link,
            "https://m.place.naver.com/place/12345/review/visitor"
        );
        assert_eq!(
            links.blog_review_link,
            "https://m.place.naver.com/place/12345/review/ugc"
        );
    }

    #[test]
    fn test_normalize_map_entry_link() {
        let links =
            normalize_naver_place_links("http://map.naver.com/p/entry/place/998877").unwrap();
        assert_eq!(links.place_link, "https://m.place.naver.com/place/998877/home");
    }

    #[test]
    fn test_normalize_map_search_link() {
        let links = normalize_naver_place_links("https://map.naver.com/p/search/공원").unwrap();
        assert!(links.place_link.starts_with("https://map.naver.com/p/search/"));
        assert!(links.mobile_home_link.is_empty());
    }

    #[test]
    fn test_normalize_rejects_unrelated_urls() {
        assert!(normalize_naver_place_links("https://example.com/place/1").is_none());
        assert!(normalize_naver_place_links("not a url").is_none());
        assert!(normalize_naver_place_links("").is_none());
        assert!(normalize_naver_place_links("https://m.place.naver.com/place/abc/home").is_none());
    }

    #[test]
    fn test_extract_place_id() {
        assert_eq!(
            extract_place_id_from_url("https://map.naver.com/p/entry/place/12345?c=1"),
            "12345"
        );
        assert_eq!(
            extract_place_id_from_url("https://map.naver.com/v5/entry/place/777"),
            "777"
        );
        assert_eq!(extract_place_id_from_url("https://map.naver.com/p/search/x"), "");
    }

    #[test]
    fn test_pick_best_candidate_prefers_place_urls() {
        let place = sample_place();
        let candidates = vec![
            WebSearchItem {
                title: "블로그 후기".to_string(),
                description: String::new(),
                link: "https://blog.naver.com/someone/1".to_string(),
            },
            WebSearchItem {
                title: "강변 놀이터 - 네이버 지도".to_string(),
                description: "서울 종로구 어딘가 1".to_string(),
                link: "https://m.place.naver.com/place/4242/home".to_string(),
            },
        ];
        let best = pick_best_place_candidate(&candidates, &place).unwrap();
        assert_eq!(best.link, "https://m.place.naver.com/place/4242/home");
    }

    #[test]
    fn test_pick_best_candidate_none_when_no_place_urls() {
        let place = sample_place();
        let candidates = vec![WebSearchItem {
            title: "x".to_string(),
            description: String::new(),
            link: "https://example.com".to_string(),
        }];
        assert!(pick_best_place_candidate(&candidates, &place).is_none());
    }

    #[test]
    fn test_fallback_links_use_map_search() {
        let place = sample_place();
        let links = build_fallback_place_links(&place);
        assert!(links.place_link.starts_with("https://map.naver.com/p/search/"));
        assert_eq!(links.place_link, links.review_link);
        assert!(links.mobile_home_link.is_empty());
    }

    #[test]
    fn test_cache_key_ignores_markup_and_spacing() {
        let mut a = sample_place();
        a.name = "<b>강변</b> 놀이터".to_string();
        let b = sample_place();
        assert_eq!(build_place_cache_key(&a), build_place_cache_key(&b));
    }
}
