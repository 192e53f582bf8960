//! Optional AI suitability pass over the heuristically filtered places
//!
//! A structured-output chat completion labels each candidate suitable or
//! unsuitable with a confidence and a short reason. The pass is fail-open:
//! any transport error, timeout or malformed payload keeps the heuristic
//! result untouched. Decisions are cached per place identity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::config::{CacheConfig, ClassifierConfig};
use crate::error::{KidsonError, Result};
use crate::models::Place;
use crate::text::normalize_compare_text;

const BLOG_SUMMARY_MAX_CHARS: usize = 1200;
const BLOG_SUMMARY_REVIEWS: usize = 4;
const REASON_MAX_CHARS: usize = 240;

const SYSTEM_PROMPT: &str = "당신은 12개월~6세 유아/아동 동반 장소 분류기다. 네이버 지도/블로그 정보 기반으로 가족 방문 적합도를 판정한다. 사진촬영 전용 장소, 성인/유흥/비가족 장소는 제외한다.";

const USER_PROMPT_RULES: &str = "다음 후보 장소를 suitable(추천) / unsuitable(제외)로 분류해줘.\n판정 기준:\n1) 12개월~6세 아이와 실제로 시간을 보내기 적합한가\n2) 추천 대상은 공원/유적지/박물관/미술관/공연장/가족친화 가게(카페·식당·서점·완구점 포함)\n3) 블로그 요약에서 유아 동반 동선, 편의시설, 실제 체험 근거를 우선 반영\n4) 사진관/포토부스/인생네컷 계열은 무조건 제외\n5) 학원/어린이집/의료/사무/유흥 계열은 제외\n6) 정원/가든은 아이 동반 놀이·산책 근거가 부족하면 제외\n후보 JSON:";

/// One place condensed for classification
#[derive(Debug, Clone, Serialize)]
pub struct AiCandidate {
    pub id: String,
    pub name: String,
    pub category: String,
    pub address: String,
    pub description: String,
    #[serde(rename = "blogReviewTotal")]
    pub blog_review_total: u64,
    #[serde(rename = "blogSummary")]
    pub blog_summary: String,
}

impl AiCandidate {
    #[must_use]
    pub fn from_place(place: &Place, id: impl Into<String>) -> Self {
        let blog_summary: String = place
            .blog_reviews
            .iter()
            .take(BLOG_SUMMARY_REVIEWS)
            .map(|review| format!("{} {}", review.title.trim(), review.description.trim()))
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" | ")
            .chars()
            .take(BLOG_SUMMARY_MAX_CHARS)
            .collect();

        Self {
            id: id.into(),
            name: place.name.trim().to_string(),
            category: place.category.trim().to_string(),
            address: place.best_address().trim().to_string(),
            description: place.description.trim().to_string(),
            blog_review_total: place.blog_review_total,
            blog_summary,
        }
    }
}

/// A normalized classification verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiDecision {
    pub suitable: bool,
    pub confidence: f64,
    pub reason: String,
}

impl AiDecision {
    /// Clamp confidence into [0, 1], defaulting by verdict when absent,
    /// and bound the reason length.
    #[must_use]
    pub fn normalized(suitable: bool, confidence: Option<f64>, reason: &str) -> Self {
        let confidence = match confidence {
            Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
            _ if suitable => 0.6,
            _ => 0.5,
        };
        Self {
            suitable,
            confidence,
            reason: reason.trim().chars().take(REASON_MAX_CHARS).collect(),
        }
    }
}

/// Classification backend, keyed by candidate id
#[async_trait]
pub trait SuitabilityClassifier: Send + Sync {
    async fn classify(&self, candidates: &[AiCandidate]) -> Result<HashMap<String, AiDecision>>;
}

/// OpenAI-compatible chat-completions classifier with strict JSON schema
pub struct OpenAiClassifier {
    http: reqwest::Client,
    config: ClassifierConfig,
}

impl OpenAiClassifier {
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClassificationPayload {
    #[serde(default)]
    results: Vec<RawClassification>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    id: String,
    #[serde(default)]
    suitable: bool,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reason: String,
}

#[async_trait]
impl SuitabilityClassifier for OpenAiClassifier {
    async fn classify(&self, candidates: &[AiCandidate]) -> Result<HashMap<String, AiDecision>> {
        if candidates.is_empty() {
            return Ok(HashMap::new());
        }

        let schema = json!({
            "name": "kid_place_classification",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "results": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "suitable": { "type": "boolean" },
                                "confidence": { "type": "number" },
                                "reason": { "type": "string" }
                            },
                            "required": ["id", "suitable", "confidence", "reason"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["results"],
                "additionalProperties": false
            }
        });

        let candidate_json = serde_json::to_string(&json!({ "candidates": candidates }))
            .map_err(|e| KidsonError::classifier(format!("candidate encoding failed: {e}")))?;
        let body = json!({
            "model": self.config.model,
            "temperature": 0.1,
            "response_format": { "type": "json_schema", "json_schema": schema },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": format!("{USER_PROMPT_RULES}\n{candidate_json}") }
            ]
        });

        let request = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(self.config.api_key.as_deref().unwrap_or_default())
            .json(&body)
            .send();
        let response = tokio::time::timeout(self.config.timeout(), request)
            .await
            .map_err(|_| KidsonError::classifier("classification timed out"))?
            .map_err(|e| KidsonError::classifier(format!("classification request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(KidsonError::classifier(format!(
                "classification failed with status {}",
                response.status()
            )));
        }

        let payload: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| KidsonError::classifier(format!("classification decode failed: {e}")))?;
        let Some(content) = payload
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
        else {
            return Ok(HashMap::new());
        };
        let parsed: ClassificationPayload = serde_json::from_str(content)
            .map_err(|e| KidsonError::classifier(format!("classification payload invalid: {e}")))?;

        let mut decisions = HashMap::new();
        for result in parsed.results {
            if result.id.is_empty() {
                continue;
            }
            decisions.insert(
                result.id,
                AiDecision::normalized(result.suitable, result.confidence, &result.reason),
            );
        }
        Ok(decisions)
    }
}

/// Cache key: normalized name + normalized address
#[must_use]
pub fn suitability_cache_key(place: &Place) -> String {
    [
        normalize_compare_text(&place.name),
        normalize_compare_text(place.best_address()),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("|")
}

/// Applies the classifier verdicts to a place list, fail-open
pub struct SuitabilityFilter {
    classifier: Option<Arc<dyn SuitabilityClassifier>>,
    decision_cache: TtlCache<AiDecision>,
    config: ClassifierConfig,
}

impl SuitabilityFilter {
    #[must_use]
    pub fn new(
        classifier: Option<Arc<dyn SuitabilityClassifier>>,
        config: ClassifierConfig,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            classifier,
            decision_cache: TtlCache::new(
                Duration::from_secs(cache.ai_decision_ttl_secs),
                cache.ai_decision_capacity,
            ),
            config,
        }
    }

    /// Drop places the classifier confidently marks unsuitable. Places past
    /// the classification window, places without a verdict, and low-confidence
    /// rejections all pass through.
    pub async fn apply(&self, places: Vec<Place>) -> Vec<Place> {
        let Some(classifier) = &self.classifier else {
            return places;
        };
        if !self.config.is_usable() || places.is_empty() {
            return places;
        }

        let limit = places.len().min(self.config.max_items.max(1));
        let mut decisions: HashMap<String, AiDecision> = HashMap::new();
        let mut pending: Vec<(usize, String)> = Vec::new();

        for (index, place) in places[..limit].iter().enumerate() {
            let key = suitability_cache_key(place);
            if key.is_empty() {
                continue;
            }
            if let Some(cached) = self.decision_cache.get(&key) {
                decisions.insert(key, cached);
            } else {
                pending.push((index, key));
            }
        }

        if !pending.is_empty() {
            let candidates: Vec<AiCandidate> = pending
                .iter()
                .map(|(index, _)| AiCandidate::from_place(&places[*index], index.to_string()))
                .collect();
            match classifier.classify(&candidates).await {
                Ok(results) => {
                    for (index, key) in &pending {
                        if let Some(decision) = results.get(&index.to_string()) {
                            self.decision_cache.put(key, decision.clone());
                            decisions.insert(key.clone(), decision.clone());
                        }
                    }
                }
                Err(error) => {
                    warn!(%error, "classification unavailable, keeping heuristic result");
                    return places;
                }
            }
        }

        let min_confidence = self.config.min_confidence.clamp(0.0, 1.0);
        let mut kept = Vec::with_capacity(places.len());
        for (index, mut place) in places.into_iter().enumerate() {
            if index >= limit {
                kept.push(place);
                continue;
            }
            let key = suitability_cache_key(&place);
            let Some(decision) = decisions.get(&key) else {
                kept.push(place);
                continue;
            };
            place.ai_suitable = Some(decision.suitable);
            place.ai_confidence = Some(decision.confidence);
            place.ai_reason = Some(decision.reason.clone());

            if decision.suitable || decision.confidence < min_confidence {
                kept.push(place);
            } else {
                debug!(name = %place.name, confidence = decision.confidence, "place dropped by classifier");
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;

    struct FixedClassifier {
        decisions: HashMap<String, AiDecision>,
    }

    #[async_trait]
    impl SuitabilityClassifier for FixedClassifier {
        async fn classify(&self, _: &[AiCandidate]) -> Result<HashMap<String, AiDecision>> {
            Ok(self.decisions.clone())
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl SuitabilityClassifier for FailingClassifier {
        async fn classify(&self, _: &[AiCandidate]) -> Result<HashMap<String, AiDecision>> {
            Err(KidsonError::classifier("boom"))
        }
    }

    fn usable_config() -> ClassifierConfig {
        ClassifierConfig {
            enabled: true,
            api_key: Some("test-key".to_string()),
            ..ClassifierConfig::default()
        }
    }

    fn place(id: &str, name: &str) -> Place {
        Place::new(id, name, Coordinates::new(37.57, 126.98), 12, 72, 40, "공원")
    }

    fn filter_with(decisions: HashMap<String, AiDecision>) -> SuitabilityFilter {
        SuitabilityFilter::new(
            Some(Arc::new(FixedClassifier { decisions })),
            usable_config(),
            &CacheConfig::default(),
        )
    }

    #[test]
    fn test_decision_normalization() {
        let d = AiDecision::normalized(true, Some(1.7), "  reason  ");
        assert_eq!(d.confidence, 1.0);
        assert_eq!(d.reason, "reason");

        let d = AiDecision::normalized(true, None, "");
        assert_eq!(d.confidence, 0.6);
        let d = AiDecision::normalized(false, Some(f64::NAN), "");
        assert_eq!(d.confidence, 0.5);

        let long = "r".repeat(400);
        let d = AiDecision::normalized(false, Some(0.9), &long);
        assert_eq!(d.reason.chars().count(), 240);
    }

    #[test]
    fn test_cache_key_uses_normalized_identity() {
        let mut a = place("p1", "<b>강변</b> 놀이터");
        a.road_address = "서울 종로구".to_string();
        let mut b = place("p2", "강변놀이터");
        b.road_address = "서울종로구".to_string();
        assert_eq!(suitability_cache_key(&a), suitability_cache_key(&b));
    }

    #[tokio::test]
    async fn test_confident_unsuitable_dropped() {
        let mut decisions = HashMap::new();
        decisions.insert("0".to_string(), AiDecision::normalized(false, Some(0.9), "성인 업소"));
        decisions.insert("1".to_string(), AiDecision::normalized(true, Some(0.8), "놀이터"));
        let filter = filter_with(decisions);

        let kept = filter.apply(vec![place("a", "의심 장소"), place("b", "놀이터")]).await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "b");
        assert_eq!(kept[0].ai_suitable, Some(true));
    }

    #[tokio::test]
    async fn test_low_confidence_rejection_passes_through() {
        let mut decisions = HashMap::new();
        decisions.insert("0".to_string(), AiDecision::normalized(false, Some(0.3), "불확실"));
        let filter = filter_with(decisions);

        let kept = filter.apply(vec![place("a", "애매한 장소")]).await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].ai_suitable, Some(false));
    }

    #[tokio::test]
    async fn test_classifier_failure_keeps_everything() {
        let filter = SuitabilityFilter::new(
            Some(Arc::new(FailingClassifier)),
            usable_config(),
            &CacheConfig::default(),
        );
        let kept = filter.apply(vec![place("a", "장소1"), place("b", "장소2")]).await;
        assert_eq!(kept.len(), 2);
        assert!(kept[0].ai_suitable.is_none());
    }

    #[tokio::test]
    async fn test_disabled_filter_is_noop() {
        let filter = SuitabilityFilter::new(
            Some(Arc::new(FailingClassifier)),
            ClassifierConfig::default(),
            &CacheConfig::default(),
        );
        let kept = filter.apply(vec![place("a", "장소")]).await;
        assert_eq!(kept.len(), 1);
    }

    #[tokio::test]
    async fn test_places_past_window_untouched() {
        let mut config = usable_config();
        config.max_items = 1;
        let mut decisions = HashMap::new();
        decisions.insert("0".to_string(), AiDecision::normalized(false, Some(0.95), "제외"));
        let filter = SuitabilityFilter::new(
            Some(Arc::new(FixedClassifier { decisions })),
            config,
            &CacheConfig::default(),
        );

        let kept = filter
            .apply(vec![place("a", "첫째 장소"), place("b", "둘째 장소")])
            .await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "b");
    }
}
