//! Heuristic family-visit insight per place
//!
//! Builds a short Korean summary line, up to three visit highlights and a
//! confidence score from the place text and its blog review snippets. Pure
//! keyword rules, no model calls.

use crate::keywords::{build_filter_text, extract_blog_review_text, has_any_keyword};
use crate::models::{BlogReview, Place};
use crate::text::strip_html;

const CATEGORY_LEAF_MAX_CHARS: usize = 18;
const BLOG_HINT_MAX_CHARS: usize = 22;
const AI_REASON_HIGHLIGHT_MAX_CHARS: usize = 42;
const MAX_HIGHLIGHTS: usize = 3;

const FALLBACK_SUMMARY_NO_TEXT: &str = "아이와 함께 방문하기 좋은 장소인지 현장 정보를 확인해 보세요";
const FALLBACK_SUMMARY_NO_PARTS: &str = "아이와 함께 이동 동선을 확인하고 방문해 보세요";

struct InsightRule {
    label: &'static str,
    keywords: &'static [&'static str],
}

const SUMMARY_RULES: &[InsightRule] = &[
    InsightRule {
        label: "실내 놀이 중심",
        keywords: &["체험", "클래스", "만들기", "공방", "오감", "놀이", "실내놀이터", "키즈카페"],
    },
    InsightRule {
        label: "야외 산책 중심",
        keywords: &["공원", "한강", "놀이터", "숲", "잔디", "산책", "야외", "유적"],
    },
    InsightRule {
        label: "전시·배움 중심",
        keywords: &["박물관", "미술관", "전시", "도서관", "역사", "유적지", "기념관"],
    },
    InsightRule {
        label: "공연 관람 중심",
        keywords: &["공연장", "연극", "뮤지컬", "콘서트", "극장"],
    },
    InsightRule {
        label: "식사·휴식 중심",
        keywords: &["카페", "브런치", "식당", "레스토랑", "키즈메뉴"],
    },
    InsightRule {
        label: "서점·완구 탐색 중심",
        keywords: &["서점", "완구", "장난감", "문구", "키즈샵"],
    },
];

const DETAIL_RULES: &[InsightRule] = &[
    InsightRule {
        label: "신체 놀이 요소가 있어요",
        keywords: &["놀이터", "정글짐", "트램폴린", "볼풀", "미끄럼틀", "키즈존"],
    },
    InsightRule {
        label: "체험 활동 비중이 높아요",
        keywords: &["체험", "클래스", "만들기", "공방", "오감", "전시체험", "교육체험"],
    },
    InsightRule {
        label: "아이 눈높이 전시·학습 동선이에요",
        keywords: &["박물관", "미술관", "도서관", "전시", "유적지", "기념관", "역사"],
    },
    InsightRule {
        label: "공연 관람 코스로 적합해요",
        keywords: &["공연장", "연극", "뮤지컬", "콘서트", "극장"],
    },
    InsightRule {
        label: "식사/휴식과 함께 이용하기 좋아요",
        keywords: &["카페", "브런치", "식당", "레스토랑", "키즈메뉴", "아기의자"],
    },
    InsightRule {
        label: "유아 동반 편의 정보가 보여요",
        keywords: &["유모차", "수유실", "기저귀", "아기의자", "유아의자", "키즈메뉴"],
    },
];

const HIGHLIGHT_RULES: &[InsightRule] = &[
    InsightRule {
        label: "유모차 이동 동선 확인",
        keywords: &["유모차", "엘리베이터", "경사로", "넓은 통로"],
    },
    InsightRule {
        label: "수유/기저귀 편의 확인",
        keywords: &["수유실", "기저귀", "기저귀교환대", "수유"],
    },
    InsightRule {
        label: "유아 의자/키즈메뉴 확인",
        keywords: &["아기의자", "유아의자", "키즈메뉴", "아동메뉴"],
    },
    InsightRule {
        label: "주차/대중교통 접근성 확인",
        keywords: &["주차", "주차장", "역세권", "버스", "지하철"],
    },
    InsightRule {
        label: "혼잡 시간대 피하면 좋아요",
        keywords: &["대기", "웨이팅", "혼잡", "붐빔", "주말"],
    },
    InsightRule {
        label: "사전 예약 여부 확인",
        keywords: &["예약", "사전예약", "예매"],
    },
    InsightRule {
        label: "우천 시에도 이용 가능",
        keywords: &["실내", "우천", "비오는날"],
    },
];

/// Insight attached to a place after enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyInsight {
    pub summary: String,
    pub highlights: Vec<String>,
    pub confidence: f64,
}

/// Annotate every place with its derived family insight
pub fn apply_family_insights(places: &mut [Place]) {
    for place in places {
        let insight = build_family_insight(place);
        place.family_summary = insight.summary;
        place.family_highlights = insight.highlights;
        place.family_confidence = Some(insight.confidence);
    }
}

/// Derive summary, highlights and confidence from place + blog text
#[must_use]
pub fn build_family_insight(place: &Place) -> FamilyInsight {
    let base_text = build_filter_text([
        place.name.as_str(),
        place.category.as_str(),
        place.road_address.as_str(),
        place.address.as_str(),
        place.description.as_str(),
    ]);
    let blog_text = extract_blog_review_text(&place.blog_reviews);
    let text = build_filter_text([base_text.as_str(), blog_text.as_str()]);
    if text.is_empty() {
        return FamilyInsight {
            summary: FALLBACK_SUMMARY_NO_TEXT.to_string(),
            highlights: Vec::new(),
            confidence: 0.35,
        };
    }

    let category_leaf = extract_category_leaf(&place.category);
    let type_label = pick_first_rule_label(&text, SUMMARY_RULES);
    let detail_label = pick_first_rule_label(&text, DETAIL_RULES);
    let blog_hint = build_blog_hint_snippet(&place.blog_reviews);

    let mut summary_parts: Vec<String> = Vec::new();
    if !category_leaf.is_empty() {
        summary_parts.push(format!("{category_leaf} 코스"));
    } else if let Some(label) = type_label {
        summary_parts.push(label.to_string());
    }

    if let Some(label) = detail_label {
        summary_parts.push(label.to_string());
    } else if let Some(label) = type_label.filter(|l| !summary_parts.iter().any(|p| p == l)) {
        summary_parts.push(label.to_string());
    } else if !blog_hint.is_empty() {
        summary_parts.push(format!("후기: {blog_hint}"));
    } else if place.blog_review_total > 0 {
        summary_parts.push(format!("블로그 {}건 참고", place.blog_review_total));
    }

    let mut highlights = pick_rule_labels(&text, HIGHLIGHT_RULES, 4);
    if highlights.is_empty() && !blog_hint.is_empty() {
        highlights.push(format!("후기 키워드: {blog_hint}"));
    }
    if let Some(reason) = place.ai_reason.as_deref() {
        let reason = reason.trim();
        if !reason.is_empty()
            && reason.chars().count() <= AI_REASON_HIGHLIGHT_MAX_CHARS
            && !highlights.iter().any(|h| h == reason)
        {
            highlights.insert(0, reason.to_string());
        }
    }
    highlights.truncate(MAX_HIGHLIGHTS);

    summary_parts.truncate(2);
    let summary = {
        let joined = summary_parts.join(" · ").trim().to_string();
        if joined.is_empty() {
            FALLBACK_SUMMARY_NO_PARTS.to_string()
        } else {
            joined
        }
    };

    let evidence_score = u32::from(type_label.is_some()) * 2
        + u32::from(detail_label.is_some()) * 2
        + highlights.len() as u32
        + u32::from(!blog_text.is_empty());
    let confidence_raw = 0.38
        + f64::from(evidence_score.min(6)) * 0.07
        + (((place.blog_review_total + 1) as f64).log10() * 0.09).min(0.18);
    let confidence = confidence_raw.clamp(0.35, 0.95);

    FamilyInsight {
        summary,
        highlights,
        confidence: (confidence * 100.0).round() / 100.0,
    }
}

fn pick_first_rule_label(text: &str, rules: &'static [InsightRule]) -> Option<&'static str> {
    rules
        .iter()
        .find(|rule| has_any_keyword(text, rule.keywords))
        .map(|rule| rule.label)
}

fn pick_rule_labels(text: &str, rules: &'static [InsightRule], limit: usize) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| has_any_keyword(text, rule.keywords))
        .take(limit)
        .map(|rule| rule.label.to_string())
        .collect()
}

/// Last `>`-separated category segment, shortened for display
#[must_use]
pub fn extract_category_leaf(category_text: &str) -> String {
    let leaf = category_text
        .split('>')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .next_back()
        .unwrap_or_default();
    truncate_chars(leaf, CATEGORY_LEAF_MAX_CHARS)
}

/// Short snippet from the first non-empty blog review
#[must_use]
pub fn build_blog_hint_snippet(reviews: &[BlogReview]) -> String {
    let Some(first) = reviews
        .iter()
        .find(|review| !review.title.trim().is_empty() || !review.description.trim().is_empty())
    else {
        return String::new();
    };

    let raw = format!("{} {}", first.title.trim(), first.description.trim());
    let cleaned = clean_snippet_text(&strip_html(raw.trim()));
    if cleaned.is_empty() {
        return String::new();
    }
    truncate_chars(&cleaned, BLOG_HINT_MAX_CHARS)
}

/// Drops bracketed tags and separator punctuation, collapses whitespace
fn clean_snippet_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_bracket = false;
    for c in raw.chars() {
        match c {
            '[' => in_bracket = true,
            ']' => {
                in_bracket = false;
                out.push(' ');
            }
            '|' | '/' if !in_bracket => out.push(' '),
            _ if in_bracket => {}
            _ => out.push(c),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let truncated: String = value.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, Place};

    fn place(name: &str, category: &str, description: &str) -> Place {
        let mut p = Place::new(
            "p1",
            name,
            Coordinates::new(37.57, 126.98),
            12,
            72,
            40,
            category,
        );
        p.description = description.to_string();
        p
    }

    #[test]
    fn test_apply_family_insights_annotates_places() {
        let mut places = vec![place("키즈카페", "키즈카페", "유모차 수유실")];
        apply_family_insights(&mut places);
        let annotated = &places[0];
        assert!(!annotated.family_summary.is_empty());
        let confidence = annotated.family_confidence.expect("confidence set");
        assert!((0.35..=0.95).contains(&confidence));
    }

    #[test]
    fn test_empty_text_yields_fallback() {
        let p = place("", "", "");
        let insight = build_family_insight(&p);
        assert_eq!(insight.summary, FALLBACK_SUMMARY_NO_TEXT);
        assert!(insight.highlights.is_empty());
        assert_eq!(insight.confidence, 0.35);
    }

    #[test]
    fn test_category_leaf_drives_summary() {
        let p = place("어린이 박물관", "문화,예술 > 박물관", "전시 체험");
        let insight = build_family_insight(&p);
        assert!(insight.summary.starts_with("박물관 코스"));
        assert!(insight.summary.contains(" · "));
    }

    #[test]
    fn test_highlights_capped_at_three() {
        let p = place(
            "키즈카페",
            "키즈카페",
            "유모차 수유실 아기의자 주차장 예약 실내",
        );
        let insight = build_family_insight(&p);
        assert!(insight.highlights.len() <= 3);
        assert!(!insight.highlights.is_empty());
    }

    #[test]
    fn test_ai_reason_leads_highlights() {
        let mut p = place("키즈카페", "키즈카페", "유모차 주차장");
        p.ai_reason = Some("실내 놀이 공간이 잘 갖춰져 있어요".to_string());
        let insight = build_family_insight(&p);
        assert_eq!(insight.highlights[0], "실내 놀이 공간이 잘 갖춰져 있어요");
    }

    #[test]
    fn test_long_ai_reason_not_promoted() {
        let mut p = place("키즈카페", "키즈카페", "유모차");
        p.ai_reason = Some("아".repeat(60));
        let insight = build_family_insight(&p);
        assert!(insight.highlights.iter().all(|h| h != &"아".repeat(60)));
    }

    #[test]
    fn test_confidence_bounds() {
        let mut p = place(
            "한강 공원 놀이터",
            "공원 > 놀이터",
            "유모차 수유실 주차장 예약 실내 산책",
        );
        p.blog_review_total = 5000;
        let insight = build_family_insight(&p);
        assert!(insight.confidence <= 0.95);
        assert!(insight.confidence >= 0.35);
    }

    #[test]
    fn test_category_leaf_truncation() {
        let long = "아".repeat(25);
        let leaf = extract_category_leaf(&format!("상위 > {long}"));
        assert!(leaf.ends_with("..."));
        assert_eq!(leaf.chars().count(), CATEGORY_LEAF_MAX_CHARS + 3);
    }

    #[test]
    fn test_blog_hint_cleans_markup() {
        let reviews = vec![BlogReview {
            title: "<b>[서울]</b> 아이와 가볼만한 곳".to_string(),
            description: String::new(),
            link: String::new(),
            blogger_name: String::new(),
            post_date: String::new(),
        }];
        let hint = build_blog_hint_snippet(&reviews);
        assert!(!hint.contains('['));
        assert!(hint.contains("아이와"));
    }
}
