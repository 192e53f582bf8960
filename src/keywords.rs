//! Keyword tables and the heuristic suitability filter
//!
//! The tables are data, not code: they encode which venues count as
//! child-friendly for the 12-72 month band and which are clearly out. The
//! weighted score at the bottom is an empirically tuned policy; weights and
//! threshold are named so they can be adjusted independently of the logic.

use crate::models::{BlogReview, Place};

pub const PLAY_KEYWORDS: &[&str] = &[
    "놀이터", "놀이", "체험", "박물관", "도서관", "공원", "숲", "산책",
    "야외", "자연", "과학관", "미술관", "동물", "유적", "광장", "한강",
    "실내", "체육관", "공예", "공방", "만들기", "공연장", "연극", "뮤지컬",
    "콘서트", "극장", "카페", "식당", "레스토랑", "브런치", "서점", "완구",
];

pub const KID_KEYWORDS: &[&str] = &[
    "어린이", "유아", "아이", "아기", "키즈", "가족", "유모차", "수유실",
    "아기의자", "유아의자", "키즈메뉴",
];

pub const KID_UNSUITABLE_KEYWORDS: &[&str] = &[
    "노키즈존", "주점", "술집", "포차", "호프", "클럽", "유흥",
    "이자카야", "와인바", "와인 바", "펍", "칵테일", "칵테일바", "라운지바", "맥주집", "수제맥주",
    "pub", "cocktail", "wine bar",
    "오피스", "사무실", "병원", "약국", "성형", "치과", "정형외과",
];

const CLEARLY_IRRELEVANT_KEYWORDS: &[&str] = &[
    "노키즈존", "유흥", "클럽", "룸살롱", "주점", "술집", "호프", "포차",
    "이자카야", "와인바", "와인 바", "펍", "칵테일", "칵테일바", "라운지바", "맥주집", "수제맥주",
    "pub", "cocktail", "wine bar",
    "오피스", "사무실", "병원", "약국", "치과", "정형외과", "성형외과",
    "피부과", "중고차", "자동차정비", "세차", "부동산", "대출", "보험",
];

const PHOTO_KEYWORDS: &[&str] = &[
    "사진관", "사진 스튜디오", "사진스튜디오", "포토스튜디오",
    "프로필 촬영", "셀프사진관", "사진촬영", "증명사진",
    "인생네컷", "포토이즘", "하루필름", "포토그레이", "포토시그니처", "포토매틱", "셀픽스",
    "포토부스", "스냅",
];

const EDUCATION_FACILITY_KEYWORDS: &[&str] = &[
    "학원", "교습소", "공부방", "어학원", "교육원", "영어유치원",
    "어린이집", "유치원", "초등학교", "중학교", "고등학교",
];

const KID_CULTURE_FACILITY_KEYWORDS: &[&str] = &[
    "어린이도서관", "어린이박물관", "유아체험", "키즈센터", "아동미술관",
];

pub const GARDEN_KEYWORDS: &[&str] = &["정원", "가든", "수목원", "식물원"];

const GARDEN_KID_EVIDENCE_KEYWORDS: &[&str] = &[
    "어린이", "유아", "아이", "아기", "가족", "놀이터", "놀이", "체험",
    "산책", "야외", "숲", "피크닉", "유모차", "키즈",
];

const GARDEN_BASE_EVIDENCE_KEYWORDS: &[&str] = &[
    "어린이", "유아", "아이", "아기", "가족", "산책", "야외", "숲", "피크닉", "키즈",
];

const TARGET_CATEGORY_KEYWORDS: &[&str] = &[
    "공원", "한강", "유적", "박물관", "미술관", "갤러리", "전시", "공연장",
    "극장", "연극", "뮤지컬", "콘서트", "놀이터", "체험", "도서관",
    "카페", "식당", "레스토랑", "브런치", "서점", "완구", "키즈", "가족",
];

const EVIDENCE_REQUIRED_CATEGORY_KEYWORDS: &[&str] = &[
    "카페", "식당", "레스토랑", "브런치", "서점", "완구", "매장", "쇼핑",
    "공연장", "극장", "연극", "뮤지컬", "콘서트",
];

const KID_EVIDENCE_KEYWORDS: &[&str] = &[
    "어린이", "유아", "아이", "아기", "키즈", "가족",
    "유모차", "수유실", "아기의자", "유아의자", "키즈메뉴",
];

/// Theme keyword lists used by the themed route strategies
pub const INDOOR_THEME_KEYWORDS: &[&str] = &[
    "실내", "키즈카페", "박물관", "미술관", "도서관", "체육관",
    "공방", "공예", "공연장", "극장", "서점", "완구",
];

pub const OUTDOOR_THEME_KEYWORDS: &[&str] = &[
    "공원", "숲", "산책", "야외", "놀이터", "한강",
    "광장", "자연", "유적", "피크닉", "물놀이", "동물",
];

pub const INDOOR_TYPE_TAGS: &[&str] = &["indoor", "library", "museum", "creative"];
pub const OUTDOOR_TYPE_TAGS: &[&str] = &["outdoor", "park", "playground", "experience"];

// Weighted admissibility score: tuned policy, not a semantic law.
pub const PLAY_KEYWORD_WEIGHT: f64 = 2.2;
pub const KID_KEYWORD_WEIGHT: f64 = 1.3;
pub const CAUTION_KEYWORD_WEIGHT: f64 = 2.4;
pub const SUITABILITY_SCORE_THRESHOLD: f64 = 1.3;

/// Lowercased, joined filter text built from any number of fields
#[must_use]
pub fn build_filter_text<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .map(|value| value.to_lowercase().trim().to_string())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[must_use]
pub fn has_any_keyword(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

#[must_use]
pub fn count_keyword_matches(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|keyword| text.contains(*keyword)).count()
}

#[must_use]
pub fn is_clearly_irrelevant_place_text(text: &str) -> bool {
    has_any_keyword(text, CLEARLY_IRRELEVANT_KEYWORDS)
}

#[must_use]
pub fn is_photo_related_text(text: &str) -> bool {
    has_any_keyword(text, PHOTO_KEYWORDS)
}

#[must_use]
pub fn is_education_facility_text(text: &str) -> bool {
    has_any_keyword(text, EDUCATION_FACILITY_KEYWORDS)
}

#[must_use]
pub fn is_kid_culture_facility_text(text: &str) -> bool {
    has_any_keyword(text, KID_CULTURE_FACILITY_KEYWORDS)
}

/// Shops, eateries and venues need explicit kid evidence in their own text
#[must_use]
pub fn needs_kid_evidence_by_category(text: &str) -> bool {
    if !has_any_keyword(text, EVIDENCE_REQUIRED_CATEGORY_KEYWORDS) {
        return false;
    }
    !has_any_keyword(text, KID_EVIDENCE_KEYWORDS)
}

#[must_use]
pub fn contains_garden_keyword(text: &str) -> bool {
    has_any_keyword(text, GARDEN_KEYWORDS)
}

/// Gardens/arboretums without child-activity evidence are rejected. Before
/// enrichment there is no blog text yet; `allow_unverified_garden` defers
/// that judgement to the post-enrichment pass.
#[must_use]
pub fn is_garden_without_kid_evidence(
    base_text: &str,
    blog_text: &str,
    allow_unverified_garden: bool,
) -> bool {
    if !contains_garden_keyword(base_text) {
        return false;
    }
    if blog_text.is_empty() {
        if allow_unverified_garden {
            return false;
        }
        return !has_any_keyword(base_text, GARDEN_BASE_EVIDENCE_KEYWORDS);
    }
    let evidence_text = build_filter_text([base_text, blog_text]);
    !has_any_keyword(&evidence_text, GARDEN_KID_EVIDENCE_KEYWORDS)
}

/// All attached blog snippets joined into one lowercase blob
#[must_use]
pub fn extract_blog_review_text(reviews: &[BlogReview]) -> String {
    reviews
        .iter()
        .flat_map(|review| [review.title.as_str(), review.description.as_str()])
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Exclusion rules applied to name/category/address text before enrichment
#[must_use]
pub fn should_exclude_base_text(text: &str) -> bool {
    if is_clearly_irrelevant_place_text(text) {
        return true;
    }
    if is_photo_related_text(text) {
        return true;
    }
    is_education_facility_text(text) && !is_kid_culture_facility_text(text)
}

/// A search query is skipped when empty or matching the exclusion lists
#[must_use]
pub fn is_excluded_search_query(query: &str) -> bool {
    let text = build_filter_text([query]);
    if text.is_empty() {
        return true;
    }
    is_clearly_irrelevant_place_text(&text) || is_photo_related_text(&text)
}

/// Filter text for a place from its own fields (no blog text)
#[must_use]
pub fn place_base_text(place: &Place) -> String {
    build_filter_text([
        place.name.as_str(),
        place.category.as_str(),
        place.road_address.as_str(),
        place.address.as_str(),
        place.description.as_str(),
    ])
}

/// Full keyword admissibility decision for a normalized place
#[must_use]
pub fn is_kid_play_suitable_place(place: &Place, allow_unverified_garden: bool) -> bool {
    let base_text = place_base_text(place);
    let blog_text = extract_blog_review_text(&place.blog_reviews);
    let text = build_filter_text([base_text.as_str(), blog_text.as_str()]);

    if text.is_empty() {
        return false;
    }
    if is_clearly_irrelevant_place_text(&text) {
        return false;
    }
    if is_photo_related_text(&text) {
        return false;
    }
    if is_education_facility_text(&text) && !is_kid_culture_facility_text(&text) {
        return false;
    }
    if is_garden_without_kid_evidence(&base_text, &blog_text, allow_unverified_garden) {
        return false;
    }
    if !has_any_keyword(&text, TARGET_CATEGORY_KEYWORDS) {
        return false;
    }
    if needs_kid_evidence_by_category(&text) {
        return false;
    }

    let play_count = count_keyword_matches(&text, PLAY_KEYWORDS);
    let kid_count = count_keyword_matches(&text, KID_KEYWORDS);
    let caution_count = count_keyword_matches(&text, KID_UNSUITABLE_KEYWORDS);
    let score = (play_count as f64) * PLAY_KEYWORD_WEIGHT
        + (kid_count as f64) * KID_KEYWORD_WEIGHT
        - (caution_count as f64) * CAUTION_KEYWORD_WEIGHT;

    if play_count == 0 && kid_count == 0 {
        return false;
    }
    score >= SUITABILITY_SCORE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;
    use rstest::rstest;

    fn place_with(name: &str, category: &str) -> Place {
        Place::new("t1", name, Coordinates::new(37.57, 126.98), 12, 72, 30, category)
    }

    #[test]
    fn test_karaoke_without_kid_keywords_is_rejected() {
        // Category "노래방" hits no play/kid keyword at all
        let place = place_with("신나는 노래방", "노래방");
        assert!(!is_kid_play_suitable_place(&place, true));
    }

    #[test]
    fn test_playground_is_accepted() {
        let place = place_with("강변 어린이 놀이터", "공원 > 놀이터");
        assert!(is_kid_play_suitable_place(&place, true));
    }

    #[test]
    fn test_wine_bar_is_rejected() {
        let place = place_with("달빛 와인바", "주점");
        assert!(!is_kid_play_suitable_place(&place, true));
    }

    #[test]
    fn test_photo_studio_is_rejected() {
        let place = place_with("아이사랑 셀프사진관", "사진관");
        assert!(!is_kid_play_suitable_place(&place, true));
    }

    #[test]
    fn test_education_facility_needs_kid_culture_exception() {
        let academy = place_with("수학 학원", "학원");
        assert!(!is_kid_play_suitable_place(&academy, true));

        let kids_library = place_with("구립 어린이도서관", "도서관");
        assert!(is_kid_play_suitable_place(&kids_library, true));
    }

    #[test]
    fn test_cafe_requires_kid_evidence() {
        let plain_cafe = place_with("조용한 카페", "카페");
        assert!(!is_kid_play_suitable_place(&plain_cafe, true));

        let kids_cafe = place_with("유아 동반 키즈카페", "카페");
        assert!(is_kid_play_suitable_place(&kids_cafe, true));
    }

    #[test]
    fn test_garden_evidence_rules() {
        let garden = place_with("한강 식물원", "식물원");
        // Pre-enrichment pass lets unverified gardens through
        assert!(is_kid_play_suitable_place(&garden, true));

        // Post-enrichment with blog text lacking kid evidence: rejected
        let mut reviewed = garden.clone();
        reviewed.blog_reviews = vec![BlogReview {
            title: "조용한 성인 취향 정원".to_string(),
            description: "분재 전시 감상".to_string(),
            ..BlogReview::default()
        }];
        assert!(!is_kid_play_suitable_place(&reviewed, false));

        // Kid evidence in blog text keeps it
        let mut kid_reviewed = garden;
        kid_reviewed.blog_reviews = vec![BlogReview {
            title: "아이와 함께 산책".to_string(),
            description: "유모차 동선이 편해요".to_string(),
            ..BlogReview::default()
        }];
        assert!(is_kid_play_suitable_place(&kid_reviewed, false));
    }

    #[rstest]
    #[case("키즈카페", false)]
    #[case("실내놀이터", false)]
    #[case("와인바", true)]
    #[case("포토부스", true)]
    #[case("", true)]
    fn test_excluded_search_queries(#[case] query: &str, #[case] excluded: bool) {
        assert_eq!(is_excluded_search_query(query), excluded);
    }

    #[test]
    fn test_keyword_counting() {
        let text = build_filter_text(["어린이 놀이터 옆 키즈카페"]);
        assert!(count_keyword_matches(&text, PLAY_KEYWORDS) >= 2);
        assert!(count_keyword_matches(&text, KID_KEYWORDS) >= 2);
        assert_eq!(count_keyword_matches(&text, KID_UNSUITABLE_KEYWORDS), 0);
    }
}
