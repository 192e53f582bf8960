//! Small text helpers shared by the normalizer and enrichment lookups

/// Remove HTML tags from provider text fields
#[must_use]
pub fn strip_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_tag = false;
    for ch in value.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Collapse whitespace runs and trim
#[must_use]
pub fn normalize_space(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased, tag-free, whitespace-free form used for identity comparison
#[must_use]
pub fn normalize_compare_text(value: &str) -> String {
    strip_html(value)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Upgrade plain-http links; leaves anything else untouched
#[must_use]
pub fn to_https_url(url: &str) -> String {
    let raw = url.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Some(rest) = raw.strip_prefix("http://") {
        return format!("https://{rest}");
    }
    raw.to_string()
}

/// Decode the handful of entities that show up in provider HTML
#[must_use]
pub fn decode_html_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// Extract the `content` attribute of a `<meta>` tag matching `attr="value"`.
///
/// Handles both attribute orders without pulling in a full HTML parser;
/// provider pages keep these tags lowercase, so matching is exact.
#[must_use]
pub fn extract_meta_content(html: &str, attr: &str, value: &str) -> String {
    let needle = format!("{attr}=\"{value}\"");

    let mut search_from = 0;
    while let Some(pos) = html[search_from..].find(&needle) {
        let at = search_from + pos;
        let tag_start = html[..at].rfind("<meta").unwrap_or(at);
        let tag_end = match html[at..].find('>') {
            Some(end) => at + end,
            None => break,
        };
        let tag = &html[tag_start..=tag_end];
        if let Some(content) = attribute_value(tag, "content") {
            return content;
        }
        search_from = tag_end + 1;
    }
    String::new()
}

fn attribute_value(tag: &str, attr: &str) -> Option<String> {
    let key = format!("{attr}=\"");
    let start = tag.find(&key)? + key.len();
    let end = tag[start..].find('"')? + start;
    let value = tag[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
