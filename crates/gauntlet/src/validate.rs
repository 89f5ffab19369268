//! Hygiene for text and URLs that arrive from outside.
//!
//! Search hits and scraped pages are untrusted: they carry markup, control
//! characters, tracking-mangled URLs, and sometimes nothing at all. Every
//! external string passes through here before the funnel reasons about it.

use std::sync::LazyLock;

use regex::Regex;

use crate::clients::SearchHit;

/// Longest sanitized snippet we keep. Longer text adds token cost without
/// adding signal for complaint or pricing analysis.
pub const MAX_TEXT_LEN: usize = 1000;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Words that mark a text as talking about money. Used to route competitor
/// snippets into pricing extraction.
const PRICING_TERMS: [&str; 8] = [
    "$",
    "per month",
    "monthly",
    "pricing",
    "cost",
    "subscription",
    "free trial",
    "price",
];

/// Strip markup and control characters, collapse whitespace, and cap length.
pub fn sanitize_text(raw: &str) -> String {
    let no_tags = TAG_RE.replace_all(raw, " ");
    let printable: String = no_tags
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let collapsed = WHITESPACE_RE.replace_all(printable.trim(), " ");

    // Char-based cap; byte slicing could split a multi-byte character.
    if collapsed.chars().count() > MAX_TEXT_LEN {
        collapsed.chars().take(MAX_TEXT_LEN).collect()
    } else {
        collapsed.into_owned()
    }
}

/// Accept only absolute http(s) URLs with a host.
pub fn is_valid_url(url: &str) -> bool {
    let rest = if let Some(rest) = url.strip_prefix("https://") {
        rest
    } else if let Some(rest) = url.strip_prefix("http://") {
        rest
    } else {
        return false;
    };

    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    !host.is_empty() && host.contains('.')
}

/// Host portion of a URL, for labeling sources.
pub fn domain_of(url: &str) -> Option<String> {
    if !is_valid_url(url) {
        return None;
    }
    let rest = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = rest.split(['/', '?', '#']).next()?;
    Some(host.trim_start_matches("www.").to_string())
}

/// Drop unusable hits and sanitize the ones that survive. A hit needs a
/// non-empty title, a non-empty snippet, and a well-formed link.
pub fn clean_search_hits(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let before = hits.len();
    let cleaned: Vec<SearchHit> = hits
        .into_iter()
        .filter_map(|hit| {
            let title = sanitize_text(&hit.title);
            let snippet = sanitize_text(&hit.snippet);
            if title.is_empty() || snippet.is_empty() || !is_valid_url(&hit.link) {
                return None;
            }
            let source = domain_of(&hit.link).unwrap_or_else(|| hit.source.clone());
            Some(SearchHit {
                title,
                snippet,
                link: hit.link,
                source,
            })
        })
        .collect();

    if cleaned.len() < before {
        tracing::debug!(
            dropped = before - cleaned.len(),
            kept = cleaned.len(),
            "Dropped unusable search hits"
        );
    }
    cleaned
}

/// Derive a competitor name from a result title, falling back to the link's
/// domain. Titles like "Acme — Pricing | Best CRM 2024" should yield "Acme".
pub fn competitor_name(title: &str, link: &str) -> String {
    let head = title
        .split(['|', '-'])
        .next()
        .map(str::trim)
        .unwrap_or("");

    if !head.is_empty() {
        return head.to_string();
    }
    domain_of(link).unwrap_or_else(|| "Unknown".to_string())
}

/// Whether the text talks about money at all.
pub fn mentions_pricing(text: &str) -> bool {
    let lower = text.to_lowercase();
    PRICING_TERMS.iter().any(|term| lower.contains(term))
}
