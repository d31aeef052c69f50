//! Extraction strategy: everything that depends on the current markup of
//! the people-search results page.
//!
//! The workflow asks the strategy which selectors to wait for, which to
//! enumerate, and what to capture from each result (`ElementProbe`). The
//! browser returns an `ElementSnapshot` and the strategy turns it into a
//! `ScrapedProfile` or rejects it. A markup change means a new strategy,
//! not a new workflow.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::profile::ScrapedProfile;

const SITE_ORIGIN: &str = "https://www.linkedin.com";

pub const DEFAULT_NAME: &str = "LinkedIn User";
pub const DEFAULT_HEADLINE: &str = "Professional";
pub const DEFAULT_LOCATION: &str = "Not specified";
pub const DEFAULT_COMPANY: &str = "Not specified";

static LETTERS_AND_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s]+$").expect("valid regex"));
static WORD_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w").expect("valid regex"));

/// What to capture from one result element. Serialized into the page script.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementProbe {
    pub link_selector: String,
    pub name_selector: String,
    /// Tried in order; the first match of each contributes one text.
    pub headline_selectors: Vec<String>,
    pub location_selectors: Vec<String>,
    pub image_selector: String,
}

/// Raw captures from one result element.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementSnapshot {
    pub links: Vec<String>,
    pub name_candidates: Vec<String>,
    pub headline_texts: Vec<String>,
    pub location_texts: Vec<String>,
    pub images: Vec<ImageRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageRef {
    pub src: String,
    pub alt: String,
}

pub trait ExtractionStrategy: Send + Sync {
    /// Any one of these appearing means the results have rendered.
    fn ready_selectors(&self) -> &[&'static str];

    /// Tried in order; the first that matches anything enumerates the results.
    fn result_selectors(&self) -> &[&'static str];

    /// Pagination control clicked while scrolling, if the layout has one.
    fn next_page_selector(&self) -> Option<&str>;

    fn probe(&self) -> &ElementProbe;

    fn extract(&self, snapshot: &ElementSnapshot) -> Option<ScrapedProfile>;
}

/// Heuristics for the people-search results layout.
pub struct SearchResultStrategy {
    probe: ElementProbe,
}

impl Default for SearchResultStrategy {
    fn default() -> Self {
        Self {
            probe: ElementProbe {
                link_selector: r#"a[href*="/in/"]"#.to_string(),
                name_selector: r#"span[aria-hidden="true"]"#.to_string(),
                headline_selectors: vec![
                    ".TAYewapuqMgOfnEuxivFUjMXDEiimxOfaZyY".to_string(),
                    r#"[class*="t-14 t-black t-normal"]"#.to_string(),
                    ".entity-result__primary-subtitle".to_string(),
                ],
                location_selectors: vec![
                    ".eQffXYRHIZcCSOyKEFlUnrgTCIPHCHkkToUw".to_string(),
                    r#"[class*="t-14 t-normal"]:not([class*="t-black"])"#.to_string(),
                ],
                image_selector: "img".to_string(),
            },
        }
    }
}

const READY_SELECTORS: [&str; 4] = [
    ".search-results-container",
    ".search-results__list",
    "[data-chameleon-result-urn]",
    ".reusable-search__result-container",
];

const RESULT_SELECTORS: [&str; 3] = [
    ".reusable-search__result-container",
    "[data-chameleon-result-urn]",
    ".search-result__wrapper",
];

impl ExtractionStrategy for SearchResultStrategy {
    fn ready_selectors(&self) -> &[&'static str] {
        &READY_SELECTORS
    }

    fn result_selectors(&self) -> &[&'static str] {
        &RESULT_SELECTORS
    }

    fn next_page_selector(&self) -> Option<&str> {
        Some(".artdeco-pagination__button--next")
    }

    fn probe(&self) -> &ElementProbe {
        &self.probe
    }

    fn extract(&self, snapshot: &ElementSnapshot) -> Option<ScrapedProfile> {
        let url = profile_url_from_links(&snapshot.links);

        let full_name = snapshot
            .name_candidates
            .iter()
            .map(|t| t.trim())
            .find(|t| is_plausible_name(t))
            .map(str::to_string)
            .or_else(|| url.as_deref().and_then(name_from_slug))
            .unwrap_or_else(|| DEFAULT_NAME.to_string());

        let headline =
            pick_headline(&snapshot.headline_texts).unwrap_or_else(|| DEFAULT_HEADLINE.to_string());
        let location = pick_location(&snapshot.location_texts, &full_name, &headline)
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        let profile_photo = pick_photo(&snapshot.images).unwrap_or_default();
        let (current_job_title, company_name) = split_headline(&headline);
        let url = url.unwrap_or_default();

        let name_ok = has_valid_name(&full_name);
        let url_ok = has_valid_url(&url);
        let headline_ok = has_valid_headline(&headline);
        if !(name_ok && (url_ok || headline_ok)) {
            debug!(
                name = %full_name,
                name_ok,
                url_ok,
                headline_ok,
                "Skipping result with insufficient data"
            );
            return None;
        }

        let profile_url = if url.is_empty() {
            synthesize_url(&full_name)
        } else {
            url
        };

        Some(ScrapedProfile {
            full_name,
            headline,
            current_job_title,
            company_name,
            location,
            profile_url,
            about: String::new(),
            profile_photo,
        })
    }
}

/// First internal profile link, absolutised and stripped of its query string.
pub fn profile_url_from_links(links: &[String]) -> Option<String> {
    links
        .iter()
        .map(|href| {
            if href.starts_with('/') {
                format!("{SITE_ORIGIN}{href}")
            } else {
                href.clone()
            }
        })
        .find(|href| {
            href.contains("/in/") && href.contains("linkedin.com") && !href.contains("miniProfileUrn")
        })
        .map(|href| href.split('?').next().unwrap_or_default().to_string())
}

/// Accessible-name spans also carry badges, connection degrees and buttons.
pub fn is_plausible_name(text: &str) -> bool {
    let len = text.chars().count();
    len > 2
        && len < 60
        && !["•", "Status", "connection", "View", "degree"]
            .iter()
            .any(|noise| text.contains(noise))
        && LETTERS_AND_SPACES.is_match(text)
        && text.split_whitespace().count() >= 2
}

/// `/in/john-smith-42` → `John Smith`: hyphens become spaces, words are
/// capitalised, digits dropped.
pub fn name_from_slug(url: &str) -> Option<String> {
    let slug = url.split("/in/").nth(1)?.split('?').next()?.trim_end_matches('/');
    if slug.is_empty() {
        return None;
    }
    let spaced = slug.replace('-', " ");
    let titled = WORD_START.replace_all(&spaced, |caps: &regex::Captures<'_>| caps[0].to_uppercase());
    let name = titled
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!name.is_empty()).then_some(name)
}

pub fn pick_headline(texts: &[String]) -> Option<String> {
    texts
        .iter()
        .map(|t| t.trim())
        .find(|t| {
            let len = t.chars().count();
            len > 3
                && len < 200
                && !t.contains('•')
                && !t.contains("connection")
                && !t.contains("Status")
        })
        .map(str::to_string)
}

pub fn pick_location(texts: &[String], name: &str, headline: &str) -> Option<String> {
    texts
        .iter()
        .map(|t| t.trim())
        .find(|t| {
            let len = t.chars().count();
            len > 2
                && len < 100
                && !t.contains('•')
                && !t.contains("connection")
                && *t != name
                && *t != headline
        })
        .map(str::to_string)
}

pub fn pick_photo(images: &[ImageRef]) -> Option<String> {
    images
        .iter()
        .find(|img| {
            (img.src.contains("profile-displayphoto") || img.src.contains("media.licdn.com"))
                && !img.alt.is_empty()
                && img.alt != "LinkedIn"
                && !img.src.contains("icon")
        })
        .map(|img| img.src.clone())
}

/// Splits "Title at Company". Without a literal " at " the whole headline is
/// the job title and the company is the placeholder.
pub fn split_headline(headline: &str) -> (String, String) {
    if !headline.contains(" at ") {
        return (headline.to_string(), DEFAULT_COMPANY.to_string());
    }
    let mut parts = headline.split(" at ");
    let title = parts
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(headline);
    let company = parts
        .next()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_COMPANY);
    (title.to_string(), company.to_string())
}

pub fn has_valid_name(name: &str) -> bool {
    name != "Unknown"
        && name != DEFAULT_NAME
        && name.chars().count() > 3
        && LETTERS_AND_SPACES.is_match(name)
        && name.split_whitespace().count() >= 2
}

pub fn has_valid_url(url: &str) -> bool {
    url.contains("linkedin.com") && url.contains("/in/") && url.chars().count() > 30
}

pub fn has_valid_headline(headline: &str) -> bool {
    headline != DEFAULT_HEADLINE && headline.chars().count() > 5
}

/// Profile URL derived from the name, for accepted results without a link.
pub fn synthesize_url(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || *c == '-')
        .collect();
    format!("{SITE_ORIGIN}/in/{slug}")
}
