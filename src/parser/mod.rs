pub mod credits;
pub mod images;
pub mod layout;
pub mod text;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::ParseError;
use crate::model::AtlasEntry;
use layout::Layout;
use text::{block_lines, has_class_like, inline_text};

static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static H2_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").unwrap());
static BODY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static SITE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^eyerounds(?:\.org)?\s*[-\u{2013}:|]\s*").unwrap());
static SITE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*[-\u{2013}|]\s*eyerounds(?:\.org)?$").unwrap());
static FIGURE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^fig(?:ure)?\.?\s*\d").unwrap());

/// Headings that name the site or section rather than the case.
const GENERIC_TITLES: &[&str] = &[
    "atlas",
    "eyerounds",
    "eyerounds.org",
    "ophthalmology and visual sciences",
    "ophthalmology atlas",
];

/// Tags whose text never belongs to the narrative.
const NARRATIVE_SKIP_TAGS: &[&str] = &[
    "figure", "figcaption", "nav", "header", "footer", "aside", "form", "button", "select", "h1", "h2",
    "h3", "h4", "h5", "h6",
];
const NARRATIVE_SKIP_CLASSES: &[&str] = &["caption", "credit", "permission", "related", "breadcrumb", "menu", "share"];

const BOILERPLATE: &[&str] = &[
    "image permissions",
    "creative commons",
    "enlarge",
    "download",
    "related articles",
    "university of iowa",
    "address",
    "copyright",
    "share this",
    "back to top",
];

/// Parse one atlas entry page. The layout is probed from the markup; a
/// missing title is the only field-level failure.
pub fn parse_entry(html: &str, source_url: &str) -> Result<AtlasEntry, ParseError> {
    let page_url = Url::parse(source_url).map_err(|e| ParseError::InvalidUrl {
        url: source_url.to_string(),
        reason: e.to_string(),
    })?;
    let document = Html::parse_document(html);
    let layout = Layout::probe(&document)?;
    let title = extract_title(&document).ok_or(ParseError::MissingField("title"))?;

    let body = document.select(&BODY_SEL).next().unwrap_or_else(|| document.root_element());
    let page_lines = block_lines(body, &|el| matches!(el.value().name(), "nav" | "footer"));
    let credits = credits::extract_credits(&page_lines);
    let page_category = credits::category_line(&page_lines);

    let region = layout.content_region(&document);
    let description = extract_description(region);
    let images = images::extract_images(layout, region, &page_url);

    debug!(
        url = source_url,
        ?layout,
        images = images.len(),
        contributors = credits.contributors.len(),
        "parsed entry"
    );

    Ok(AtlasEntry {
        source_url: source_url.to_string(),
        title,
        description,
        contributors: credits.contributors,
        photographers: credits.photographers,
        images,
        page_category,
    })
}

/// First `h1` that names the case, falling back to `h2`.
fn extract_title(document: &Html) -> Option<String> {
    document
        .select(&H1_SEL)
        .chain(document.select(&H2_SEL))
        .find_map(|h| clean_title(&inline_text(h)))
}

fn clean_title(raw: &str) -> Option<String> {
    let title = SITE_PREFIX_RE.replace(raw.trim(), "");
    let title = SITE_SUFFIX_RE.replace(&title, "").trim().to_string();
    if title.chars().count() <= 3 || GENERIC_TITLES.contains(&title.to_lowercase().as_str()) {
        return None;
    }
    Some(title)
}

fn skip_in_narrative(el: &ElementRef) -> bool {
    NARRATIVE_SKIP_TAGS.contains(&el.value().name()) || has_class_like(el, NARRATIVE_SKIP_CLASSES)
}

/// Narrative prose of the content region, one space between paragraphs.
fn extract_description(region: ElementRef) -> String {
    block_lines(region, &skip_in_narrative)
        .into_iter()
        .filter(|line| is_narrative(line))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_narrative(line: &str) -> bool {
    if credits::is_label_line(line) || FIGURE_LINE_RE.is_match(line) {
        return false;
    }
    let lower = line.to_lowercase();
    if BOILERPLATE.iter().any(|b| lower.starts_with(b)) {
        return false;
    }
    line.split_whitespace().count() >= 4 || line.ends_with('.')
}
