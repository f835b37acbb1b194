use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::category::Category;
use crate::error::ParseError;
use crate::normalize::normalize_text;

pub const CURRENT_BASE: &str = "https://eyerounds.org";
pub const LEGACY_BASE: &str = "https://webeye.ophth.uiowa.edu";

const LEGACY_PATH: &str = "/eyeforum/atlas/pages/";
const CURRENT_PATH: &str = "/atlas/pages/";

/// Hosts that serve atlas entries, in either scheme.
const ATLAS_HOSTS: &[&str] = &["eyerounds.org", "webeye.ophth.uiowa.edu"];

static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Which historical URL scheme an entry link used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScheme {
    /// webeye.ophth.uiowa.edu/eyeforum/atlas/pages/...
    Legacy,
    /// eyerounds.org/atlas/pages/...
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub url: String,
    pub category_hint: Option<String>,
    pub scheme: LinkScheme,
    pub label: Option<String>,
}

impl IndexEntry {
    pub fn hinted_category(&self) -> Option<Category> {
        self.category_hint.as_deref().and_then(Category::classify)
    }
}

/// Unresolved link as found on the listing.
#[derive(Debug, Clone)]
pub(crate) struct RawLink {
    pub href: String,
    pub hint: Option<String>,
    pub label: Option<String>,
}

/// A parsed listing. [`IndexListing::entries`] classifies links lazily and
/// can be called any number of times.
#[derive(Debug, Clone)]
pub struct IndexListing {
    base: Url,
    links: Vec<RawLink>,
}

impl IndexListing {
    /// Parse an HTML listing page. Fails only when nothing on it looks like
    /// an atlas entry.
    pub fn from_html(html: &str, index_url: &str) -> Result<Self, ParseError> {
        let base = parse_url(index_url)?;
        let document = Html::parse_document(html);
        let links = document
            .select(&ANCHOR_SEL)
            .filter_map(|a| {
                let href = a.value().attr("href")?.trim().to_string();
                let label = Some(normalize_text(&a.text().collect::<String>())).filter(|l| !l.is_empty());
                Some(RawLink {
                    href,
                    hint: category_hint(&a),
                    label,
                })
            })
            .collect();
        Self::checked(base, links)
    }

    pub(crate) fn from_raw(base: &str, links: Vec<RawLink>) -> Result<Self, ParseError> {
        Self::checked(parse_url(base)?, links)
    }

    fn checked(base: Url, links: Vec<RawLink>) -> Result<Self, ParseError> {
        let listing = Self { base, links };
        if listing.entries().next().is_none() {
            return Err(ParseError::EmptyIndex);
        }
        Ok(listing)
    }

    /// Entry links in page order, absolute, each URL once.
    pub fn entries(&self) -> impl Iterator<Item = IndexEntry> + '_ {
        let mut seen = HashSet::new();
        self.links.iter().filter_map(move |raw| {
            let (url, scheme) = resolve_entry_url(&self.base, &raw.href)?;
            if !seen.insert(url.clone()) {
                return None;
            }
            Some(IndexEntry {
                url,
                category_hint: raw.hint.clone(),
                scheme,
                label: raw.label.clone(),
            })
        })
    }

    pub fn raw_link_count(&self) -> usize {
        self.links.len()
    }
}

fn parse_url(s: &str) -> Result<Url, ParseError> {
    Url::parse(s).map_err(|e| ParseError::InvalidUrl {
        url: s.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve an href to an absolute entry URL, or `None` when it is not an
/// atlas entry link (navigation, mail, anchors, other sections).
pub fn resolve_entry_url(base: &Url, href: &str) -> Option<(String, LinkScheme)> {
    let href = href.trim();
    let lower = href.to_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("mailto:")
        || lower.starts_with("javascript:")
    {
        return None;
    }

    let mut url = if lower.starts_with("http://") || lower.starts_with("https://") {
        Url::parse(href).ok()?
    } else if href.starts_with("//") {
        Url::parse(&format!("https:{}", href)).ok()?
    } else if href.starts_with(LEGACY_PATH) || href.starts_with("/eyeforum/") {
        Url::parse(LEGACY_BASE).ok()?.join(href).ok()?
    } else if href.starts_with('/') {
        Url::parse(CURRENT_BASE).ok()?.join(href).ok()?
    } else {
        base.join(href).ok()?
    };
    url.set_fragment(None);
    if !is_atlas_host(&url, base) {
        return None;
    }

    let path = url.path().to_string();
    let (scheme, rest) = if let Some(i) = path.find(LEGACY_PATH) {
        (LinkScheme::Legacy, &path[i + LEGACY_PATH.len()..])
    } else if let Some(i) = path.find(CURRENT_PATH) {
        (LinkScheme::Current, &path[i + CURRENT_PATH.len()..])
    } else {
        return None;
    };
    if rest.trim_matches('/').is_empty() {
        return None;
    }
    Some((url.to_string(), scheme))
}

/// A known atlas host (with or without `www.`), or the listing's own host.
fn is_atlas_host(url: &Url, base: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let bare = host.strip_prefix("www.").unwrap_or(&host);
    ATLAS_HOSTS.contains(&bare) || base.host_str().is_some_and(|b| b.eq_ignore_ascii_case(&host))
}

/// Look for a category on the link or its containers: `data-category`,
/// `data-topic`, or a class naming a category ("retina", "cat-retina").
fn category_hint(anchor: &ElementRef) -> Option<String> {
    let chain = std::iter::once(*anchor).chain(anchor.ancestors().filter_map(ElementRef::wrap));
    for el in chain {
        let v = el.value();
        for attr in ["data-category", "data-topic"] {
            if let Some(val) = v.attr(attr).map(str::trim).filter(|s| !s.is_empty()) {
                return Some(val.to_string());
            }
        }
        for class in v.classes() {
            let token = class
                .strip_prefix("category-")
                .or_else(|| class.strip_prefix("cat-"))
                .unwrap_or(class);
            if let Ok(c) = token.parse::<Category>() {
                if c != Category::Uncategorized {
                    return Some(c.as_str().to_string());
                }
            }
        }
    }
    None
}
