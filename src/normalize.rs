use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::model::{AtlasEntry, ImageReference};

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,7});").unwrap());

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", "\u{a0}"),
    ("ndash", "\u{2013}"),
    ("mdash", "\u{2014}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("ldquo", "\u{201c}"),
    ("rdquo", "\u{201d}"),
    ("hellip", "\u{2026}"),
    ("deg", "\u{b0}"),
    ("micro", "\u{b5}"),
    ("plusmn", "\u{b1}"),
    ("times", "\u{d7}"),
    ("middot", "\u{b7}"),
    ("eacute", "\u{e9}"),
    ("egrave", "\u{e8}"),
    ("uuml", "\u{fc}"),
    ("ouml", "\u{f6}"),
    ("auml", "\u{e4}"),
    ("ccedil", "\u{e7}"),
    ("copy", "\u{a9}"),
    ("reg", "\u{ae}"),
];

/// Decode HTML entity artifacts left in text, repeating until nothing
/// changes so double-escaped text ("&amp;amp;") comes out clean.
pub fn decode_entities(s: &str) -> String {
    let mut current = s.to_string();
    loop {
        let next = decode_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn decode_once(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITY_RE
        .replace_all(s, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32).map(String::from)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32).map(String::from)
            } else {
                NAMED_ENTITIES
                    .iter()
                    .find(|(name, _)| *name == body)
                    .map(|(_, v)| v.to_string())
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Trim and collapse every whitespace run (including NBSP) to one space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_text(s: &str) -> String {
    collapse_whitespace(&decode_entities(s))
}

/// Clean every text field and drop repeated image URLs, keeping the first
/// occurrence. Applying it twice gives the same result as once.
pub fn normalize_entry(entry: &AtlasEntry) -> AtlasEntry {
    let mut seen = HashSet::new();
    let images = entry
        .images
        .iter()
        .filter_map(|img| {
            let url = decode_entities(img.url.trim()).trim().to_string();
            if url.is_empty() || !seen.insert(url.clone()) {
                return None;
            }
            let figure_label = img
                .figure_label
                .as_deref()
                .map(normalize_text)
                .filter(|l| !l.is_empty());
            Some(ImageReference {
                url,
                caption: normalize_text(&img.caption),
                figure_label,
            })
        })
        .collect();

    AtlasEntry {
        source_url: entry.source_url.trim().to_string(),
        title: normalize_text(&entry.title),
        description: normalize_text(&entry.description),
        contributors: normalize_names(&entry.contributors),
        photographers: normalize_names(&entry.photographers),
        images,
        page_category: entry
            .page_category
            .as_deref()
            .map(normalize_text)
            .filter(|c| !c.is_empty()),
    }
}

fn normalize_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|n| normalize_text(n))
        .filter(|n| !n.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(url: &str, caption: &str) -> ImageReference {
        ImageReference {
            url: url.into(),
            caption: caption.into(),
            figure_label: None,
        }
    }

    fn messy_entry() -> AtlasEntry {
        AtlasEntry {
            source_url: " https://eyerounds.org/atlas/pages/apmppe/index.htm ".into(),
            title: "  APMPPE &amp;amp; friends\n".into(),
            description: "Fundus\tphotos&nbsp;show\n\n  placoid   lesions &lt;OD&gt;.".into(),
            contributors: vec![" A. Smith ".into(), "   ".into(), "B.&#32;Jones".into()],
            photographers: vec!["Brice Critser, CRA".into()],
            images: vec![
                img("https://eyerounds.org/a.jpg", " Figure 1:  left eye "),
                img("https://eyerounds.org/b.jpg?x=1&amp;y=2", ""),
                img("https://eyerounds.org/a.jpg", "duplicate"),
                img("  ", "no url"),
            ],
            page_category: Some(" Retina &amp; Vitreous ".into()),
        }
    }

    #[test]
    fn decodes_named_and_numeric() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&#169; &#xA9;"), "\u{a9} \u{a9}");
        assert_eq!(decode_entities("&amp;lt;b&amp;gt;"), "<b>");
        assert_eq!(decode_entities("AT&T &unknown; 5 &lt 6"), "AT&T &unknown; 5 &lt 6");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b\u{a0} c  "), "a b c");
        assert_eq!(normalize_text("x&nbsp;&nbsp;y"), "x y");
    }

    #[test]
    fn normalizes_fields_and_dedupes_images() {
        let n = normalize_entry(&messy_entry());
        assert_eq!(n.source_url, "https://eyerounds.org/atlas/pages/apmppe/index.htm");
        assert_eq!(n.title, "APMPPE & friends");
        assert_eq!(n.description, "Fundus photos show placoid lesions <OD>.");
        assert_eq!(n.contributors, vec!["A. Smith", "B. Jones"]);
        assert_eq!(n.images.len(), 2);
        assert_eq!(n.images[0].caption, "Figure 1: left eye");
        assert_eq!(n.images[1].url, "https://eyerounds.org/b.jpg?x=1&y=2");
        assert_eq!(n.page_category.as_deref(), Some("Retina & Vitreous"));
    }

    #[test]
    fn idempotent() {
        let once = normalize_entry(&messy_entry());
        let twice = normalize_entry(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn query_variants_are_distinct() {
        let e = AtlasEntry {
            images: vec![
                img("https://eyerounds.org/a.jpg?v=1", ""),
                img("https://eyerounds.org/a.jpg?v=2", ""),
            ],
            ..Default::default()
        };
        assert_eq!(normalize_entry(&e).images.len(), 2);
    }
}
