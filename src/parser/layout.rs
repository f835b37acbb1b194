use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::error::ParseError;

static CURRENT_MARKERS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main, figure, figcaption").unwrap());
static BODY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

static CURRENT_REGIONS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&["main", "article", "[role='main']", "#content"]));
static LEGACY_REGIONS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&["#content", ".content", "#main", "td.content", "body"]));

fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter().map(|s| Selector::parse(s).unwrap()).collect()
}

/// The two generations of atlas page markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Table/div pages from the webeye.ophth.uiowa.edu era: captions sit in
    /// the same cell or block as the image.
    Legacy,
    /// eyerounds.org pages built around `<main>` and `<figure>`/`<figcaption>`.
    Current,
}

impl Layout {
    /// Decide which layout a document uses from its structure.
    pub fn probe(document: &Html) -> Result<Layout, ParseError> {
        if document.select(&CURRENT_MARKERS).next().is_some() {
            return Ok(Layout::Current);
        }
        let body_has_elements = document
            .select(&BODY_SEL)
            .next()
            .is_some_and(|body| body.children().any(|c| c.value().is_element()));
        if body_has_elements {
            Ok(Layout::Legacy)
        } else {
            Err(ParseError::UnrecognizedLayout)
        }
    }

    /// The element holding the case narrative and images.
    pub fn content_region<'a>(&self, document: &'a Html) -> ElementRef<'a> {
        let candidates = match self {
            Layout::Current => &*CURRENT_REGIONS,
            Layout::Legacy => &*LEGACY_REGIONS,
        };
        candidates
            .iter()
            .find_map(|sel| document.select(sel).next())
            .unwrap_or_else(|| document.root_element())
    }
}
