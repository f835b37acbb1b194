use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

use super::layout::Layout;
use super::text::{has_class_like, inline_text};
use crate::model::ImageReference;

static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static FIGCAPTION_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("figcaption").unwrap());
static CAPTION_CLASS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[class*='caption'], [class*='Caption']").unwrap());
static FIGURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfig(?:ure)?\.?\s*(\d+[a-z]?)\b").unwrap());

/// Site chrome rather than clinical images.
const SKIP_PATTERNS: &[&str] = &[
    "cc.png",
    "creativecommons",
    "licensebuttons",
    "lowerlogo",
    "domegold",
    "eyerounds-logo",
    "eyerounds-500w",
    "/i/current/",
    "related_case",
    "facebook",
    "twitter",
    "instagram",
    "logo",
    "social",
    "favicon",
    "/icons/",
    "icon.",
    "-icon",
    "_icon",
    "banner",
];

const LEGACY_CONTAINERS: &[&str] = &["td", "div", "li", "dd", "p", "center"];

pub fn is_chrome_image(src: &str) -> bool {
    let lower = src.to_lowercase();
    SKIP_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Every clinical image inside `region`, in document order, with absolute
/// URLs and the caption the layout associates with it.
pub fn extract_images(layout: Layout, region: ElementRef, page_url: &Url) -> Vec<ImageReference> {
    region
        .select(&IMG_SEL)
        .filter_map(|img| {
            let src = img
                .value()
                .attr("src")
                .or_else(|| img.value().attr("data-src"))
                .map(str::trim)
                .filter(|s| !s.is_empty() && !s.starts_with("data:"))?;
            if is_chrome_image(src) {
                return None;
            }
            let url = page_url.join(src).ok()?;

            let container = container_of(layout, img, region);
            let caption_markup = container.and_then(|c| caption_in(layout, c, img));
            let alt = img
                .value()
                .attr("alt")
                .map(|a| a.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|a| !a.is_empty());

            let figure_label = caption_markup
                .as_deref()
                .and_then(figure_label_in)
                .or_else(|| {
                    container
                        .filter(|c| c.select(&IMG_SEL).count() == 1)
                        .map(inline_text)
                        .as_deref()
                        .and_then(figure_label_in)
                })
                .or_else(|| alt.as_deref().and_then(figure_label_in));

            Some(ImageReference {
                url: url.to_string(),
                caption: caption_markup.or(alt).unwrap_or_default(),
                figure_label,
            })
        })
        .collect()
}

/// "Figure 1a: ..." / "Fig. 2" -> "Figure 1a"
pub fn figure_label_in(text: &str) -> Option<String> {
    FIGURE_RE
        .captures(text)
        .map(|c| format!("Figure {}", &c[1]))
}

/// Current pages wrap each image in a `<figure>`; legacy pages put it in a
/// table cell or div next to its caption.
fn container_of<'a>(layout: Layout, img: ElementRef<'a>, region: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let mut ancestors = img
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|a| a.id() != region.id());
    match layout {
        Layout::Current => ancestors.find(|a| a.value().name() == "figure"),
        Layout::Legacy => ancestors.find(|a| LEGACY_CONTAINERS.contains(&a.value().name())),
    }
}

fn caption_in(layout: Layout, container: ElementRef, img: ElementRef) -> Option<String> {
    let found = match layout {
        Layout::Current => container
            .select(&FIGCAPTION_SEL)
            .next()
            .or_else(|| container.select(&CAPTION_CLASS_SEL).next()),
        Layout::Legacy => {
            if has_class_like(&container, &["caption"]) {
                Some(container)
            } else if container.select(&IMG_SEL).count() == 1 {
                caption_after(container, img).or_else(|| container.select(&CAPTION_CLASS_SEL).next())
            } else {
                caption_after(container, img)
            }
        }
    };
    found.map(inline_text).filter(|t| !t.is_empty())
}

/// First caption-class element after `img` in document order, stopping at
/// the next image of the same container.
fn caption_after<'a>(container: ElementRef<'a>, img: ElementRef<'a>) -> Option<ElementRef<'a>> {
    container
        .descendants()
        .filter_map(ElementRef::wrap)
        .skip_while(|el| el.id() != img.id())
        .skip(1)
        .take_while(|el| el.value().name() != "img")
        .find(|el| has_class_like(el, &["caption"]))
}
