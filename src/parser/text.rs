use scraper::{ElementRef, Node};

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "center", "dd", "div", "dl", "dt",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "p", "section", "table", "tbody", "td", "th", "thead", "tr", "ul",
];

/// Never carry readable text.
pub const NON_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template", "iframe", "svg"];

/// Render an element's text with one line per block element, skipping any
/// subtree for which `skip` returns true. Lines are whitespace-collapsed
/// and never empty.
pub fn block_lines(root: ElementRef, skip: &dyn Fn(&ElementRef) -> bool) -> Vec<String> {
    let mut buf = String::new();
    walk(root, skip, &mut buf);
    buf.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect()
}

fn walk(el: ElementRef, skip: &dyn Fn(&ElementRef) -> bool, buf: &mut String) {
    let name = el.value().name();
    let block = BLOCK_TAGS.contains(&name);
    if block {
        buf.push('\n');
    }
    for child in el.children() {
        match child.value() {
            Node::Text(t) => buf.push_str(&t.replace(['\n', '\r'], " ")),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !NON_TEXT_TAGS.contains(&child_el.value().name()) && !skip(&child_el) {
                        walk(child_el, skip, buf);
                    }
                }
            }
            _ => {}
        }
    }
    if block {
        buf.push('\n');
    }
}

/// Collapsed inline text of an element (no line structure).
pub fn inline_text(el: ElementRef) -> String {
    // Text nodes are concatenated as-is; splitting a word across tags
    // (`Vogt-Koyanagi-<i>Harada</i>`) must not insert a space.
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn has_class_like(el: &ElementRef, needles: &[&str]) -> bool {
    el.value()
        .classes()
        .any(|c| needles.iter().any(|n| c.to_lowercase().contains(n)))
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::*;

    #[test]
    fn blocks_and_breaks_become_lines() {
        let doc = Html::parse_fragment(
            "<div>Contributor: Jane Doe<br>Photographer: Ralph\n Ford<p>Narrative <b>bold</b> text.</p><script>var x = 1;</script><figure><figcaption>Figure 1</figcaption></figure></div>",
        );
        let div = doc.select(&Selector::parse("div").unwrap()).next().unwrap();
        let lines = block_lines(div, &|e| e.value().name() == "figure");
        assert_eq!(
            lines,
            vec!["Contributor: Jane Doe", "Photographer: Ralph Ford", "Narrative bold text."]
        );
    }

    #[test]
    fn inline_text_collapses() {
        let doc = Html::parse_fragment("<p>  Figure\n 1:   <i>fundus</i> </p>");
        let p = doc.select(&Selector::parse("p").unwrap()).next().unwrap();
        assert_eq!(inline_text(p), "Figure 1: fundus");
    }

    #[test]
    fn inline_tags_do_not_split_words() {
        let doc = Html::parse_fragment("<h1>Vogt-Koyanagi-<i>Harada</i> Disease</h1><p>Figure 1<b>a</b>: fundus</p>");
        let h1 = doc.select(&Selector::parse("h1").unwrap()).next().unwrap();
        let p = doc.select(&Selector::parse("p").unwrap()).next().unwrap();
        assert_eq!(inline_text(h1), "Vogt-Koyanagi-Harada Disease");
        assert_eq!(inline_text(p), "Figure 1a: fundus");
    }
}
