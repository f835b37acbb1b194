//! The atlas also ships its catalogue as a JavaScript array
//! (`linkInformationDB = [ {name: '...', src: '...', cat: [...]}, ... ]`).
//! This reads that array into an [`IndexListing`] without a JS engine.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::index::{IndexListing, RawLink};

pub const ATLAS_DB_BASE: &str = "https://eyerounds.org/atlas/";
const DB_MARKER: &str = "linkInformationDB";

static SRC_RE: LazyLock<Regex> = LazyLock::new(|| field_re("src"));
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| field_re("title"));
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| field_re("name"));
static CAT_ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\bcat\s*:\s*\[(.*?)\]").unwrap());
static CAT_SCALAR_RE: LazyLock<Regex> = LazyLock::new(|| field_re("cat"));
static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)""#).unwrap());

fn field_re(field: &str) -> Regex {
    Regex::new(&format!(
        r#"\b{}\s*:\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")"#,
        field
    ))
    .unwrap()
}

/// Build a listing from the atlas database script.
pub fn parse_atlas_db(js: &str) -> Result<IndexListing, ParseError> {
    let objects = top_level_objects(js)?;
    let links = objects
        .iter()
        .filter_map(|obj| {
            let href = quoted_field(&SRC_RE, obj)?;
            let hint = first_category(obj);
            let label = quoted_field(&TITLE_RE, obj).or_else(|| quoted_field(&NAME_RE, obj));
            Some(RawLink { href, hint, label })
        })
        .collect();
    IndexListing::from_raw(ATLAS_DB_BASE, links)
}

/// Slice out each `{...}` sitting directly inside the database array,
/// skipping over quoted strings so braces inside text do not count.
fn top_level_objects(js: &str) -> Result<Vec<&str>, ParseError> {
    let marker = js.find(DB_MARKER).ok_or(ParseError::MissingField(DB_MARKER))?;
    let open = js[marker..]
        .find('[')
        .map(|i| marker + i)
        .ok_or(ParseError::MissingField(DB_MARKER))?;

    let bytes = js.as_bytes();
    let mut objects = Vec::new();
    let mut brackets = 0i32;
    let mut braces = 0i32;
    let mut start = None;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            q @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() && bytes[i] != q {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'[' => brackets += 1,
            b']' => {
                brackets -= 1;
                if brackets == 0 {
                    break;
                }
            }
            b'{' => {
                if braces == 0 && brackets == 1 {
                    start = Some(i);
                }
                braces += 1;
            }
            b'}' => {
                braces -= 1;
                if braces == 0 && brackets == 1 {
                    if let Some(s) = start.take() {
                        objects.push(&js[s..=i]);
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    Ok(objects)
}

fn quoted_field(re: &Regex, obj: &str) -> Option<String> {
    let caps = re.captures(obj)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
    Some(unescape(raw)).filter(|s| !s.trim().is_empty())
}

fn first_category(obj: &str) -> Option<String> {
    if let Some(caps) = CAT_ARRAY_RE.captures(obj) {
        return QUOTED_RE
            .captures_iter(&caps[1])
            .filter_map(|c| c.get(1).or_else(|| c.get(2)).map(|m| unescape(m.as_str())))
            .find(|s| !s.trim().is_empty());
    }
    quoted_field(&CAT_SCALAR_RE, obj)
}

fn unescape(s: &str) -> String {
    s.replace("\\'", "'").replace("\\\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    const DB: &str = r#"
var revision = 22;
var linkInformationDB = [
  {name: 'APMPPE', imgSrc: 'thumbs/apmppe.jpg', src: 'pages/apmppe/index.htm',
   title: 'Acute posterior multifocal placoid pigment epitheliopathy', year: '2012', cat: ['Retina', 'Uveitis']},
  {name: "Brace { inside }", src: "pages/brace-test/index.htm", cat: "Glaucoma", keyWords: 'angle [closure]'},
  {name: 'No link here', cat: ['Cornea']},
  {name: 'Zeiss\'s lens', src: 'pages/lens-coloboma.htm', numImg: 3},
  {name: 'Duplicate', src: 'pages/apmppe/index.htm', cat: []}
];
function unrelated() { return [1, 2, 3]; }
"#;

    #[test]
    fn reads_entries_in_order() {
        let listing = parse_atlas_db(DB).unwrap();
        let entries: Vec<_> = listing.entries().collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].url, "https://eyerounds.org/atlas/pages/apmppe/index.htm");
        assert_eq!(entries[0].hinted_category(), Some(Category::Retina));
        assert_eq!(
            entries[0].label.as_deref(),
            Some("Acute posterior multifocal placoid pigment epitheliopathy")
        );
        assert_eq!(entries[1].url, "https://eyerounds.org/atlas/pages/brace-test/index.htm");
        assert_eq!(entries[1].hinted_category(), Some(Category::Glaucoma));
        assert_eq!(entries[2].label.as_deref(), Some("Zeiss's lens"));
        assert_eq!(entries[2].category_hint, None);
    }

    #[test]
    fn missing_database() {
        let err = parse_atlas_db("var somethingElse = [];").unwrap_err();
        assert_eq!(err, ParseError::MissingField("linkInformationDB"));
    }

    #[test]
    fn database_without_links() {
        let err = parse_atlas_db("linkInformationDB = [{name: 'x'}];").unwrap_err();
        assert_eq!(err, ParseError::EmptyIndex);
    }
}
