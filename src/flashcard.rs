use serde::{Deserialize, Serialize};
use url::Url;

use crate::category::Category;
use crate::error::ValidationError;
use crate::model::{AtlasEntry, ImageReference};

/// Delimiter between names in `contributor` / `photographer`.
pub const NAME_DELIMITER: &str = ", ";

/// One persisted study card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub contributor: String,
    pub photographer: String,
    pub source_url: String,
    pub images: Vec<ImageReference>,
}

/// Pick the card's category. An explicit choice beats the index hint,
/// which beats the page's own category line.
pub fn resolve_category(explicit: Option<Category>, hint: Option<&str>, page: Option<&str>) -> Category {
    explicit
        .or_else(|| hint.and_then(Category::classify))
        .or_else(|| page.and_then(Category::classify))
        .unwrap_or(Category::Uncategorized)
}

/// Build a card from a normalized entry.
pub fn assemble(
    entry: &AtlasEntry,
    explicit: Option<Category>,
    hint: Option<&str>,
) -> Result<Flashcard, ValidationError> {
    let title = entry.title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let id = slug_id(&entry.source_url);
    if id.is_empty() {
        return Err(ValidationError::EmptyId(entry.source_url.clone()));
    }

    Ok(Flashcard {
        id,
        category: resolve_category(explicit, hint, entry.page_category.as_deref()),
        title: title.to_string(),
        description: entry.description.clone(),
        contributor: entry.contributors.join(NAME_DELIMITER),
        photographer: entry.photographers.join(NAME_DELIMITER),
        source_url: entry.source_url.clone(),
        images: entry.images.clone(),
    })
}

/// Stable id from the entry URL's path. Host and the legacy `/eyeforum`
/// prefix are dropped so both schemes of one page share an id.
///
/// `.../eyeforum/atlas/pages/Choroidal-Hemangioma/index.htm` -> `choroidal-hemangioma`
pub fn slug_id(source_url: &str) -> String {
    let path = match Url::parse(source_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => source_url.to_string(),
    };
    let path = path.trim_start_matches('/');
    let path = path.strip_prefix("eyeforum/").unwrap_or(path);
    let path = path.strip_prefix("atlas/pages/").unwrap_or(path);
    let path = path.trim_end_matches('/');
    let path = ["/index.html", "/index.htm", ".html", ".htm"]
        .iter()
        .find_map(|suffix| path.strip_suffix(suffix))
        .unwrap_or(path);

    let mut id = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c.to_ascii_lowercase());
        } else if !id.ends_with('-') {
            id.push('-');
        }
    }
    id.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_entry;
    use crate::parser::parse_entry;

    fn entry() -> AtlasEntry {
        AtlasEntry {
            source_url: "https://eyerounds.org/atlas/pages/VKH/index.htm".into(),
            title: "Vogt-Koyanagi-Harada Disease".into(),
            description: "Bilateral granulomatous panuveitis.".into(),
            contributors: vec!["A. Smith".into(), "B. Jones".into()],
            photographers: vec![],
            images: vec![],
            page_category: Some("Uveitis".into()),
        }
    }

    #[test]
    fn slugs() {
        assert_eq!(slug_id("https://eyerounds.org/atlas/pages/VKH/index.htm"), "vkh");
        assert_eq!(
            slug_id("https://webeye.ophth.uiowa.edu/eyeforum/atlas/pages/Choroidal-Hemangioma/index.htm"),
            "choroidal-hemangioma"
        );
        assert_eq!(
            slug_id("https://eyerounds.org/atlas/pages/leukemic_pseudohypopyon.htm"),
            "leukemic-pseudohypopyon"
        );
        assert_eq!(slug_id("https://eyerounds.org/atlas/pages/a/b/"), "a-b");
        assert_eq!(slug_id("https://eyerounds.org/"), "");
    }

    #[test]
    fn names_joined_in_order() {
        let card = assemble(&entry(), None, None).unwrap();
        assert_eq!(card.contributor, "A. Smith, B. Jones");
        assert_eq!(card.photographer, "");
        assert_eq!(card.category, Category::Uveitis);
        assert_eq!(card.id, "vkh");
    }

    #[test]
    fn category_precedence() {
        assert_eq!(
            resolve_category(Some(Category::Cornea), Some("Retina"), Some("Uveitis")),
            Category::Cornea
        );
        assert_eq!(resolve_category(None, Some("Retina"), Some("Uveitis")), Category::Retina);
        assert_eq!(resolve_category(None, Some("nonsense"), Some("Uveitis")), Category::Uveitis);
        assert_eq!(resolve_category(None, None, None), Category::Uncategorized);
    }

    #[test]
    fn empty_title_rejected() {
        let mut e = entry();
        e.title = "  ".into();
        assert_eq!(assemble(&e, None, None), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn underivable_id_rejected() {
        let mut e = entry();
        e.source_url = "https://eyerounds.org/atlas/pages/".into();
        assert!(matches!(assemble(&e, None, None), Err(ValidationError::EmptyId(_))));
    }

    #[test]
    fn page_without_images_kept() {
        let html = std::fs::read_to_string("tests/fixtures/no_images.html").unwrap();
        let url = "https://eyerounds.org/atlas/pages/corneal-abrasion/index.htm";
        let parsed = normalize_entry(&parse_entry(&html, url).unwrap());
        let card = assemble(&parsed, None, Some("Cornea")).unwrap();
        assert!(card.images.is_empty());
        assert_eq!(card.id, "corneal-abrasion");
        assert_eq!(card.category, Category::Cornea);
    }

    #[test]
    fn contributor_line_end_to_end() {
        let html = std::fs::read_to_string("tests/fixtures/current_entry.html").unwrap();
        let url = "https://eyerounds.org/atlas/pages/vogt-koyanagi-harada/index.htm";
        let build = || {
            let parsed = normalize_entry(&parse_entry(&html, url).unwrap());
            assemble(&parsed, None, None).unwrap()
        };
        let card = build();
        assert_eq!(card.contributor, "A. Smith, B. Jones");
        assert_eq!(card.photographer, "Ralph Ford");
        assert_eq!(card.category, Category::Uveitis);
        assert_eq!(card.images.len(), 2);
        assert_eq!(card, build());
    }

    #[test]
    fn json_field_names() {
        let card = assemble(&entry(), Some(Category::NeuroOp), None).unwrap();
        let v = serde_json::to_value(&card).unwrap();
        let keys: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
        for k in ["id", "category", "title", "description", "contributor", "photographer", "source_url", "images"] {
            assert!(keys.contains(&k.to_string()), "missing {}", k);
        }
        assert_eq!(v["category"], "NEURO-OP");
    }
}
