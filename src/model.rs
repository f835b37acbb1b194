use serde::{Deserialize, Serialize};

/// One embedded image. Identity is `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub url: String,
    /// Caption text, or the alt text when the page has no caption.
    #[serde(rename = "alt", default)]
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub figure_label: Option<String>,
}

/// Parsed atlas page. Lives only between parsing and assembly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AtlasEntry {
    pub source_url: String,
    pub title: String,
    pub description: String,
    pub contributors: Vec<String>,
    pub photographers: Vec<String>,
    pub images: Vec<ImageReference>,
    /// Raw text of the page's "Category:" line, if any.
    pub page_category: Option<String>,
}
