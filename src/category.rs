use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed atlas category enumeration. `Uncategorized` is the sentinel for
/// entries with no recognizable category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "RETINA")]
    Retina,
    #[serde(rename = "GLAUCOMA")]
    Glaucoma,
    #[serde(rename = "CORNEA")]
    Cornea,
    #[serde(rename = "CATARACT")]
    Cataract,
    #[serde(rename = "UVEITIS")]
    Uveitis,
    #[serde(rename = "OCULOPLASTICS")]
    Oculoplastics,
    #[serde(rename = "NEURO-OP")]
    NeuroOp,
    #[serde(rename = "TRAUMA")]
    Trauma,
    #[serde(rename = "PATHOLOGY")]
    Pathology,
    #[serde(rename = "VITREOUS")]
    Vitreous,
    #[serde(rename = "IRIS")]
    Iris,
    #[serde(rename = "LENS")]
    Lens,
    #[serde(rename = "EXTERNAL DISEASE")]
    ExternalDisease,
    #[serde(rename = "CONTACT LENS")]
    ContactLens,
    #[serde(rename = "GENETICS")]
    Genetics,
    #[serde(rename = "INHERITED DISEASE")]
    InheritedDisease,
    #[serde(rename = "SYSTEMS")]
    Systems,
    #[serde(rename = "UNCATEGORIZED")]
    Uncategorized,
}

pub const ALL: &[Category] = &[
    Category::Retina,
    Category::Glaucoma,
    Category::Cornea,
    Category::Cataract,
    Category::Uveitis,
    Category::Oculoplastics,
    Category::NeuroOp,
    Category::Trauma,
    Category::Pathology,
    Category::Vitreous,
    Category::Iris,
    Category::Lens,
    Category::ExternalDisease,
    Category::ContactLens,
    Category::Genetics,
    Category::InheritedDisease,
    Category::Systems,
];

// Order matters: "contact lens" before "lens", "inherited" before "genetic".
const KEYWORDS: &[(&str, Category)] = &[
    ("retina", Category::Retina),
    ("vitreous", Category::Vitreous),
    ("glaucoma", Category::Glaucoma),
    ("cornea", Category::Cornea),
    ("cataract", Category::Cataract),
    ("uveitis", Category::Uveitis),
    ("oculoplastic", Category::Oculoplastics),
    ("orbit", Category::Oculoplastics),
    ("neuro", Category::NeuroOp),
    ("trauma", Category::Trauma),
    ("pathology", Category::Pathology),
    ("iris", Category::Iris),
    ("contact lens", Category::ContactLens),
    ("lens", Category::Lens),
    ("external", Category::ExternalDisease),
    ("inherited", Category::InheritedDisease),
    ("genetic", Category::Genetics),
    ("system", Category::Systems),
];

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Retina => "RETINA",
            Category::Glaucoma => "GLAUCOMA",
            Category::Cornea => "CORNEA",
            Category::Cataract => "CATARACT",
            Category::Uveitis => "UVEITIS",
            Category::Oculoplastics => "OCULOPLASTICS",
            Category::NeuroOp => "NEURO-OP",
            Category::Trauma => "TRAUMA",
            Category::Pathology => "PATHOLOGY",
            Category::Vitreous => "VITREOUS",
            Category::Iris => "IRIS",
            Category::Lens => "LENS",
            Category::ExternalDisease => "EXTERNAL DISEASE",
            Category::ContactLens => "CONTACT LENS",
            Category::Genetics => "GENETICS",
            Category::InheritedDisease => "INHERITED DISEASE",
            Category::Systems => "SYSTEMS",
            Category::Uncategorized => "UNCATEGORIZED",
        }
    }

    /// File-name friendly form: "NEURO-OP" -> "neuro_op".
    pub fn file_slug(&self) -> String {
        self.as_str().to_lowercase().replace([' ', '-'], "_")
    }

    /// Map free text (an index hint or a page's category line) onto the
    /// enumeration. Exact names win over keyword matches.
    pub fn classify(text: &str) -> Option<Category> {
        let upper = text.trim().to_uppercase();
        if upper.is_empty() {
            return None;
        }
        if let Some(c) = ALL.iter().find(|c| c.as_str() == upper) {
            return Some(*c);
        }
        let lower = upper.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(kw, _)| lower.contains(kw))
            .map(|(_, c)| *c)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase().replace('_', " ");
        if upper == "UNCATEGORIZED" {
            return Ok(Category::Uncategorized);
        }
        ALL.iter()
            .find(|c| c.as_str() == upper || c.as_str().replace('-', " ") == upper)
            .copied()
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_names() {
        for c in ALL {
            assert_eq!(Category::classify(c.as_str()), Some(*c));
            assert_eq!(Category::classify(&c.as_str().to_lowercase()), Some(*c));
        }
    }

    #[test]
    fn keyword_mapping() {
        assert_eq!(Category::classify("Retina & Vitreous"), Some(Category::Retina));
        assert_eq!(Category::classify("Orbit, Eyelids"), Some(Category::Oculoplastics));
        assert_eq!(Category::classify("Neuro-ophthalmology"), Some(Category::NeuroOp));
        assert_eq!(Category::classify("contact lenses"), Some(Category::ContactLens));
        assert_eq!(Category::classify("Inherited Retinal Disease"), Some(Category::Retina));
        assert_eq!(Category::classify("inherited disorders"), Some(Category::InheritedDisease));
        assert_eq!(Category::classify("Systemic disease"), Some(Category::Systems));
        assert_eq!(Category::classify("   "), None);
        assert_eq!(Category::classify("navigation"), None);
    }

    #[test]
    fn serde_names() {
        let json = serde_json::to_string(&Category::ExternalDisease).unwrap();
        assert_eq!(json, "\"EXTERNAL DISEASE\"");
        let back: Category = serde_json::from_str("\"NEURO-OP\"").unwrap();
        assert_eq!(back, Category::NeuroOp);
        let s = serde_json::to_string(&Category::Uncategorized).unwrap();
        assert_eq!(s, "\"UNCATEGORIZED\"");
    }

    #[test]
    fn parse_cli_values() {
        assert_eq!("retina".parse::<Category>(), Ok(Category::Retina));
        assert_eq!("neuro-op".parse::<Category>(), Ok(Category::NeuroOp));
        assert_eq!("neuro op".parse::<Category>(), Ok(Category::NeuroOp));
        assert_eq!("external_disease".parse::<Category>(), Ok(Category::ExternalDisease));
        assert!("optics".parse::<Category>().is_err());
    }

    #[test]
    fn file_slugs() {
        assert_eq!(Category::NeuroOp.file_slug(), "neuro_op");
        assert_eq!(Category::ContactLens.file_slug(), "contact_lens");
    }
}
