use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::category::Category;
use crate::flashcard::Flashcard;

/// The persisted root document handed to the review front-ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardDataset {
    pub total: usize,
    pub categories: BTreeSet<Category>,
    pub flashcards: Vec<Flashcard>,
}

/// One `{slug}_flashcards.json` file.
#[derive(Debug, Serialize)]
struct CategoryFile<'a> {
    category: Category,
    count: usize,
    flashcards: Vec<&'a Flashcard>,
}

impl FlashcardDataset {
    /// `total` and `categories` are computed here, so they always agree
    /// with `flashcards`.
    pub fn from_cards(flashcards: Vec<Flashcard>) -> Self {
        Self {
            total: flashcards.len(),
            categories: flashcards.iter().map(|c| c.category).collect(),
            flashcards,
        }
    }

    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for card in &self.flashcards {
            *counts.entry(card.category).or_insert(0) += 1;
        }
        counts
    }

    /// Human-readable list of broken invariants; empty when the dataset is
    /// consistent.
    pub fn violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.total != self.flashcards.len() {
            problems.push(format!(
                "total is {} but there are {} flashcards",
                self.total,
                self.flashcards.len()
            ));
        }
        let present: BTreeSet<Category> = self.flashcards.iter().map(|c| c.category).collect();
        if present != self.categories {
            problems.push(format!(
                "categories {:?} do not match categories present {:?}",
                self.categories, present
            ));
        }
        let mut ids = HashSet::new();
        for card in &self.flashcards {
            if !ids.insert(card.id.as_str()) {
                problems.push(format!("duplicate id `{}`", card.id));
            }
            let mut urls = HashSet::new();
            for img in &card.images {
                if !urls.insert(img.url.as_str()) {
                    problems.push(format!("card `{}` repeats image {}", card.id, img.url));
                }
            }
        }
        problems
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)?;
        info!(path = %path.display(), total = self.total, "wrote dataset");
        Ok(())
    }

    /// Write one file per category into `dir`. Returns the paths written.
    pub fn save_by_category(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut by_category: BTreeMap<Category, Vec<&Flashcard>> = BTreeMap::new();
        for card in &self.flashcards {
            by_category.entry(card.category).or_default().push(card);
        }
        let mut written = Vec::with_capacity(by_category.len());
        for (category, flashcards) in by_category {
            let path = dir.join(format!("{}_flashcards.json", category.file_slug()));
            let file = CategoryFile {
                category,
                count: flashcards.len(),
                flashcards,
            };
            write_json_atomic(&path, &file)?;
            debug!(path = %path.display(), count = file.count, "wrote category file");
            written.push(path);
        }
        Ok(written)
    }
}

/// Serialize to a sibling temp file, then rename over `path`. A reader
/// never sees a half-written document.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("renaming {} to {}", tmp.display(), path.display()))?;
    Ok(())
}
