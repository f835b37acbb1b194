use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::atlas_db::parse_atlas_db;
use crate::category::Category;
use crate::dataset::FlashcardDataset;
use crate::error::{EntryError, FetchError, ValidationError};
use crate::fetcher::PageFetcher;
use crate::flashcard::{assemble, Flashcard};
use crate::index::{IndexEntry, IndexListing};
use crate::normalize::normalize_entry;
use crate::parser::parse_entry;

/// Where the list of entries comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum IndexSource {
    /// The atlas HTML listing page.
    Html,
    /// The atlas JavaScript database script.
    AtlasDb,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: IndexSource,
    /// URL of the listing page or database script, per `source`.
    pub index_url: String,
    /// Keep only entries whose index hint maps to this category.
    pub category: Option<Category>,
    pub limit: Option<usize>,
    pub concurrency: usize,
    pub timeout: Duration,
    pub progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    FetchingIndex,
    EnumeratingEntries,
    FetchingEntries,
    Processing,
    Finalizing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    pub url: String,
    pub stage: &'static str,
    pub error: String,
}

/// Written next to the dataset after every run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub enumerated: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failures: Vec<EntryFailure>,
}

pub struct RunReport {
    pub dataset: FlashcardDataset,
    pub summary: RunSummary,
}

/// One scrape run. Per-entry failures are recorded in the summary; only a
/// listing that cannot be fetched or parsed aborts the run.
pub struct Pipeline<F> {
    fetcher: Arc<F>,
    options: RunOptions,
    state: RunState,
}

impl<F: PageFetcher + 'static> Pipeline<F> {
    pub fn new(fetcher: Arc<F>, options: RunOptions) -> Self {
        Self {
            fetcher,
            options,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }

    pub async fn run(&mut self) -> Result<RunReport> {
        let started_at = Utc::now();
        let entries = self.enumerate().await?;
        let enumerated = entries.len();
        info!(enumerated, source = ?self.options.source, "enumerated entries");

        let fetched = self.fetch_all(&entries).await;
        let outcomes = self.process(entries, fetched).await?;

        self.transition(RunState::Finalizing);
        let mut seen = HashSet::new();
        let mut cards = Vec::new();
        let mut failures = Vec::new();
        // Outcomes are in index order, so the first page claiming an id keeps it.
        for (url, outcome) in outcomes {
            let outcome = outcome.and_then(|card| {
                if seen.insert(card.id.clone()) {
                    Ok(card)
                } else {
                    Err(ValidationError::DuplicateId(card.id).into())
                }
            });
            match outcome {
                Ok(card) => cards.push(card),
                Err(e) => {
                    warn!(url = %url, stage = e.stage(), error = %e, "entry skipped");
                    failures.push(EntryFailure {
                        url,
                        stage: e.stage(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let dataset = FlashcardDataset::from_cards(cards);
        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            enumerated,
            succeeded: dataset.total,
            skipped: failures.len(),
            failures,
        };
        self.transition(RunState::Done);
        Ok(RunReport { dataset, summary })
    }

    /// Fetch and parse the listing, then apply the category filter and limit.
    pub async fn enumerate(&mut self) -> Result<Vec<IndexEntry>> {
        self.transition(RunState::FetchingIndex);
        let url = self.options.index_url.clone();
        let body = fetch_with_timeout(self.fetcher.as_ref(), &url, self.options.timeout)
            .await
            .with_context(|| format!("fetching index {}", url))?;

        self.transition(RunState::EnumeratingEntries);
        let listing = match self.options.source {
            IndexSource::Html => IndexListing::from_html(&body, &url),
            IndexSource::AtlasDb => parse_atlas_db(&body),
        }
        .with_context(|| format!("parsing index {}", url))?;
        debug!(links = listing.raw_link_count(), "index parsed");

        let wanted = self.options.category;
        let entries = listing
            .entries()
            .filter(|e| wanted.is_none() || e.hinted_category() == wanted)
            .take(self.options.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(entries)
    }

    /// Fetch every entry concurrently. The result vector lines up with
    /// `entries`, whatever order the responses arrive in.
    async fn fetch_all(&mut self, entries: &[IndexEntry]) -> Vec<Result<String, FetchError>> {
        self.transition(RunState::FetchingEntries);
        let concurrency = self.options.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let pb = self.progress_bar(entries.len());

        let (tx, mut rx) = mpsc::channel::<(usize, Result<String, FetchError>)>(concurrency * 2);
        for (i, entry) in entries.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();
            let url = entry.url.clone();
            let timeout = self.options.timeout;

            tokio::spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return;
                };
                let result = fetch_with_timeout(fetcher.as_ref(), &url, timeout).await;
                let _ = tx.send((i, result)).await;
            });
        }
        drop(tx);

        let mut results: Vec<Option<Result<String, FetchError>>> = vec![None; entries.len()];
        while let Some((i, result)) = rx.recv().await {
            if let Err(e) = &result {
                debug!(error = %e, "fetch failed");
            }
            results[i] = Some(result);
            pb.inc(1);
        }
        pb.finish_and_clear();

        results
            .into_iter()
            .zip(entries)
            .map(|(r, entry)| {
                r.unwrap_or_else(|| {
                    Err(FetchError::Network {
                        url: entry.url.clone(),
                        reason: "fetch task ended without a result".into(),
                    })
                })
            })
            .collect()
    }

    /// Parse, normalize and assemble on the rayon pool.
    async fn process(
        &mut self,
        entries: Vec<IndexEntry>,
        fetched: Vec<Result<String, FetchError>>,
    ) -> Result<Vec<(String, Result<Flashcard, EntryError>)>> {
        self.transition(RunState::Processing);
        tokio::task::spawn_blocking(move || -> Vec<(String, Result<Flashcard, EntryError>)> {
            entries
                .into_par_iter()
                .zip(fetched)
                .map(|(entry, page)| {
                    let outcome = page
                        .map_err(EntryError::from)
                        .and_then(|html| build_card(&html, &entry.url, None, entry.category_hint.as_deref()));
                    (entry.url, outcome)
                })
                .collect()
        })
        .await
        .context("entry processing panicked")
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }
}

/// One fetch attempt bounded by `timeout`.
pub async fn fetch_with_timeout<F: PageFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            after: timeout,
        }),
    }
}

/// Markup to card: parse, normalize, assemble.
pub fn build_card(
    html: &str,
    url: &str,
    explicit: Option<Category>,
    hint: Option<&str>,
) -> Result<Flashcard, EntryError> {
    let entry = normalize_entry(&parse_entry(html, url)?);
    Ok(assemble(&entry, explicit, hint)?)
}
