mod atlas_db;
mod cache;
mod category;
mod dataset;
mod error;
mod fetcher;
mod flashcard;
mod index;
mod model;
mod normalize;
mod parser;
mod pipeline;
mod settings;

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use cache::{CachedFetcher, EvictionPolicy, PageCache};
use category::Category;
use dataset::FlashcardDataset;
use fetcher::HttpFetcher;
use pipeline::{IndexSource, Pipeline, RunOptions};
use settings::Settings;

#[derive(Parser)]
#[command(name = "atlas_cards", about = "Scrape the EyeRounds ophthalmology atlas into flashcards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every listed entry and write the flashcard dataset
    Run {
        /// Where to enumerate entries from
        #[arg(long, value_enum, default_value = "html")]
        source: IndexSource,
        /// Only entries listed under this category (e.g. retina, neuro-op)
        #[arg(short, long)]
        category: Option<Category>,
        /// Max entries to scrape
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Concurrent page fetches
        #[arg(long)]
        concurrency: Option<usize>,
        /// Per-request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Dataset path (default: data/all_flashcards.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write one {category}_flashcards.json per category
        #[arg(long)]
        split_categories: bool,
    },
    /// List the entries the index yields
    Index {
        #[arg(long, value_enum, default_value = "html")]
        source: IndexSource,
        #[arg(short, long)]
        category: Option<Category>,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Scrape a single entry page and print its flashcard as JSON
    Entry {
        url: String,
        /// Force the card's category
        #[arg(short, long)]
        category: Option<Category>,
    },
    /// Per-category counts and consistency check of a written dataset
    Stats {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    info!(settings = ?settings, "settings loaded");

    let result = match cli.command {
        Commands::Run {
            source,
            category,
            limit,
            concurrency,
            timeout_secs,
            output,
            split_categories,
        } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&settings.output));
            let options = run_options(&settings, source, category, limit, concurrency, timeout_secs);
            let (fetcher, cache) = build_fetcher(&settings, options.timeout)?;

            println!("Scraping atlas entries from {}...", options.index_url);
            let mut pipeline = Pipeline::new(fetcher, options);
            let report = pipeline.run().await?;
            let (hits, misses) = cache.stats();
            info!(hits, misses, cached = cache.len(), policy = ?cache.policy(), "page cache");

            // Nothing is written until the whole collection is final.
            report.dataset.save(&output)?;
            let dir = output.parent().unwrap_or_else(|| Path::new("."));
            dataset::write_json_atomic(&dir.join("run_summary.json"), &report.summary)?;
            if split_categories {
                let written = report.dataset.save_by_category(dir)?;
                println!("Wrote {} category files to {}", written.len(), dir.display());
            }

            let s = &report.summary;
            println!(
                "Done: {} entries ({} succeeded, {} skipped) -> {}",
                s.enumerated,
                s.succeeded,
                s.skipped,
                output.display()
            );
            for f in &s.failures {
                println!("  [{}] {}: {}", f.stage, f.url, f.error);
            }
            Ok(())
        }
        Commands::Index { source, category, limit } => {
            let options = run_options(&settings, source, category, limit, None, None);
            let (fetcher, _) = build_fetcher(&settings, options.timeout)?;
            let entries = Pipeline::new(fetcher, options).enumerate().await?;
            for (i, e) in entries.iter().enumerate() {
                let hint = e.category_hint.as_deref().unwrap_or("-");
                let label = e.label.as_deref().unwrap_or("");
                println!(
                    "{:>4} | {:<18} | {:<7} | {:<40} | {}",
                    i + 1,
                    cell(hint, 18),
                    format!("{:?}", e.scheme),
                    cell(label, 40),
                    e.url
                );
            }
            println!("\n{} entries", entries.len());
            Ok(())
        }
        Commands::Entry { url, category } => {
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let html = pipeline::fetch_with_timeout(&fetcher, &url, settings.timeout()).await?;
            let card = pipeline::build_card(&html, &url, category, None)?;
            println!("{}", serde_json::to_string_pretty(&card)?);
            Ok(())
        }
        Commands::Stats { input } => {
            let input = input.unwrap_or_else(|| PathBuf::from(&settings.output));
            let ds = FlashcardDataset::load(&input)?;
            println!("{:<20} | {:>5}", "Category", "Cards");
            println!("{}", "-".repeat(28));
            for (category, count) in ds.category_counts() {
                println!("{:<20} | {:>5}", category, count);
            }
            println!("{}", "-".repeat(28));
            println!("{:<20} | {:>5}", "Total", ds.total);

            let problems = ds.violations();
            if problems.is_empty() {
                println!("\nDataset is consistent.");
                Ok(())
            } else {
                for p in &problems {
                    println!("  ! {}", p);
                }
                Err(anyhow::anyhow!(
                    "{} problem(s) in {}",
                    problems.len(),
                    input.display()
                ))
            }
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", elapsed_label(elapsed));
    }

    result
}

fn run_options(
    settings: &Settings,
    source: IndexSource,
    category: Option<Category>,
    limit: Option<usize>,
    concurrency: Option<usize>,
    timeout_secs: Option<u64>,
) -> RunOptions {
    let index_url = match source {
        IndexSource::Html => settings.index_url.clone(),
        IndexSource::AtlasDb => settings.db_url.clone(),
    };
    RunOptions {
        source,
        index_url,
        category,
        limit,
        concurrency: concurrency.unwrap_or(settings.concurrency).max(1),
        timeout: timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| settings.timeout()),
        progress: true,
    }
}

/// HTTP fetcher behind a page cache sized from settings.
fn build_fetcher(
    settings: &Settings,
    timeout: Duration,
) -> anyhow::Result<(Arc<CachedFetcher<HttpFetcher>>, Arc<PageCache>)> {
    let http = HttpFetcher::new(&settings.user_agent, timeout).context("building HTTP fetcher")?;
    let cache = Arc::new(PageCache::new(EvictionPolicy::from_capacity(settings.cache_capacity)));
    let fetcher = Arc::new(CachedFetcher::new(http, Arc::clone(&cache)));
    Ok((fetcher, cache))
}

/// Fit a table cell: at most `width` chars, a trailing `~` marking a cut.
fn cell(s: &str, width: usize) -> Cow<'_, str> {
    match s.char_indices().nth(width) {
        None => Cow::Borrowed(s),
        Some(_) => {
            let keep = s.char_indices().nth(width.saturating_sub(1)).map_or(0, |(i, _)| i);
            Cow::Owned(format!("{}~", &s[..keep]))
        }
    }
}

/// `4.2s`, `3m07s`, `1h02m05s`.
fn elapsed_label(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, secs % 3600 / 60, secs % 60) {
        (0, 0, _) => format!("{:.1}s", d.as_secs_f64()),
        (0, m, s) => format!("{}m{:02}s", m, s),
        (h, m, s) => format!("{}h{:02}m{:02}s", h, m, s),
    }
}
