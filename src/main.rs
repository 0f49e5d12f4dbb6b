mod db;
mod fetcher;
mod parser;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;

use settings::{game_id, Settings};

#[derive(Parser)]
#[command(name = "jarchive_scraper", about = "J! Archive game board scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue game URLs (arguments, else MORPH_START_URLS, else built-in list)
    Init {
        /// Game URLs or bare game ids
        sources: Vec<String>,
    },
    /// Fetch queued games that have not been visited
    Scrape {
        /// Max games to fetch (default: all unvisited)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Extract clues from fetched pages and save them
    Process {
        /// Max pages to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Init + scrape + process in one pipeline
    Run {
        /// Game URLs or bare game ids
        sources: Vec<String>,
        /// Max games to fetch
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Extract clues from a saved page (or fetch --url) and print JSON lines
    Extract {
        /// Saved HTML file
        file: Option<PathBuf>,
        /// Source URL to tag records with; fetched when no file is given
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Show scraping statistics
    Stats,
    /// Stored clues table
    Overview {
        /// Filter by round ("Jeopardy!", "Double Jeopardy!", "Final Jeopardy!")
        #[arg(short, long)]
        round: Option<String>,
        /// Filter by game URL
        #[arg(short, long)]
        game: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
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
    let settings = Settings::from_env()?;

    let result = match cli.command {
        Commands::Init { sources } => {
            let settings = settings.with_sources(&sources);
            let conn = open(&settings)?;
            let inserted = queue_sources(&conn, &settings)?;
            println!(
                "Queued {} new games ({} sources configured)",
                inserted,
                settings.sources.len()
            );
            Ok(())
        }
        Commands::Scrape { limit } => {
            let conn = open(&settings)?;
            let games = db::fetch_unvisited(&conn, limit)?;
            if games.is_empty() {
                println!("No unvisited games. Run 'init' first or all games are fetched.");
                return Ok(());
            }
            println!("Fetching {} games (streaming to DB)...", games.len());
            let stats = fetcher::fetch_games_streaming(&conn, games, settings.concurrency).await?;
            println!(
                "Done: {} fetched ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = open(&settings)?;
            let pages = db::fetch_unprocessed(&conn, limit)?;
            if pages.is_empty() {
                println!("No unprocessed pages. Run 'scrape' first.");
                return Ok(());
            }
            println!("Processing {} pages...", pages.len());
            let counts = process_pages(&conn, &pages)?;
            counts.print();
            Ok(())
        }
        Commands::Run { sources, limit } => {
            let settings = settings.with_sources(&sources);
            let conn = open(&settings)?;
            queue_sources(&conn, &settings)?;

            let games = db::fetch_unvisited(&conn, limit)?;
            if !games.is_empty() {
                let t_fetch = Instant::now();
                println!("Pipeline: fetching {} games (streaming to DB)...", games.len());
                let stats =
                    fetcher::fetch_games_streaming(&conn, games, settings.concurrency).await?;
                println!(
                    "Fetched {} games ({} ok, {} errors) in {:.1}s",
                    stats.total,
                    stats.ok,
                    stats.errors,
                    t_fetch.elapsed().as_secs_f64()
                );
            }

            let t_process = Instant::now();
            let pages = db::fetch_unprocessed(&conn, None)?;
            if pages.is_empty() {
                println!("Nothing to process.");
                return Ok(());
            }
            println!("Processing {} pages...", pages.len());
            let counts = process_pages(&conn, &pages)?;
            println!("Processed in {:.1}s", t_process.elapsed().as_secs_f64());
            counts.print();
            Ok(())
        }
        Commands::Extract { file, url } => extract_offline(file, url).await,
        Commands::Stats => {
            let conn = open(&settings)?;
            let s = db::get_stats(&conn)?;
            println!("Games:         {}", s.total);
            println!("Visited:       {}", s.visited);
            println!("Unvisited:     {}", s.unvisited);
            println!("Fetched:       {}", s.fetched);
            println!("Errors:        {}", s.errors);
            println!("Processed:     {}", s.processed);
            println!("Clues:         {}", s.clues);
            println!("Daily doubles: {}", s.daily_doubles);
            Ok(())
        }
        Commands::Overview { round, game, limit } => {
            let conn = open(&settings)?;
            let rows = db::fetch_overview(&conn, round.as_deref(), game.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No clues found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<16} | {:<20} | {:<12} | {:<2} | {:<40} | {:<24}",
                "#", "Round", "Category", "Value", "DD", "Question", "Answer"
            );
            println!("{}", "-".repeat(135));

            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<16} | {:<20} | {:<12} | {:<2} | {:<40} | {:<24}",
                    i + 1,
                    r.round,
                    truncate(&r.category, 20),
                    r.value,
                    if r.is_daily_double { "*" } else { "" },
                    truncate(&r.question, 40),
                    truncate(&r.answer, 24)
                );
            }

            println!("\n{} clues", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open(settings: &Settings) -> anyhow::Result<Connection> {
    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

fn queue_sources(conn: &Connection, settings: &Settings) -> anyhow::Result<usize> {
    let games: Vec<(String, Option<String>)> = settings
        .sources
        .iter()
        .map(|url| (url.clone(), game_id(url)))
        .collect();
    let inserted = db::insert_games(conn, &games)?;
    info!("Queued {} new of {} configured games", inserted, games.len());
    Ok(inserted)
}

async fn extract_offline(file: Option<PathBuf>, url: Option<String>) -> anyhow::Result<()> {
    let (html, source) = match (file, url) {
        (Some(path), url) => {
            let html = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            let source = url.unwrap_or_else(|| path.display().to_string());
            (html, source)
        }
        (None, Some(url)) => (fetcher::fetch_single_page(&url).await?, url),
        (None, None) => anyhow::bail!("Give a saved page or --url"),
    };

    let document = parser::document::Document::parse(&html);
    let records = parser::extract::extract(&document, &source);
    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    info!("Extracted {} clues from {}", records.len(), source);
    Ok(())
}

struct ProcessCounts {
    pages: usize,
    clues: usize,
    daily_doubles: usize,
    empty: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} clues ({} daily doubles) from {} pages, {} pages had no clues.",
            self.clues, self.daily_doubles, self.pages, self.empty,
        );
    }
}

fn process_pages(conn: &Connection, pages: &[db::FetchedPage]) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        pages: 0,
        clues: 0,
        daily_doubles: 0,
        empty: 0,
    };

    for chunk in pages.chunks(100) {
        let results: Vec<_> = chunk.par_iter().map(parser::process_page).collect();

        for page in results {
            db::save_clues(conn, page.page_id, page.title.as_deref(), &page.clues)?;
            info!("Saved {} clues from {}", page.clues.len(), page.url);
            counts.pages += 1;
            counts.clues += page.clues.len();
            counts.daily_doubles += page.clues.iter().filter(|c| c.is_daily_double).count();
            if page.clues.is_empty() {
                counts.empty += 1;
            }
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
