mod ai;
mod config;
mod db;
mod dedupe;
mod export;
mod extract;
mod fetch;
mod filter;
mod models;
mod pipeline;
mod tui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use config::Config;
use db::{Database, StatusFlag};

#[derive(Parser)]
#[command(name = "prowl")]
#[command(about = "LinkedIn job scraper - collect, filter, and track postings")]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full scrape: listings, details, filters, database, CSV
    Scrape,

    /// Browse stored jobs in the interactive dashboard
    Browse,

    /// List stored jobs
    List {
        /// Maximum number of rows to print
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show one stored job in full
    Show {
        /// Job ID
        id: i64,
    },

    /// Set a triage flag on a stored job
    Mark {
        /// Job ID
        id: i64,

        /// Flag to set
        #[arg(value_enum)]
        flag: StatusFlag,
    },

    /// Generate (or print the cached) cover letter for a stored job
    CoverLetter {
        /// Job ID
        id: i64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Scrape => {
            let report = pipeline::run(&config)?;
            println!("Scrape finished.");
            println!("  Cards scraped:     {}", report.cards_scraped);
            println!("  New candidates:    {}", report.new_candidates);
            println!("  Skipped (stale):   {}", report.skipped_stale);
            println!("  Kept:              {}", report.kept);
            println!("  Filtered out:      {}", report.filtered);
            println!("  Inserted kept:     {}", report.inserted_kept);
            println!("  Inserted filtered: {}", report.inserted_filtered);
        }

        Commands::Browse => {
            let db = Database::open(Path::new(&config.db_path))?;
            tui::run_dashboard(&db, &config)?;
        }

        Commands::List { limit } => {
            let db = Database::open(Path::new(&config.db_path))?;
            let jobs = db.visible_jobs(&config.jobs_tablename)?;
            if jobs.is_empty() {
                println!("No jobs found.");
            } else {
                println!(
                    "{:<6} {:<5} {:<35} {:<25} {:<12}",
                    "ID", "FLAGS", "TITLE", "COMPANY", "DATE"
                );
                println!("{}", "-".repeat(88));
                for job in jobs.iter().take(limit) {
                    let mut flags = String::new();
                    if job.applied {
                        flags.push('a');
                    }
                    if job.interview {
                        flags.push('i');
                    }
                    if job.rejected {
                        flags.push('x');
                    }
                    println!(
                        "{:<6} {:<5} {:<35} {:<25} {:<12}",
                        job.id,
                        flags,
                        truncate(&job.title, 33),
                        truncate(&job.company, 23),
                        job.posting_date
                    );
                }
            }
        }

        Commands::Show { id } => {
            let db = Database::open(Path::new(&config.db_path))?;
            match db.get_job(&config.jobs_tablename, id)? {
                Some(job) => {
                    println!("Job #{}", job.id);
                    println!("Title: {}", job.title);
                    println!("Company: {}", job.company);
                    if !job.location.is_empty() {
                        println!("Location: {}", job.location);
                    }
                    if !job.posting_date.is_empty() {
                        println!("Posted: {}", job.posting_date);
                    }
                    if !job.job_url.is_empty() {
                        println!("URL: {}", job.job_url);
                    }
                    let mut status = Vec::new();
                    if job.applied {
                        status.push("applied");
                    }
                    if job.interview {
                        status.push("interview");
                    }
                    if job.rejected {
                        status.push("rejected");
                    }
                    if job.hidden {
                        status.push("hidden");
                    }
                    if !status.is_empty() {
                        println!("Status: {}", status.join(", "));
                    }
                    if !job.job_description.is_empty() {
                        println!("\n--- Description ---\n{}", job.job_description);
                    }
                    if let Some(letter) = &job.cover_letter {
                        if !letter.is_empty() {
                            println!("\n--- Cover Letter ---\n{}", letter);
                        }
                    }
                }
                None => {
                    println!("Job #{} not found.", id);
                }
            }
        }

        Commands::Mark { id, flag } => {
            let db = Database::open(Path::new(&config.db_path))?;
            if db.set_flag(&config.jobs_tablename, id, flag)? {
                println!("Marked job #{} as {}.", id, flag.column());
            } else {
                println!("Job #{} not found.", id);
            }
        }

        Commands::CoverLetter { id } => {
            let db = Database::open(Path::new(&config.db_path))?;
            let provider = ai::OpenAiProvider::from_config(&config)?;
            match ai::generate_cover_letter(&db, &config, &provider, id)? {
                Some(letter) => println!("{}", letter),
                None => println!("No cover letter produced for job #{}; check the log.", id),
            }
        }
    }

    Ok(())
}

/// Shorten to at most `max` characters, counted in chars so a cut never
/// lands inside a multibyte character.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate("Engineer", 10), "Engineer");
        assert_eq!(truncate("Engineer", 8), "Engineer");
    }

    #[test]
    fn test_truncate_long_string_gets_ellipsis() {
        assert_eq!(truncate("Backend Engineer", 10), "Backend...");
    }

    #[test]
    fn test_truncate_survives_multibyte_titles() {
        // A byte-indexed cut through the umlaut or the CJK text would panic.
        let title = "Entwickler für Qualitätssicherung";
        let short = truncate(title, 16);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), 16);

        let cjk = "ソフトウェアエンジニア（バックエンド）";
        let short = truncate(cjk, 10);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), 10);
    }
}
