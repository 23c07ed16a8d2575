use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::dedupe::{dedupe_against_store, dedupe_batch};
use crate::export;
use crate::extract::{extract_description, extract_listings};
use crate::fetch::Fetcher;
use crate::filter::{lang_accepted, partition_relevant, safe_detect};
use crate::models::{JobKey, JobRecord};

const SEARCH_URL: &str =
    "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search";
const PAGE_SIZE: u32 = 25;

pub const KEPT_EXPORT_PATH: &str = "linkedin_jobs.csv";
pub const FILTERED_EXPORT_PATH: &str = "linkedin_jobs_filtered.csv";

/// Counters for one scrape run, printed as the run summary.
#[derive(Debug, Default)]
pub struct RunReport {
    pub cards_scraped: usize,
    pub new_candidates: usize,
    pub skipped_stale: usize,
    pub kept: usize,
    pub filtered: usize,
    pub inserted_kept: usize,
    pub inserted_filtered: usize,
}

/// One full scrape: listing pages, dedup, detail pages, relevance
/// triage, persistence, CSV export. Network and database trouble is
/// logged and worked around; only configuration-level failures (a bad
/// header, an unwritable export path) abort the run.
pub fn run(config: &Config) -> Result<RunReport> {
    let started = std::time::Instant::now();
    let fetcher = Fetcher::new(config)?;
    let mut report = RunReport::default();

    let cards = collect_job_cards(&fetcher, config);
    report.cards_scraped = cards.len();

    let batch = dedupe_batch(cards);

    // Early triage on bare cards. Descriptions are still empty here, so
    // only the title and company categories can reject; the rejects are
    // dropped without a detail fetch.
    let (batch, early_rejects) = partition_relevant(batch, config);
    if !early_rejects.is_empty() {
        info!(dropped = early_rejects.len(), "dropped by card-level triage");
    }

    let db = match Database::open(Path::new(&config.db_path)) {
        Ok(db) => Some(db),
        Err(e) => {
            error!(error = %e, "cannot open database, run continues without persistence");
            None
        }
    };

    let existing = match &db {
        Some(db) => {
            let mut keys = stored_keys(db, &config.jobs_tablename);
            keys.extend(stored_keys(db, &config.filtered_jobs_tablename));
            keys
        }
        None => Vec::new(),
    };
    let batch = dedupe_against_store(batch, &existing);
    report.new_candidates = batch.len();

    let today = Local::now().date_naive();
    let cutoff = freshness_cutoff(today, config.days_to_scrape);

    let mut candidates = Vec::with_capacity(batch.len());
    for mut job in batch {
        if is_stale(&job.posting_date, cutoff) {
            report.skipped_stale += 1;
            continue;
        }
        let page = fetcher.get(&job.job_url);
        job.job_description = extract_description(page.as_ref());

        let lang = safe_detect(&job.job_description);
        if !config.languages.is_empty() && !lang_accepted(lang, &config.languages) {
            warn!(title = %job.title, language = lang.code(), "description not in an accepted language");
        }
        candidates.push(job);
    }

    let (mut kept, mut filtered) = partition_relevant(candidates, config);
    report.kept = kept.len();
    report.filtered = filtered.len();

    let stamp = Local::now().naive_local().to_string();
    for job in kept.iter_mut().chain(filtered.iter_mut()) {
        job.date_loaded = stamp.clone();
    }

    if let Some(db) = &db {
        report.inserted_kept = persist(db, &config.jobs_tablename, &kept);
        report.inserted_filtered = persist(db, &config.filtered_jobs_tablename, &filtered);
    } else {
        error!("cannot persist this run, database is unavailable");
    }

    export::write_csv(Path::new(KEPT_EXPORT_PATH), &kept)?;
    export::write_csv(Path::new(FILTERED_EXPORT_PATH), &filtered)?;

    info!(
        elapsed_secs = started.elapsed().as_secs(),
        kept = report.kept,
        filtered = report.filtered,
        "scrape finished"
    );
    Ok(report)
}

fn collect_job_cards(fetcher: &Fetcher, config: &Config) -> Vec<JobRecord> {
    let mut cards = Vec::new();
    for round in 0..config.rounds {
        for query in &config.search_queries {
            for page in 0..config.pages_to_scrape {
                let url = search_page_url(config, &query.keywords, &query.location, &query.work_type, page);
                let found = match fetcher.get(&url) {
                    Some(html) => extract_listings(&html),
                    None => Vec::new(),
                };
                info!(
                    round,
                    keywords = %query.keywords,
                    page,
                    found = found.len(),
                    "scraped listing page"
                );
                cards.extend(found);
            }
        }
    }
    cards
}

fn search_page_url(
    config: &Config,
    keywords: &str,
    location: &str,
    work_type: &str,
    page: u32,
) -> String {
    let start = (PAGE_SIZE * page).to_string();
    let params = [
        ("keywords", keywords),
        ("location", location),
        ("f_TPR", config.timespan.as_str()),
        ("f_WT", work_type),
        ("start", start.as_str()),
    ];
    match reqwest::Url::parse_with_params(SEARCH_URL, params) {
        Ok(url) => url.into(),
        Err(_) => SEARCH_URL.to_string(),
    }
}

fn freshness_cutoff(today: NaiveDate, days_to_scrape: i64) -> NaiveDate {
    today - Duration::days(days_to_scrape)
}

/// A posting is stale when its date parses and falls strictly before the
/// cutoff. The cutoff day itself is still fresh, and an unparsable date
/// is logged and let through rather than silently dropped.
fn is_stale(posting_date: &str, cutoff: NaiveDate) -> bool {
    match NaiveDate::parse_from_str(posting_date, "%Y-%m-%d") {
        Ok(date) => date < cutoff,
        Err(e) => {
            error!(posting_date, error = %e, "unparsable posting date, keeping the record");
            false
        }
    }
}

/// Keys of everything already persisted. A database that opens but will
/// not answer (e.g. a corrupt file, which sqlite only notices on the
/// first query) degrades to an empty set; the run keeps going and the
/// store dedup simply cannot drop anything.
fn stored_keys(db: &Database, table: &str) -> Vec<JobKey> {
    match db.existing_keys(table) {
        Ok(keys) => keys,
        Err(e) => {
            error!(table, error = %e, "failed to read existing keys");
            Vec::new()
        }
    }
}

fn persist(db: &Database, table: &str, records: &[JobRecord]) -> usize {
    match db.sync_table(table, records) {
        Ok(inserted) => inserted,
        Err(e) => {
            error!(table, error = %e, "failed to persist records");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobRecord;

    fn card(title: &str, company: &str, date: &str) -> JobRecord {
        JobRecord {
            title: title.to_string(),
            company: company.to_string(),
            posting_date: date.to_string(),
            job_url: format!("https://example.com/jobs/view/{title}/"),
            ..Default::default()
        }
    }

    #[test]
    fn test_freshness_boundary_is_inclusive() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let cutoff = freshness_cutoff(today, 7);
        assert_eq!(cutoff, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());

        assert!(!is_stale("2024-05-10", cutoff));
        assert!(!is_stale("2024-05-03", cutoff)); // exactly on the cutoff
        assert!(is_stale("2024-05-02", cutoff));
    }

    #[test]
    fn test_unparsable_date_is_kept() {
        let cutoff = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        assert!(!is_stale("", cutoff));
        assert!(!is_stale("last week", cutoff));
        assert!(!is_stale("2024/05/01", cutoff));
    }

    #[test]
    fn test_search_page_url_carries_query_parameters() {
        let mut config = Config::default();
        config.timespan = "r604800".to_string();
        let url = search_page_url(&config, "rust engineer", "Berlin, Germany", "2", 2);
        assert!(url.starts_with(SEARCH_URL));
        assert!(url.contains("keywords=rust+engineer"));
        assert!(url.contains("location=Berlin%2C+Germany"));
        assert!(url.contains("f_TPR=r604800"));
        assert!(url.contains("f_WT=2"));
        assert!(url.contains("start=50"));
    }

    #[test]
    fn test_triage_and_persistence_stages() {
        // The post-fetch half of a run, composed the way run() composes it.
        let mut config = Config::default();
        config.title_exclude = vec!["senior".to_string()];

        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let scraped = vec![
            card("Senior Engineer", "Acme", &today),
            card("Engineer", "Acme", &today),
            card("Engineer", "Acme", &today), // batch duplicate
        ];

        let db = Database::open_in_memory().unwrap();
        let batch = dedupe_batch(scraped);
        assert_eq!(batch.len(), 2);

        let existing = db.existing_keys(&config.jobs_tablename).unwrap();
        let batch = dedupe_against_store(batch, &existing);

        let cutoff = freshness_cutoff(Local::now().date_naive(), config.days_to_scrape);
        let fresh: Vec<_> = batch
            .into_iter()
            .filter(|job| !is_stale(&job.posting_date, cutoff))
            .collect();
        assert_eq!(fresh.len(), 2);

        let (kept, filtered) = partition_relevant(fresh, &config);
        assert_eq!(persist(&db, &config.jobs_tablename, &kept), 1);
        assert_eq!(persist(&db, &config.filtered_jobs_tablename, &filtered), 1);

        let stored = db.visible_jobs(&config.jobs_tablename).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Engineer");
    }

    #[test]
    fn test_rerun_of_same_batch_inserts_nothing() {
        let config = Config::default();
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let scraped = vec![card("Engineer", "Acme", &today)];

        let db = Database::open_in_memory().unwrap();
        assert_eq!(persist(&db, &config.jobs_tablename, &scraped), 1);

        // Second run sees the same cards again; store dedup drops them all.
        let mut existing = db.existing_keys(&config.jobs_tablename).unwrap();
        existing.extend(db.existing_keys(&config.filtered_jobs_tablename).unwrap());
        let remaining = dedupe_against_store(scraped, &existing);
        assert!(remaining.is_empty());
        assert_eq!(db.visible_jobs(&config.jobs_tablename).unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_database_degrades_to_empty_key_set() {
        // sqlite opens a garbage file without complaint and only errors on
        // the first query; the run must survive that.
        let path = std::env::temp_dir().join("prowl_corrupt_db_test.db");
        std::fs::write(&path, b"this is not a sqlite file").unwrap();
        let db = Database::open(&path).unwrap();

        assert!(stored_keys(&db, "jobs").is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_persist_failure_is_soft() {
        let db = Database::open_in_memory().unwrap();
        // An invalid table name makes the insert fail; persist reports 0
        // instead of propagating.
        assert_eq!(persist(&db, "bad\"name", &[card("Engineer", "Acme", "2024-05-01")]), 0);
    }
}
