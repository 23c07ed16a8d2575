use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One search to run against the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub keywords: String,
    pub location: String,
    /// LinkedIn work-type filter (`f_WT`): "1" on-site, "2" remote,
    /// "3" hybrid. Empty means any.
    #[serde(default, rename = "f_WT")]
    pub work_type: String,
}

/// Process-wide configuration, loaded once per run from a JSON file and
/// passed explicitly to every component. Every key has a default so a
/// sparse config file still loads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub headers: HashMap<String, String>,
    /// Scheme ("http"/"https") to proxy URL. Empty map means no proxy.
    pub proxies: HashMap<String, String>,
    pub search_queries: Vec<SearchQuery>,
    pub pages_to_scrape: u32,
    pub rounds: u32,
    /// LinkedIn time-range filter (`f_TPR`), e.g. "r604800" for past week.
    pub timespan: String,
    /// Freshness window: postings older than this many days are skipped.
    pub days_to_scrape: i64,
    pub retries: u32,
    pub retry_delay_secs: u64,
    pub desc_words: Vec<String>,
    pub title_include: Vec<String>,
    pub title_exclude: Vec<String>,
    pub company_exclude: Vec<String>,
    /// Accepted description languages as ISO 639-3 ("eng") or 639-1
    /// ("en") codes.
    pub languages: Vec<String>,
    pub db_path: String,
    pub jobs_tablename: String,
    pub filtered_jobs_tablename: String,
    #[serde(rename = "OpenAI_API_KEY")]
    pub openai_api_key: String,
    #[serde(rename = "OpenAI_Model")]
    pub openai_model: String,
    pub resume_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            proxies: HashMap::new(),
            search_queries: Vec::new(),
            pages_to_scrape: 1,
            rounds: 1,
            timespan: String::new(),
            days_to_scrape: 7,
            retries: 3,
            retry_delay_secs: 1,
            desc_words: Vec::new(),
            title_include: Vec::new(),
            title_exclude: Vec::new(),
            company_exclude: Vec::new(),
            languages: Vec::new(),
            db_path: "data/jobs.db".to_string(),
            jobs_tablename: "jobs".to_string(),
            filtered_jobs_tablename: "filtered_jobs".to_string(),
            openai_api_key: String::new(),
            openai_model: "gpt-4o".to_string(),
            resume_path: String::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}
