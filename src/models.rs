use serde::{Deserialize, Serialize};

/// One observed job posting, as scraped. The description stays empty until
/// the detail-fetch phase fills it in; `date_loaded` is stamped just before
/// persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    /// ISO `YYYY-MM-DD`, empty when the card had no date element.
    /// Persisted and exported under the column name `date`.
    #[serde(rename = "date")]
    pub posting_date: String,
    pub job_url: String,
    pub job_description: String,
    pub applied: bool,
    pub hidden: bool,
    pub interview: bool,
    pub rejected: bool,
    pub date_loaded: String,
}

impl JobRecord {
    /// Intra-batch duplicate key.
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.title, &self.company)
    }
}

/// A persisted row, as the dashboard and cover-letter flow see it.
#[derive(Debug, Clone)]
pub struct StoredJob {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub posting_date: String,
    pub job_url: String,
    pub job_description: String,
    pub applied: bool,
    pub hidden: bool,
    pub interview: bool,
    pub rejected: bool,
    pub cover_letter: Option<String>,
}

/// Identity of a persisted row, used for cross-run duplicate suppression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobKey {
    pub job_url: String,
    pub title: String,
    pub company: String,
    pub posting_date: String,
}

impl JobKey {
    /// A candidate is "already known" when its non-empty URL matches, or the
    /// whole (title, company, date) triple does.
    pub fn matches(&self, job: &JobRecord) -> bool {
        (!job.job_url.is_empty() && self.job_url == job.job_url)
            || (self.title == job.title
                && self.company == job.company
                && self.posting_date == job.posting_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, company: &str, date: &str, url: &str) -> JobRecord {
        JobRecord {
            title: title.to_string(),
            company: company.to_string(),
            posting_date: date.to_string(),
            job_url: url.to_string(),
            ..Default::default()
        }
    }

    fn key(title: &str, company: &str, date: &str, url: &str) -> JobKey {
        JobKey {
            job_url: url.to_string(),
            title: title.to_string(),
            company: company.to_string(),
            posting_date: date.to_string(),
        }
    }

    #[test]
    fn test_key_matches_on_url() {
        let k = key("Old Title", "Old Co", "2024-01-01", "https://example.com/jobs/view/1/");
        let job = record("New Title", "New Co", "2024-02-02", "https://example.com/jobs/view/1/");
        assert!(k.matches(&job));
    }

    #[test]
    fn test_key_matches_on_triple() {
        let k = key("Engineer", "Acme", "2024-01-01", "https://example.com/jobs/view/1/");
        let job = record("Engineer", "Acme", "2024-01-01", "");
        assert!(k.matches(&job));
    }

    #[test]
    fn test_empty_urls_do_not_match_each_other() {
        // Two unrelated postings that both lack a URL are not duplicates.
        let k = key("Engineer", "Acme", "2024-01-01", "");
        let job = record("Analyst", "Globex", "2024-03-03", "");
        assert!(!k.matches(&job));
    }

    #[test]
    fn test_partial_triple_is_not_a_match() {
        let k = key("Engineer", "Acme", "2024-01-01", "https://example.com/jobs/view/1/");
        let job = record("Engineer", "Acme", "2024-01-02", "https://example.com/jobs/view/2/");
        assert!(!k.matches(&job));
    }
}
