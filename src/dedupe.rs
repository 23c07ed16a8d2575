use crate::models::{JobKey, JobRecord};

/// Intra-batch duplicate removal: same (title, company). The sort key
/// extends to the posting date and URL so the survivor of an equal-key
/// run is decided by the record contents, never by scrape order.
pub fn dedupe_batch(mut records: Vec<JobRecord>) -> Vec<JobRecord> {
    records.sort_by(|a, b| {
        (a.dedup_key(), &a.posting_date, &a.job_url)
            .cmp(&(b.dedup_key(), &b.posting_date, &b.job_url))
    });
    records.dedup_by(|a, b| a.dedup_key() == b.dedup_key());
    records
}

/// Cross-run duplicate removal: drop anything either persisted table
/// already knows, by URL or by the (title, company, date) triple. An
/// empty key set (no tables yet) drops nothing.
pub fn dedupe_against_store(records: Vec<JobRecord>, existing: &[JobKey]) -> Vec<JobRecord> {
    records
        .into_iter()
        .filter(|job| !existing.iter().any(|key| key.matches(job)))
        .collect()
}
