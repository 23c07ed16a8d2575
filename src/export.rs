use anyhow::{Context, Result};
use std::path::Path;

use crate::models::JobRecord;

const HEADERS: [&str; 11] = [
    "title",
    "company",
    "location",
    "date",
    "job_url",
    "job_description",
    "applied",
    "hidden",
    "interview",
    "rejected",
    "date_loaded",
];

/// Flat-file dump of one batch, written at the end of a run. Independent
/// of the database, so a failed connection still leaves an export behind.
pub fn write_csv(path: &Path, records: &[JobRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(HEADERS)?;
    for job in records {
        writer.write_record([
            job.title.as_str(),
            job.company.as_str(),
            job.location.as_str(),
            job.posting_date.as_str(),
            job.job_url.as_str(),
            job.job_description.as_str(),
            flag(job.applied),
            flag(job.hidden),
            flag(job.interview),
            flag(job.rejected),
            job.date_loaded.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_csv_header_and_rows() {
        let path = std::env::temp_dir().join("prowl_export_test.csv");
        let records = vec![JobRecord {
            title: "Engineer".to_string(),
            company: "Acme, Inc".to_string(),
            location: "Berlin".to_string(),
            posting_date: "2024-05-01".to_string(),
            job_url: "https://example.com/jobs/view/1/".to_string(),
            job_description: "Build things.".to_string(),
            date_loaded: "2024-05-02 09:00:00".to_string(),
            ..Default::default()
        }];

        write_csv(&path, &records).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "title,company,location,date,job_url,job_description,applied,hidden,interview,rejected,date_loaded"
        );
        let row = lines.next().unwrap();
        // Comma in the company name forces quoting.
        assert!(row.contains("\"Acme, Inc\""));
        assert!(row.contains(",0,0,0,0,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_write_csv_empty_batch_still_writes_header() {
        let path = std::env::temp_dir().join("prowl_export_empty_test.csv");
        write_csv(&path, &[]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(contents.lines().count(), 1);
    }
}
