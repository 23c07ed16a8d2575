use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::{JobKey, JobRecord, StoredJob};

/// Column layout shared by the kept and filtered tables. Fixed here rather
/// than derived from the first batch written, so the schema cannot drift
/// between runs with differently-shaped batches.
const JOB_COLUMNS: [(&str, &str); 12] = [
    ("title", "TEXT NOT NULL"),
    ("company", "TEXT NOT NULL DEFAULT ''"),
    ("location", "TEXT NOT NULL DEFAULT ''"),
    ("date", "TEXT NOT NULL DEFAULT ''"),
    ("job_url", "TEXT NOT NULL DEFAULT ''"),
    ("job_description", "TEXT NOT NULL DEFAULT ''"),
    ("applied", "INTEGER NOT NULL DEFAULT 0"),
    ("hidden", "INTEGER NOT NULL DEFAULT 0"),
    ("interview", "INTEGER NOT NULL DEFAULT 0"),
    ("rejected", "INTEGER NOT NULL DEFAULT 0"),
    ("date_loaded", "TEXT"),
    ("cover_letter", "TEXT"),
];

/// Columns added by lazy migration to tables written before triage and
/// cover letters existed.
const MIGRATED_COLUMNS: [(&str, &str); 5] = [
    ("applied", "INTEGER DEFAULT 0"),
    ("rejected", "INTEGER DEFAULT 0"),
    ("interview", "INTEGER DEFAULT 0"),
    ("hidden", "INTEGER DEFAULT 0"),
    ("cover_letter", "TEXT"),
];

/// The triage flags the dashboard may flip after persistence. Everything
/// else on a row is immutable once written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StatusFlag {
    Applied,
    Rejected,
    Interview,
    Hidden,
}

impl StatusFlag {
    pub fn column(self) -> &'static str {
        match self {
            StatusFlag::Applied => "applied",
            StatusFlag::Rejected => "rejected",
            StatusFlag::Interview => "interview",
            StatusFlag::Hidden => "hidden",
        }
    }
}

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count == 1)
    }

    pub fn ensure_table(&self, table: &str) -> Result<()> {
        let columns = JOB_COLUMNS
            .iter()
            .map(|(name, definition)| format!("\"{name}\" {definition}"))
            .collect::<Vec<_>>()
            .join(",\n                ");
        self.conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{table}" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                {columns}
            );
            "#
        ))?;
        Ok(())
    }

    /// Add the triage/cover-letter columns to a table created by an older
    /// run that predates them. No-op for missing tables and current ones.
    pub fn ensure_status_columns(&self, table: &str) -> Result<()> {
        if !self.table_exists(table)? {
            return Ok(());
        }
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
        let existing: HashSet<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<_, _>>()?;
        drop(stmt);

        for (column, definition) in MIGRATED_COLUMNS {
            if !existing.contains(column) {
                self.conn.execute(
                    &format!("ALTER TABLE \"{table}\" ADD COLUMN \"{column}\" {definition}"),
                    [],
                )?;
            }
        }
        Ok(())
    }

    /// Identity keys of every persisted row, for store dedup. A missing
    /// table yields an empty set.
    pub fn existing_keys(&self, table: &str) -> Result<Vec<JobKey>> {
        if !self.table_exists(table)? {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "SELECT job_url, title, company, date FROM \"{table}\""
        ))?;
        let keys = stmt
            .query_map([], |row| {
                Ok(JobKey {
                    job_url: row.get(0)?,
                    title: row.get(1)?,
                    company: row.get(2)?,
                    posting_date: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    /// Create-or-append for one table: a fresh table swallows the whole
    /// batch, an existing one only the rows whose (title, company, date)
    /// triple is not already present. Returns the number of rows inserted.
    pub fn sync_table(&self, table: &str, records: &[JobRecord]) -> Result<usize> {
        if self.table_exists(table)? {
            self.ensure_status_columns(table)?;
            let inserted = self.append_new(table, records)?;
            info!(table, inserted, "appended new records");
            Ok(inserted)
        } else {
            self.ensure_table(table)?;
            let inserted = self.insert_records(table, records)?;
            info!(table, inserted, "created table and inserted records");
            Ok(inserted)
        }
    }

    fn append_new(&self, table: &str, records: &[JobRecord]) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT title, company, date FROM \"{table}\""))?;
        let existing: HashSet<(String, String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<_, _>>()?;
        drop(stmt);

        let fresh = records.iter().filter(|job| {
            !existing.contains(&(
                job.title.clone(),
                job.company.clone(),
                job.posting_date.clone(),
            ))
        });
        self.insert_records(table, fresh)
    }

    fn insert_records<'a>(
        &self,
        table: &str,
        records: impl IntoIterator<Item = &'a JobRecord>,
    ) -> Result<usize> {
        let mut stmt = self.conn.prepare(&format!(
            r#"INSERT INTO "{table}"
               (title, company, location, date, job_url, job_description,
                applied, hidden, interview, rejected, date_loaded)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#
        ))?;
        let mut inserted = 0;
        for job in records {
            stmt.execute(params![
                job.title,
                job.company,
                job.location,
                job.posting_date,
                job.job_url,
                job.job_description,
                job.applied,
                job.hidden,
                job.interview,
                job.rejected,
                job.date_loaded,
            ])?;
            inserted += 1;
        }
        Ok(inserted)
    }

    // --- Dashboard operations ---

    /// All non-hidden rows, newest-first by insertion id.
    pub fn visible_jobs(&self, table: &str) -> Result<Vec<StoredJob>> {
        if !self.table_exists(table)? {
            return Ok(Vec::new());
        }
        self.ensure_status_columns(table)?;
        let mut stmt = self.conn.prepare(&format!(
            r#"SELECT id, IFNULL(title, ''), IFNULL(company, ''), IFNULL(location, ''),
                      IFNULL(date, ''), IFNULL(job_url, ''), IFNULL(job_description, ''),
                      IFNULL(applied, 0), IFNULL(hidden, 0),
                      IFNULL(interview, 0), IFNULL(rejected, 0), cover_letter
               FROM "{table}"
               WHERE IFNULL(hidden, 0) = 0
               ORDER BY id DESC"#
        ))?;
        let rows = stmt.query_map([], Self::row_to_stored)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list jobs")
    }

    pub fn get_job(&self, table: &str, id: i64) -> Result<Option<StoredJob>> {
        if !self.table_exists(table)? {
            return Ok(None);
        }
        self.ensure_status_columns(table)?;
        let result = self.conn.query_row(
            &format!(
                r#"SELECT id, IFNULL(title, ''), IFNULL(company, ''), IFNULL(location, ''),
                          IFNULL(date, ''), IFNULL(job_url, ''), IFNULL(job_description, ''),
                          IFNULL(applied, 0), IFNULL(hidden, 0),
                          IFNULL(interview, 0), IFNULL(rejected, 0), cover_letter
                   FROM "{table}" WHERE id = ?1"#
            ),
            [id],
            Self::row_to_stored,
        );
        match result {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set exactly one triage flag on one row. Returns false when the row
    /// does not exist.
    pub fn set_flag(&self, table: &str, id: i64, flag: StatusFlag) -> Result<bool> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE \"{table}\" SET \"{}\" = 1 WHERE id = ?1",
                flag.column()
            ),
            [id],
        )?;
        Ok(changed > 0)
    }

    pub fn set_cover_letter(&self, table: &str, id: i64, text: &str) -> Result<()> {
        self.conn.execute(
            &format!("UPDATE \"{table}\" SET cover_letter = ?1 WHERE id = ?2"),
            params![text, id],
        )?;
        Ok(())
    }

    fn row_to_stored(row: &rusqlite::Row) -> rusqlite::Result<StoredJob> {
        Ok(StoredJob {
            id: row.get(0)?,
            title: row.get(1)?,
            company: row.get(2)?,
            location: row.get(3)?,
            posting_date: row.get(4)?,
            job_url: row.get(5)?,
            job_description: row.get(6)?,
            applied: row.get(7)?,
            hidden: row.get(8)?,
            interview: row.get(9)?,
            rejected: row.get(10)?,
            cover_letter: row.get(11)?,
        })
    }
}
