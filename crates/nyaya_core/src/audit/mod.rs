//! Query audit trail and answer feedback, kept in SQLite.
//!
//! Writes here are advisory for the query path: callers log failures and
//! carry on.

use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::domain::{now_rfc3339_utc, Language, Provenance};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryAuditEntry {
    pub query_id: String,
    pub query_text: String,
    pub language: Language,
    pub taluk: Option<String>,
    pub scores: Vec<f32>,
    /// `None` when the query failed before evidence was chosen.
    pub provenance: Option<Provenance>,
    pub sources: Vec<String>,
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackRow {
    pub query_id: String,
    pub query: String,
    pub provenance: Option<String>,
    pub rating: u8,
    pub created_at: String,
}

pub struct AuditStore {
    conn: Mutex<Connection>,
}

impl AuditStore {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let mut conn = db::open(path)?;
        db::migrate(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        let mut conn = db::open_in_memory()?;
        db::migrate(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::new("AUDIT_LOCK_POISONED", "Audit store lock was poisoned"))
    }

    pub fn record_query(&self, entry: &QueryAuditEntry) -> Result<(), AppError> {
        let scores_json = serde_json::to_string(&entry.scores).map_err(|e| {
            AppError::new("AUDIT_WRITE_FAILED", "Failed to encode retrieval scores")
                .with_details(e.to_string())
        })?;
        let sources_json = serde_json::to_string(&entry.sources).map_err(|e| {
            AppError::new("AUDIT_WRITE_FAILED", "Failed to encode sources")
                .with_details(e.to_string())
        })?;
        let created_at = now_rfc3339_utc()?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO query_log(query_id, query_text, language, taluk, scores_json,
                                    provenance, sources_json, error_code, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.query_id,
                entry.query_text,
                entry.language.code(),
                entry.taluk,
                scores_json,
                entry.provenance.map(Provenance::as_str),
                sources_json,
                entry.error_code,
                created_at,
            ],
        )
        .map_err(|e| {
            AppError::new("AUDIT_WRITE_FAILED", "Failed to record query")
                .with_details(format!("query_id={}; err={}", entry.query_id, e))
        })?;
        Ok(())
    }

    pub fn record_feedback(&self, query_id: &str, rating: u8) -> Result<(), AppError> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::new("FEEDBACK_INVALID", "Rating must be between 1 and 5")
                .with_details(format!("rating={rating}")));
        }
        let created_at = now_rfc3339_utc()?;

        let conn = self.lock()?;
        let known: Option<String> = conn
            .query_row(
                "SELECT query_id FROM query_log WHERE query_id = ?1",
                [query_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| {
                AppError::new("AUDIT_READ_FAILED", "Failed to look up query")
                    .with_details(e.to_string())
            })?;
        if known.is_none() {
            return Err(AppError::new("FEEDBACK_INVALID", "Unknown query id")
                .with_details(format!("query_id={query_id}")));
        }

        conn.execute(
            "INSERT INTO feedback(query_id, rating, created_at) VALUES (?1, ?2, ?3)",
            params![query_id, rating, created_at],
        )
        .map_err(|e| {
            AppError::new("AUDIT_WRITE_FAILED", "Failed to record feedback")
                .with_details(e.to_string())
        })?;
        Ok(())
    }

    /// Feedback joined with the query it rates, oldest first.
    pub fn list_feedback(&self) -> Result<Vec<FeedbackRow>, AppError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT f.query_id, q.query_text, q.provenance, f.rating, f.created_at
                 FROM feedback f JOIN query_log q ON q.query_id = f.query_id
                 ORDER BY f.id ASC",
            )
            .map_err(|e| {
                AppError::new("AUDIT_READ_FAILED", "Failed to prepare feedback query")
                    .with_details(e.to_string())
            })?;
        let rows = stmt
            .query_map([], |row| {
                Ok(FeedbackRow {
                    query_id: row.get(0)?,
                    query: row.get(1)?,
                    provenance: row.get(2)?,
                    rating: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .map_err(|e| {
                AppError::new("AUDIT_READ_FAILED", "Failed to read feedback")
                    .with_details(e.to_string())
            })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(|e| {
                AppError::new("AUDIT_READ_FAILED", "Failed to read feedback row")
                    .with_details(e.to_string())
            })?);
        }
        Ok(out)
    }

    /// Writes every feedback row as CSV with a header. Returns the row count.
    pub fn export_feedback_csv<W: Write>(&self, out: W) -> Result<usize, AppError> {
        let rows = self.list_feedback()?;
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(["query_id", "query", "provenance", "rating", "created_at"])
            .map_err(csv_err)?;
        for r in rows.iter() {
            let rating = r.rating.to_string();
            wtr.write_record([
                r.query_id.as_str(),
                r.query.as_str(),
                r.provenance.as_deref().unwrap_or(""),
                rating.as_str(),
                r.created_at.as_str(),
            ])
            .map_err(csv_err)?;
        }
        wtr.flush().map_err(|e| {
            AppError::new("FEEDBACK_EXPORT_FAILED", "Failed to flush feedback export")
                .with_details(e.to_string())
        })?;
        Ok(rows.len())
    }
}

fn csv_err(e: csv::Error) -> AppError {
    AppError::new("FEEDBACK_EXPORT_FAILED", "Failed to write feedback export")
        .with_details(e.to_string())
}
