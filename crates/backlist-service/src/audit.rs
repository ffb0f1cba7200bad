//! Append-only audit log file.
//!
//! Every ingestion or admin-update attempt appends exactly one
//! newline-delimited JSON entry, whether or not the durable store was
//! reachable. Appending must never fail the calling pipeline; write
//! failures are logged as warnings and swallowed. The file is opened fresh
//! per call - there is no persistent handle, matching the stateless
//! invocation model.
//!
//! Reads stream the file line by line. Malformed lines are wrapped as
//! `{"raw": <line>}` instead of aborting the scan, and a missing file is
//! an empty log, not an error.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use backlist_core::AuditLogEntry;

use crate::error::ApiError;

/// Default page size for audit reads.
pub const DEFAULT_PER_PAGE: usize = 50;

/// Hard cap on the page size a caller may request.
pub const MAX_PER_PAGE: usize = 500;

/// Filters and pagination for audit reads.
///
/// The field names deserialize from the camelCase query parameters of the
/// admin endpoints (`orderId`, `startDate`, ...).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditQuery {
    /// Substring filter on the entry's order id.
    pub order_id: Option<String>,
    /// Substring filter on the entry's actor.
    pub actor: Option<String>,
    /// Inclusive lower bound; RFC 3339 or `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive upper bound; RFC 3339 or `YYYY-MM-DD` (whole day).
    pub end_date: Option<String>,
    /// 1-based page number.
    pub page: Option<usize>,
    /// Page size, capped at [`MAX_PER_PAGE`].
    pub per_page: Option<usize>,
}

impl AuditQuery {
    fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    fn per_page(&self) -> usize {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Resolve the date filters to concrete bounds.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for an unparseable date string.
    fn bounds(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ApiError> {
        let start = self
            .start_date
            .as_deref()
            .map(|s| parse_date_bound(s, false))
            .transpose()?;
        let end = self
            .end_date
            .as_deref()
            .map(|s| parse_date_bound(s, true))
            .transpose()?;
        Ok((start, end))
    }
}

/// One page of audit entries.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPage {
    /// Matching entries for this page.
    pub entries: Vec<serde_json::Value>,
    /// Total matches across all pages.
    pub count: usize,
    /// The page returned.
    pub page: usize,
    /// The page size applied.
    pub per_page: usize,
}

/// Handle on the audit log file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Create a handle for the given file path. Nothing is opened until
    /// the first append or read.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. Never fails the caller: any I/O or serialization
    /// problem is logged as a warning and swallowed.
    pub async fn append(&self, entry: &AuditLogEntry) {
        if let Err(e) = self.try_append(entry).await {
            tracing::warn!(
                error = %e,
                path = %self.path.display(),
                order_id = %entry.order_id,
                "Failed to append audit log entry"
            );
        }
    }

    async fn try_append(&self, entry: &AuditLogEntry) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut line = serde_json::to_vec(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await
    }

    /// Return one page of filtered entries plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for unparseable date filters or `Internal`
    /// for an unreadable (but existing) file.
    pub async fn query(&self, query: &AuditQuery) -> Result<AuditPage, ApiError> {
        let matches = self.scan(query).await?;
        let page = query.page();
        let per_page = query.per_page();
        let count = matches.len();

        // Saturate: an absurd page number is an empty page, not a panic.
        let entries = matches
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect();

        Ok(AuditPage {
            entries,
            count,
            page,
            per_page,
        })
    }

    /// Return the full filtered set as newline-delimited JSON.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`AuditLog::query`].
    pub async fn export(&self, query: &AuditQuery) -> Result<String, ApiError> {
        let matches = self.scan(query).await?;
        let mut out = String::new();
        for entry in matches {
            // Entries were parsed from single lines, so this cannot
            // reintroduce embedded newlines.
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        Ok(out)
    }

    async fn scan(&self, query: &AuditQuery) -> Result<Vec<serde_json::Value>, ApiError> {
        let (start, end) = query.bounds()?;

        let file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            // Absence of history is a valid state for a fresh deployment.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ApiError::Internal(e.to_string())),
        };

        let mut lines = BufReader::new(file).lines();
        let mut matches = Vec::new();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
        {
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str::<serde_json::Value>(&line)
                .unwrap_or_else(|_| serde_json::json!({ "raw": line }));

            if entry_matches(&entry, query, start, end) {
                matches.push(entry);
            }
        }

        Ok(matches)
    }
}

fn entry_matches(
    entry: &serde_json::Value,
    query: &AuditQuery,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    if let Some(needle) = &query.order_id {
        let Some(order_id) = entry.get("order_id").and_then(|v| v.as_str()) else {
            return false;
        };
        if !order_id.contains(needle.as_str()) {
            return false;
        }
    }

    if let Some(needle) = &query.actor {
        let Some(actor) = entry.get("actor").and_then(|v| v.as_str()) else {
            return false;
        };
        if !actor.contains(needle.as_str()) {
            return false;
        }
    }

    if start.is_some() || end.is_some() {
        let Some(timestamp) = entry
            .get("timestamp")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
        else {
            // Raw-wrapped or timestamp-less lines cannot satisfy a date
            // filter.
            return false;
        };
        if start.is_some_and(|bound| timestamp < bound) {
            return false;
        }
        if end.is_some_and(|bound| timestamp > bound) {
            return false;
        }
    }

    true
}

/// Parse a date filter value: RFC 3339, or a bare date which covers the
/// whole day (start or end depending on which bound it is).
fn parse_date_bound(raw: &str, is_end: bool) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let time = if is_end {
            date.and_hms_opt(23, 59, 59).unwrap_or_default()
        } else {
            date.and_hms_opt(0, 0, 0).unwrap_or_default()
        };
        return Ok(Utc.from_utc_datetime(&time));
    }

    Err(ApiError::BadRequest(format!("invalid date filter: {raw}")))
}
