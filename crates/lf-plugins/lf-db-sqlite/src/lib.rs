//! # lf-db-sqlite Implementation
//!
//! SQLite-backed `ReportCollection`. Each report is stored as one JSON
//! document keyed by its id, mirroring a hosted document store. After every
//! successful write the full collection is reloaded and published to the
//! live snapshot channel. Reloads are serialized so a slower reload can never
//! publish over a newer one.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use lf_core::models::{Report, ReportKind};
use lf_core::traits::{ReportCollection, SnapshotStream};
use log::{debug, warn};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::sync::{watch, Mutex};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS reports (
    id         TEXT PRIMARY KEY NOT NULL,
    document   TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)";

pub struct SqliteReportCollection {
    pool: SqlitePool,
    snapshot: watch::Sender<Arc<Vec<Report>>>,
    /// Held from the reload query until the snapshot is sent.
    publish: Mutex<()>,
}

impl SqliteReportCollection {
    /// Opens (creating if needed) the database at `database_url` and loads the
    /// initial snapshot. `sqlite::memory:` is supported for tests.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url {database_url}"))?
            .create_if_missing(true);

        // Every in-memory connection is its own database, so pin exactly one.
        let in_memory = database_url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .min_connections(if in_memory { 1 } else { 0 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;

        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let collection = Self { pool, snapshot, publish: Mutex::new(()) };
        collection.refresh().await?;
        Ok(collection)
    }

    /// Reloads every document and publishes the result to subscribers.
    ///
    /// Documents that fail to decode are left out of the snapshot and logged;
    /// one bad row must not blank the whole list.
    pub async fn refresh(&self) -> anyhow::Result<()> {
        let _publishing = self.publish.lock().await;
        let rows = sqlx::query("SELECT id, document FROM reports")
            .fetch_all(&self.pool)
            .await?;

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let raw: String = row.try_get("document")?;
            match decode(&id, &raw) {
                Ok(report) => reports.push(report),
                Err(e) => warn!("skipping malformed report {}: {:#}", id, e),
            }
        }

        debug!("publishing snapshot of {} reports", reports.len());
        self.snapshot.send_replace(Arc::new(reports));
        Ok(())
    }
}

/// The `resolved` flag of a stored document, read leniently so a document
/// that no longer decodes can still be overwritten.
fn stored_resolved(raw: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|doc| doc.get("resolved").and_then(serde_json::Value::as_bool))
        .unwrap_or(false)
}

fn decode(id: &str, raw: &str) -> anyhow::Result<Report> {
    let body: serde_json::Value = serde_json::from_str(raw)?;
    Ok(Report::from_document(id, &body)?)
}

#[async_trait]
impl ReportCollection for SqliteReportCollection {
    fn subscribe(&self, kind: Option<ReportKind>) -> SnapshotStream {
        SnapshotStream::new(self.snapshot.subscribe(), kind)
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Report>> {
        let row = sqlx::query("SELECT document FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("document")?;
                Ok(Some(decode(id, &raw)?))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, report: Report) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO reports (id, document) VALUES (?, ?)")
            .bind(&report.id)
            .bind(serde_json::to_string(&report.to_document())?)
            .execute(&self.pool)
            .await
            .with_context(|| format!("could not create report {}", report.id))?;
        self.refresh().await
    }

    /// Replaces the document, except that a stored `resolved = true` is kept:
    /// an edit built from an older read must not reopen a resolved report.
    async fn update(&self, mut report: Report) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT document FROM reports WHERE id = ?")
            .bind(&report.id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            bail!("report {} does not exist", report.id);
        };
        let raw: String = row.try_get("document")?;
        report.resolved |= stored_resolved(&raw);

        sqlx::query(
            "UPDATE reports SET document = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?",
        )
        .bind(serde_json::to_string(&report.to_document())?)
        .bind(&report.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.refresh().await
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM reports WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            bail!("report {id} does not exist");
        }
        self.refresh().await
    }

    /// Read-modify-write inside one transaction so a concurrent edit is not
    /// lost between the read and the write.
    async fn set_resolved(&self, id: &str) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT document FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            bail!("report {id} does not exist");
        };
        let raw: String = row.try_get("document")?;
        let mut report = decode(id, &raw)?;
        report.resolved = true;

        sqlx::query("UPDATE reports SET document = ? WHERE id = ?")
            .bind(serde_json::to_string(&report.to_document())?)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.refresh().await
    }
}
