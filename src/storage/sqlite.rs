//! SQLite implementation of [`Storage`]
//!
//! Uses a `Mutex<Connection>`; every bulk call runs in one transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Type, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::models::{EntityId, Lemma, Occurrence, Page, Site, SiteStatus};

use super::repository::Storage;

const SITE_COLUMNS: &str = "id, name, url, status, status_time, last_error";

/// SQLite-backed storage
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) a database file
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let storage = Self::with_connection(conn)?;
        tracing::info!(path = %path.display(), "SQLite storage initialized");
        Ok(storage)
    }

    /// Create in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.create_schema()?;
        Ok(storage)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create database schema
    fn create_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS site (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    url TEXT NOT NULL UNIQUE,
                    status TEXT NOT NULL,
                    status_time INTEGER NOT NULL,
                    last_error TEXT NOT NULL DEFAULT ''
                );

                CREATE TABLE IF NOT EXISTS page (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    site_id INTEGER NOT NULL REFERENCES site(id),
                    path TEXT NOT NULL,
                    code INTEGER NOT NULL,
                    content TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_page_site ON page(site_id);

                CREATE TABLE IF NOT EXISTS lemma (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    site_id INTEGER NOT NULL REFERENCES site(id),
                    lemma TEXT NOT NULL,
                    frequency INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_lemma_site_lemma ON lemma(site_id, lemma);

                CREATE TABLE IF NOT EXISTS occurrence (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    page_id INTEGER NOT NULL REFERENCES page(id),
                    lemma_id INTEGER NOT NULL REFERENCES lemma(id),
                    rank REAL NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_occurrence_lemma ON occurrence(lemma_id);
                CREATE INDEX IF NOT EXISTS idx_occurrence_page ON occurrence(page_id);
                "#,
        )?;
        Ok(())
    }

    fn count(&self, sql: &str, site_id: EntityId) -> Result<usize> {
        let count: i64 = self.conn().query_row(sql, [site_id], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn conversion_error(idx: usize, ty: Type, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, msg.into())
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<Site> {
    let status: String = row.get(3)?;
    let status: SiteStatus = status
        .parse()
        .map_err(|e: String| conversion_error(3, Type::Text, e))?;

    let millis: i64 = row.get(4)?;
    let status_time = DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| conversion_error(4, Type::Integer, format!("bad timestamp {millis}")))?;

    Ok(Site {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        status,
        status_time,
        last_error: row.get(5)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        site_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        content: row.get(4)?,
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

impl Storage for SqliteStorage {
    fn find_site_by_url(&self, url: &str) -> Result<Option<Site>> {
        let site = self
            .conn()
            .query_row(
                &format!("SELECT {SITE_COLUMNS} FROM site WHERE url = ?1"),
                [url],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn find_all_sites(&self) -> Result<Vec<Site>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {SITE_COLUMNS} FROM site ORDER BY id"))?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sites)
    }

    fn save_site(&self, site: &mut Site) -> Result<()> {
        let conn = self.conn();
        let status_time = site.status_time.timestamp_millis();

        if site.id == 0 {
            conn.execute(
                "INSERT INTO site (name, url, status, status_time, last_error)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![site.name, site.url, site.status.as_str(), status_time, site.last_error],
            )?;
            site.id = conn.last_insert_rowid();
        } else {
            let updated = conn.execute(
                "UPDATE site SET name = ?1, url = ?2, status = ?3, status_time = ?4, last_error = ?5
                 WHERE id = ?6",
                params![
                    site.name,
                    site.url,
                    site.status.as_str(),
                    status_time,
                    site.last_error,
                    site.id
                ],
            )?;
            if updated == 0 {
                return Err(Error::other(format!("site {} does not exist", site.id)));
            }
        }
        Ok(())
    }

    fn delete_site(&self, site_id: EntityId) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM occurrence WHERE page_id IN (SELECT id FROM page WHERE site_id = ?1)",
            [site_id],
        )?;
        tx.execute("DELETE FROM page WHERE site_id = ?1", [site_id])?;
        tx.execute("DELETE FROM lemma WHERE site_id = ?1", [site_id])?;
        tx.execute("DELETE FROM site WHERE id = ?1", [site_id])?;
        tx.commit()?;
        Ok(())
    }

    fn save_all_pages(&self, pages: &mut [Page]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO page (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for page in pages.iter_mut() {
                stmt.execute(params![page.site_id, page.path, page.code, page.content])?;
                page.id = tx.last_insert_rowid();
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_pages_by_site(&self, site_id: EntityId) -> Result<usize> {
        let deleted = self
            .conn()
            .execute("DELETE FROM page WHERE site_id = ?1", [site_id])?;
        Ok(deleted)
    }

    fn find_pages_by_ids(&self, ids: &[EntityId]) -> Result<Vec<Page>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, site_id, path, code, content FROM page WHERE id IN ({}) ORDER BY id",
            placeholders(ids.len())
        ))?;
        let pages = stmt
            .query_map(params_from_iter(ids.iter()), page_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pages)
    }

    fn count_pages_by_site(&self, site_id: EntityId) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM page WHERE site_id = ?1", site_id)
    }

    fn find_lemmas_by_lemma_and_site(
        &self,
        lemmas: &[String],
        site_id: EntityId,
    ) -> Result<Vec<Lemma>> {
        if lemmas.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, site_id, lemma, frequency FROM lemma
             WHERE site_id = ? AND lemma IN ({})",
            placeholders(lemmas.len())
        ))?;

        let mut values: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(lemmas.len() + 1);
        values.push(&site_id);
        values.extend(lemmas.iter().map(|l| l as &dyn rusqlite::ToSql));

        let found = stmt
            .query_map(values.as_slice(), |row| {
                Ok(Lemma {
                    id: row.get(0)?,
                    site_id: row.get(1)?,
                    lemma: row.get(2)?,
                    frequency: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(found)
    }

    fn save_all_lemmas(&self, lemmas: &mut [Lemma]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO lemma (site_id, lemma, frequency) VALUES (?1, ?2, ?3)",
            )?;
            for lemma in lemmas.iter_mut() {
                stmt.execute(params![lemma.site_id, lemma.lemma, lemma.frequency])?;
                lemma.id = tx.last_insert_rowid();
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_lemmas_by_site(&self, site_id: EntityId) -> Result<usize> {
        let deleted = self
            .conn()
            .execute("DELETE FROM lemma WHERE site_id = ?1", [site_id])?;
        Ok(deleted)
    }

    fn count_lemmas_by_site(&self, site_id: EntityId) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM lemma WHERE site_id = ?1", site_id)
    }

    fn find_occurrences_by_lemma(&self, lemma_id: EntityId) -> Result<Vec<Occurrence>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT id, page_id, lemma_id, rank FROM occurrence WHERE lemma_id = ?1",
        )?;
        let found = stmt
            .query_map([lemma_id], |row| {
                Ok(Occurrence {
                    id: row.get(0)?,
                    page_id: row.get(1)?,
                    lemma_id: row.get(2)?,
                    rank: row.get::<_, f64>(3)? as f32,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(found)
    }

    fn save_all_occurrences(&self, occurrences: &mut [Occurrence]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO occurrence (page_id, lemma_id, rank) VALUES (?1, ?2, ?3)",
            )?;
            for occurrence in occurrences.iter_mut() {
                stmt.execute(params![
                    occurrence.page_id,
                    occurrence.lemma_id,
                    f64::from(occurrence.rank)
                ])?;
                occurrence.id = tx.last_insert_rowid();
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_occurrences_by_site(&self, site_id: EntityId) -> Result<usize> {
        let deleted = self.conn().execute(
            "DELETE FROM occurrence WHERE page_id IN (SELECT id FROM page WHERE site_id = ?1)",
            [site_id],
        )?;
        Ok(deleted)
    }
}
