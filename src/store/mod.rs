//! Store (component F) — packages, doc URLs, page versions, processed
//! docs. The only shared mutable resource in the system (§5); a single
//! `rusqlite` connection guarded by a mutex, called from async code via
//! `spawn_blocking`.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rusqlite::{params, Connection, OptionalExtension};
use sha1::{Digest, Sha1};

use crate::error::StoreError;

/// The persistence contract described in §4.F. A trait so the Orchestrator
/// can be exercised against a fixture without a real file on disk if a
/// future test needs that; today `SqliteStore` is the only implementation
/// (Open Question decision: one store, one trait, see DESIGN.md).
#[async_trait]
pub trait DocStore: Send + Sync {
    async fn ensure_schema(&self) -> Result<(), StoreError>;
    async fn upsert_package(&self, name: &str) -> Result<i64, StoreError>;
    async fn upsert_doc_url(&self, package_id: i64, url: &str) -> Result<i64, StoreError>;

    /// Records a new version only if `raw_text`'s SHA-1 differs from the
    /// current latest version's `content_hash`. Returns the new
    /// `page_version_id` on insert, `None` on no-op (§4.F, testable
    /// property 5).
    async fn record_page_version(
        &self,
        doc_url_id: i64,
        page_url: &str,
        raw_text: &str,
    ) -> Result<Option<i64>, StoreError>;

    async fn record_processed(&self, page_version_id: i64, text: &str) -> Result<(), StoreError>;

    /// All stored page versions, decompressed. Entries whose blob fails to
    /// decompress or decode as UTF-8 are logged and omitted rather than
    /// failing the whole call (§7 "Decompression error").
    async fn iter_all_page_versions(&self) -> Result<Vec<(i64, String)>, StoreError>;
}

pub struct SqliteStore {
    conn: Arc<StdMutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(StdMutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(StdMutex::new(conn)),
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("store mutex poisoned");
            f(&guard)
        })
        .await
        .map_err(|_| StoreError::WorkerGone)?
    }
}

fn gzip_compress(text: &str) -> Result<Vec<u8>, StoreError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(StoreError::Compress)?;
    encoder.finish().map_err(StoreError::Compress)
}

fn gzip_decompress(bytes: &[u8], page_version_id: i64) -> Result<String, StoreError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|source| StoreError::Decompress {
            page_version_id,
            source,
        })?;
    String::from_utf8(out).map_err(|source| StoreError::InvalidUtf8 {
        page_version_id,
        source,
    })
}

fn sha1_hex(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl DocStore for SqliteStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS packages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS doc_urls (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    package_id INTEGER NOT NULL REFERENCES packages(id),
                    url TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE(package_id, url)
                );

                CREATE TABLE IF NOT EXISTS page_versions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    doc_url_id INTEGER NOT NULL REFERENCES doc_urls(id),
                    page_url TEXT NOT NULL,
                    version INTEGER NOT NULL,
                    raw_bytes BLOB NOT NULL,
                    content_hash TEXT NOT NULL,
                    retrieved_at TEXT NOT NULL,
                    change_summary TEXT NOT NULL,
                    UNIQUE(doc_url_id, page_url, version)
                );

                CREATE TABLE IF NOT EXISTS processed_docs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    page_version_id INTEGER NOT NULL UNIQUE REFERENCES page_versions(id),
                    processed_text BLOB NOT NULL,
                    processed_at TEXT NOT NULL
                );
                ",
            )?;
            Ok(())
        })
        .await
    }

    async fn upsert_package(&self, name: &str) -> Result<i64, StoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            if let Some(id) = conn
                .query_row(
                    "SELECT id FROM packages WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?
            {
                return Ok(id);
            }
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO packages (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
                params![name, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn upsert_doc_url(&self, package_id: i64, url: &str) -> Result<i64, StoreError> {
        let url = url.to_string();
        self.with_conn(move |conn| {
            if let Some(id) = conn
                .query_row(
                    "SELECT id FROM doc_urls WHERE package_id = ?1 AND url = ?2",
                    params![package_id, url],
                    |row| row.get(0),
                )
                .optional()?
            {
                return Ok(id);
            }
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO doc_urls (package_id, url, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                params![package_id, url, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn record_page_version(
        &self,
        doc_url_id: i64,
        page_url: &str,
        raw_text: &str,
    ) -> Result<Option<i64>, StoreError> {
        let page_url = page_url.to_string();
        let new_hash = sha1_hex(raw_text);
        let compressed = gzip_compress(raw_text)?;

        self.with_conn(move |conn| {
            let current: Option<(i64, String)> = conn
                .query_row(
                    "SELECT version, content_hash FROM page_versions
                     WHERE doc_url_id = ?1 AND page_url = ?2
                     ORDER BY version DESC LIMIT 1",
                    params![doc_url_id, page_url],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let (next_version, change_summary) = match &current {
                Some((_version, hash)) if *hash == new_hash => return Ok(None),
                Some((version, _)) => (version + 1, "Content changed"),
                None => (1, "Initial version"),
            };

            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO page_versions
                    (doc_url_id, page_url, version, raw_bytes, content_hash, retrieved_at, change_summary)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    doc_url_id,
                    page_url,
                    next_version,
                    compressed,
                    new_hash,
                    now,
                    change_summary
                ],
            )?;
            Ok(Some(conn.last_insert_rowid()))
        })
        .await
    }

    async fn record_processed(&self, page_version_id: i64, text: &str) -> Result<(), StoreError> {
        let compressed = gzip_compress(text)?;
        self.with_conn(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO processed_docs (page_version_id, processed_text, processed_at)
                 VALUES (?1, ?2, ?3)",
                params![page_version_id, compressed, now],
            )?;
            Ok(())
        })
        .await
    }

    async fn iter_all_page_versions(&self) -> Result<Vec<(i64, String)>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, raw_bytes FROM page_versions")?;
            let rows = stmt
                .query_map([], |row| {
                    let id: i64 = row.get(0)?;
                    let bytes: Vec<u8> = row.get(1)?;
                    Ok((id, bytes))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut out = Vec::with_capacity(rows.len());
            for (id, bytes) in rows {
                match gzip_decompress(&bytes, id) {
                    Ok(text) => out.push((id, text)),
                    Err(error) => {
                        tracing::warn!(page_version_id = id, %error, "skipping undecodable page version");
                    }
                }
            }
            Ok(out)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_package_returns_same_id_on_repeat() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ensure_schema().await.unwrap();
        let id1 = store.upsert_package("requests").await.unwrap();
        let id2 = store.upsert_package("requests").await.unwrap();
        assert_eq!(id1, id2);
    }

    #[tokio::test]
    async fn record_page_version_no_ops_on_identical_content() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ensure_schema().await.unwrap();
        let pkg = store.upsert_package("requests").await.unwrap();
        let doc_url = store
            .upsert_doc_url(pkg, "https://example.test/docs")
            .await
            .unwrap();

        let first = store
            .record_page_version(doc_url, "https://example.test/docs", "hello world")
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .record_page_version(doc_url, "https://example.test/docs", "hello world")
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn record_page_version_increments_on_change() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ensure_schema().await.unwrap();
        let pkg = store.upsert_package("requests").await.unwrap();
        let doc_url = store
            .upsert_doc_url(pkg, "https://example.test/docs")
            .await
            .unwrap();

        store
            .record_page_version(doc_url, "https://example.test/docs", "version one")
            .await
            .unwrap();
        store
            .record_page_version(doc_url, "https://example.test/docs", "version two")
            .await
            .unwrap();

        let versions = store.iter_all_page_versions().await.unwrap();
        assert_eq!(versions.len(), 2);
    }

    #[tokio::test]
    async fn round_trip_preserves_content_hash() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ensure_schema().await.unwrap();
        let pkg = store.upsert_package("requests").await.unwrap();
        let doc_url = store
            .upsert_doc_url(pkg, "https://example.test/docs")
            .await
            .unwrap();

        let text = "the quick brown fox jumps over the lazy dog";
        let page_version_id = store
            .record_page_version(doc_url, "https://example.test/docs", text)
            .await
            .unwrap()
            .unwrap();

        let versions = store.iter_all_page_versions().await.unwrap();
        let (_, stored_text) = versions
            .into_iter()
            .find(|(id, _)| *id == page_version_id)
            .unwrap();
        assert_eq!(stored_text, text);
        assert_eq!(sha1_hex(&stored_text), sha1_hex(text));
    }

    #[tokio::test]
    async fn record_processed_stores_compressed_text() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.ensure_schema().await.unwrap();
        let pkg = store.upsert_package("requests").await.unwrap();
        let doc_url = store
            .upsert_doc_url(pkg, "https://example.test/docs")
            .await
            .unwrap();
        let page_version_id = store
            .record_page_version(doc_url, "https://example.test/docs", "raw html text")
            .await
            .unwrap()
            .unwrap();

        store
            .record_processed(page_version_id, "extracted plain text")
            .await
            .unwrap();
    }
}
