//! Entry operations within a partition.
//!
//! Entries are only ever replaced wholesale. A `put` overwrites any prior
//! entry for the same key in a single upsert statement, so two racing
//! writers for one key resolve as last-write-wins.

use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::key::RequestKey;
use super::partitions::Partition;
use crate::{Error, Response};

/// A stored request/response pair.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: RequestKey,
    pub response: Response,

    /// Local write time. Diagnostic only; freshness uses [`CacheEntry::timestamp`].
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Storage timestamp as seen by the freshness evaluator: the cached
    /// response's own `Date` header.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.response.date()
    }
}

struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn encode(key: &RequestKey, response: &Response) -> Result<Self, Error> {
        let headers_json =
            serde_json::to_string(&response.header_pairs()).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        Ok(Self {
            key_hash: key.hash(),
            method: key.method().to_string(),
            url: key.url().to_string(),
            status: response.status.as_u16(),
            headers_json,
            body: response.body.to_vec(),
        })
    }
}

const UPSERT_ENTRY: &str = "INSERT INTO entries (
        partition, key_hash, method, url, status, headers_json, body, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(partition, key_hash) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        status = excluded.status,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

const ENSURE_PARTITION: &str = "INSERT INTO partitions (name, created_at) VALUES (?1, ?2)
    ON CONFLICT(name) DO NOTHING";

fn upsert(conn: &rusqlite::Connection, partition: &str, row: &EntryRow, now: &str) -> Result<(), Error> {
    conn.execute(ENSURE_PARTITION, params![partition, now])?;
    conn.execute(
        UPSERT_ENTRY,
        params![
            partition,
            &row.key_hash,
            &row.method,
            &row.url,
            row.status,
            &row.headers_json,
            &row.body,
            now,
        ],
    )?;
    Ok(())
}

impl Partition {
    /// Look up an entry by exact key.
    ///
    /// Returns None if the key is not stored in this partition.
    pub async fn get(&self, key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        let name = self.name.clone();
        let key_hash = key.hash();
        self.db
            .conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, body, stored_at
                     FROM entries WHERE partition = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![name, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u16>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                });

                let (method, url, status, headers_json, body, stored_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let pairs: Vec<(String, Vec<u8>)> =
                    serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
                let stored_at = DateTime::parse_from_rfc3339(&stored_at)
                    .map_err(|e| Error::CorruptEntry(format!("stored_at: {e}")))?
                    .with_timezone(&Utc);

                Ok(Some(CacheEntry {
                    key: RequestKey::from_stored(method, url),
                    response: Response::from_parts(status, pairs, body)?,
                    stored_at,
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response, overwriting any existing entry for the key.
    ///
    /// Callers only pass successful responses; the store itself does not
    /// inspect the status.
    pub async fn put(&self, key: &RequestKey, response: &Response) -> Result<(), Error> {
        let name = self.name.clone();
        let row = EntryRow::encode(key, response)?;
        let now = Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> { upsert(conn, &name, &row, &now) })
            .await
            .map_err(Error::from)
    }

    /// Store several responses in one transaction: either all land or none do.
    pub async fn put_all(&self, items: &[(RequestKey, Response)]) -> Result<(), Error> {
        let name = self.name.clone();
        let rows = items
            .iter()
            .map(|(key, response)| EntryRow::encode(key, response))
            .collect::<Result<Vec<_>, _>>()?;
        let now = Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    upsert(&tx, &name, row, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry. Returns false if it was not stored.
    pub async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        let name = self.name.clone();
        let key_hash = key.hash();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2",
                    params![name, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Enumerate the keys stored in this partition.
    pub async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE partition = ?1 ORDER BY url")?;
                let keys = stmt
                    .query_map(params![name], |row| Ok(RequestKey::from_stored(row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this partition.
    pub async fn count(&self) -> Result<usize, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }
}
