//! Partition lifecycle: open, enumerate, delete.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

/// Handle to one named partition.
///
/// Obtained from [`CacheDb::open_partition`]. Cheap to clone; all entry
/// operations go through the shared connection.
#[derive(Clone, Debug)]
pub struct Partition {
    pub(crate) db: CacheDb,
    pub(crate) name: String,
}

impl Partition {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CacheDb {
    /// Open a partition, creating it if absent. Idempotent.
    pub async fn open_partition(&self, name: &str) -> Result<Partition, Error> {
        let owned = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO partitions (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![owned, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Partition { db: self.clone(), name: name.to_string() })
    }

    /// Handle to a partition without touching the database.
    ///
    /// Reads through it see nothing until the partition holds entries;
    /// writes create the partition on demand.
    pub fn partition(&self, name: &str) -> Partition {
        Partition { db: self.clone(), name: name.to_string() }
    }

    /// Check whether a partition exists.
    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List all partition names, sorted.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every entry in it.
    ///
    /// Returns false if the partition did not exist.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every partition whose name fails `keep`.
    ///
    /// Returns the names of the deleted partitions.
    pub async fn retain_partitions<F>(&self, keep: F) -> Result<Vec<String>, Error>
    where
        F: Fn(&str) -> bool,
    {
        let doomed: Vec<String> = self
            .partition_names()
            .await?
            .into_iter()
            .filter(|name| !keep(name))
            .collect();

        if doomed.is_empty() {
            return Ok(doomed);
        }

        let batch = doomed.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for name in &batch {
                    tx.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(doomed)
    }
}
