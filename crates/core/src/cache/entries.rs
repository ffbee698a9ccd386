//! Region and entry CRUD operations on the raw database.
//!
//! These work on plain region names. Generation-aware access goes
//! through [`RegionStore`](super::RegionStore).

use super::connection::CacheDb;
use super::regions::RegionName;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// A response as persisted in a region.
///
/// Only 2xx responses are ever stored; [`CacheDb::put_entry`] enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredResponse {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Summary row for a stored region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RegionInfo {
    pub name: String,
    pub entries: u64,
    pub created_at: String,
}

fn insert_region(conn: &rusqlite::Connection, name: &RegionName) -> Result<(), Error> {
    let generation = i64::try_from(name.generation().get())
        .map_err(|_| Error::InvalidInput(format!("generation of {name} is out of range")))?;
    conn.execute(
        "INSERT INTO regions (name, kind, generation, created_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name) DO NOTHING",
        params![
            name.to_string(),
            name.kind().as_str(),
            generation,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

fn upsert_entry(conn: &rusqlite::Connection, region: &str, key: &str, response: &StoredResponse) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)
        .map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))?;
    conn.execute(
        "INSERT INTO entries (region, key, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(region, key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            region,
            key,
            &response.method,
            &response.url,
            response.status as i32,
            headers_json,
            &response.body,
            &response.stored_at,
        ],
    )?;
    Ok(())
}

fn reject_non_success(response: &StoredResponse) -> Result<(), Error> {
    if response.is_success() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("refusing to cache status {} for {}", response.status, response.url)))
    }
}

impl CacheDb {
    /// Create a region if it does not exist yet.
    pub async fn open_region(&self, name: &RegionName) -> Result<(), Error> {
        let name = *name;
        self.conn
            .call(move |conn| insert_region(conn, &name))
            .await
            .map_err(Error::from)
    }

    /// Whether a region with this exact name is stored.
    pub async fn region_exists(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM regions WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All stored region names, in name order.
    pub async fn list_regions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM regions ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Stored regions with their entry counts.
    pub async fn describe_regions(&self) -> Result<Vec<RegionInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<RegionInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT r.name, r.created_at, COUNT(e.key)
                     FROM regions r LEFT JOIN entries e ON e.region = r.name
                     GROUP BY r.name ORDER BY r.name",
                )?;
                let infos = stmt
                    .query_map([], |row| {
                        Ok(RegionInfo { name: row.get(0)?, created_at: row.get(1)?, entries: row.get::<_, i64>(2)? as u64 })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(infos)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a region and every entry in it.
    ///
    /// Returns whether the region existed.
    pub async fn delete_region(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM regions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite one entry, creating the region if needed.
    ///
    /// Last write wins for the same key.
    pub async fn put_entry(&self, region: &RegionName, key: &str, response: &StoredResponse) -> Result<(), Error> {
        reject_non_success(response)?;
        let region = *region;
        let key = key.to_string();
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                insert_region(&tx, &region)?;
                upsert_entry(&tx, &region.to_string(), &key, &response)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert a batch of entries in a single transaction.
    ///
    /// Either every entry is stored or none is.
    pub async fn put_entries(&self, region: &RegionName, entries: Vec<(String, StoredResponse)>) -> Result<(), Error> {
        for (_, response) in &entries {
            reject_non_success(response)?;
        }
        let region = *region;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                insert_region(&tx, &region)?;
                let name = region.to_string();
                for (key, response) in &entries {
                    upsert_entry(&tx, &name, key, response)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Read one entry. Returns None on a miss.
    pub async fn get_entry(&self, region: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        let region = region.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT method, url, status, headers_json, body, stored_at
                         FROM entries WHERE region = ?1 AND key = ?2",
                        params![region, key],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, i32>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, Vec<u8>>(4)?,
                                row.get::<_, String>(5)?,
                            ))
                        },
                    )
                    .optional()?;

                let Some((method, url, status, headers_json, body, stored_at)) = row else {
                    return Ok(None);
                };
                let headers = serde_json::from_str(&headers_json)
                    .map_err(|e| Error::InvalidInput(format!("corrupt headers for {url}: {e}")))?;
                let status = u16::try_from(status)
                    .map_err(|_| Error::InvalidInput(format!("corrupt status {status} for {url}")))?;

                Ok(Some(StoredResponse { method, url, status, headers, body, stored_at }))
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a region (0 if it doesn't exist).
    pub async fn entry_count(&self, region: &str) -> Result<u64, Error> {
        let region = region.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE region = ?1", params![region], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::hash::compute_request_key;
    use crate::cache::regions::{Generation, RegionKind};

    pub(crate) fn make_response(url: &str, status: u16, body: &[u8]) -> StoredResponse {
        StoredResponse {
            method: "GET".to_string(),
            url: url.to_string(),
            status,
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn static_v1() -> RegionName {
        RegionName::new(RegionKind::Static, Generation::new(1))
    }

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://shop.example/logo.png";
        let key = compute_request_key("GET", url, "");
        let response = make_response(url, 200, &[0x89, 0x50, 0x4e, 0x47, 0x00, 0xff]);

        db.put_entry(&static_v1(), &key, &response).await.unwrap();

        let stored = db.get_entry("static-v1", &key).await.unwrap().unwrap();
        assert_eq!(stored, response);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_entry("static-v1", "nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_single_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://shop.example/api/products";
        let key = compute_request_key("GET", url, "");

        db.put_entry(&static_v1(), &key, &make_response(url, 200, b"old")).await.unwrap();
        db.put_entry(&static_v1(), &key, &make_response(url, 200, b"new")).await.unwrap();

        assert_eq!(db.entry_count("static-v1").await.unwrap(), 1);
        let stored = db.get_entry("static-v1", &key).await.unwrap().unwrap();
        assert_eq!(stored.body, b"new");
    }

    #[tokio::test]
    async fn test_rejects_non_success() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://shop.example/missing";
        let result = db.put_entry(&static_v1(), "k", &make_response(url, 404, b"nope")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(!db.region_exists("static-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_entries_all_or_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entries = vec![
            ("a".to_string(), make_response("https://shop.example/", 200, b"index")),
            ("b".to_string(), make_response("https://shop.example/gone", 500, b"err")),
        ];
        assert!(db.put_entries(&static_v1(), entries).await.is_err());
        assert_eq!(db.entry_count("static-v1").await.unwrap(), 0);

        let entries = vec![
            ("a".to_string(), make_response("https://shop.example/", 200, b"index")),
            ("b".to_string(), make_response("https://shop.example/logo.png", 200, b"png")),
        ];
        db.put_entries(&static_v1(), entries).await.unwrap();
        assert_eq!(db.entry_count("static-v1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_generation_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let huge = RegionName::new(RegionKind::Static, Generation::new(u64::MAX));

        assert!(matches!(db.open_region(&huge).await, Err(Error::InvalidInput(_))));
        let result = db.put_entry(&huge, "k", &make_response("https://shop.example/", 200, b"x")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(db.list_regions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_region_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&static_v1(), "k", &make_response("https://shop.example/", 200, b"x"))
            .await
            .unwrap();

        assert!(db.delete_region("static-v1").await.unwrap());
        assert!(!db.delete_region("static-v1").await.unwrap());
        assert!(db.get_entry("static-v1", "k").await.unwrap().is_none());
        assert!(db.list_regions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_describe_regions_counts_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let api = RegionName::new(RegionKind::Api, Generation::new(1));
        db.open_region(&api).await.unwrap();
        db.put_entry(&static_v1(), "k1", &make_response("https://shop.example/a", 200, b"a"))
            .await
            .unwrap();
        db.put_entry(&static_v1(), "k2", &make_response("https://shop.example/b", 200, b"b"))
            .await
            .unwrap();

        let infos = db.describe_regions().await.unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].name, "api-v1");
        assert_eq!(infos[0].entries, 0);
        assert_eq!(infos[1].name, "static-v1");
        assert_eq!(infos[1].entries, 2);
    }
}
