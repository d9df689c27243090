use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use countrydesk_core::{ColumnValue, Document, DocumentId};

use crate::error::StorageError;
use crate::traits::{LocalCache, StoreGateway};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

fn open_connection(path: &str) -> Result<Connection, StorageError> {
    if path == ":memory:" {
        Ok(Connection::open_in_memory()?)
    } else {
        Ok(Connection::open(path)?)
    }
}

/// Document store backed by a local SQLite file, one row per field.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = open_connection(path)?;
        crate::schema::init_store_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open(":memory:")
    }

    pub fn document_count(&self, collection: &str) -> Result<u64, StorageError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            rusqlite::params![collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn load_fields(
    conn: &Connection,
    collection: &str,
    id: DocumentId,
) -> Result<BTreeMap<String, ColumnValue>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT field_key, value FROM fields WHERE collection = ?1 AND doc_id = ?2 ORDER BY field_key",
    )?;
    let rows: Vec<(String, Vec<u8>)> = stmt
        .query_map(
            rusqlite::params![collection, id.as_bytes().as_slice()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)),
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let mut fields = BTreeMap::new();
    for (key, bytes) in rows {
        let value = ColumnValue::from_msgpack(&bytes)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fields.insert(key, value);
    }
    Ok(fields)
}

fn document_exists(conn: &Connection, collection: &str, id: DocumentId) -> Result<bool, StorageError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM documents WHERE collection = ?1 AND doc_id = ?2",
            rusqlite::params![collection, id.as_bytes().as_slice()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn write_field(
    conn: &Connection,
    collection: &str,
    id: DocumentId,
    field: &str,
    value: &ColumnValue,
) -> Result<(), StorageError> {
    let bytes = value
        .to_msgpack()
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    conn.execute(
        "INSERT INTO fields (collection, doc_id, field_key, value) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (collection, doc_id, field_key) DO UPDATE SET
             value = excluded.value,
             updated_at = CAST(unixepoch('now','subsec') * 1000 AS INTEGER)",
        rusqlite::params![collection, id.as_bytes().as_slice(), field, bytes],
    )?;
    Ok(())
}

#[async_trait]
impl StoreGateway for SqliteStore {
    async fn fetch_list(&self, collection: &str) -> Result<Vec<Document>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT doc_id FROM documents WHERE collection = ?1 ORDER BY rowid")?;
        let ids: Vec<Vec<u8>> = stmt
            .query_map(rusqlite::params![collection], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut documents = Vec::with_capacity(ids.len());
        for bytes in ids {
            let id = DocumentId::from_bytes(to_array::<16>(bytes, "doc_id")?);
            let fields = load_fields(&conn, collection, id)?;
            documents.push(Document { id, fields });
        }
        debug!(collection, count = documents.len(), "fetched document list");
        Ok(documents)
    }

    async fn get(
        &self,
        collection: &str,
        id: DocumentId,
    ) -> Result<Option<Document>, StorageError> {
        let conn = self.conn.lock();
        if !document_exists(&conn, collection, id)? {
            return Ok(None);
        }
        let fields = load_fields(&conn, collection, id)?;
        Ok(Some(Document { id, fields }))
    }

    async fn update_field(
        &self,
        collection: &str,
        id: DocumentId,
        field: &str,
        value: &ColumnValue,
    ) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        if !document_exists(&conn, collection, id)? {
            return Err(StorageError::NotFound(format!("{collection}/{id}")));
        }
        write_field(&conn, collection, id, field, value)?;
        debug!(collection, %id, field, "updated document field");
        Ok(())
    }

    async fn create_record(
        &self,
        collection: &str,
        fields: BTreeMap<String, ColumnValue>,
    ) -> Result<DocumentId, StorageError> {
        let mut conn = self.conn.lock();
        let id = DocumentId::new();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO documents (collection, doc_id) VALUES (?1, ?2)",
            rusqlite::params![collection, id.as_bytes().as_slice()],
        )?;
        for (field, value) in &fields {
            write_field(&tx, collection, id, field, value)?;
        }
        tx.commit()?;
        debug!(collection, %id, fields = fields.len(), "created document");
        Ok(id)
    }
}

/// Persistent local cache, the on-disk counterpart of `MemoryCache`.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = open_connection(path)?;
        crate::schema::init_cache_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open(":memory:")
    }
}

impl LocalCache for SqliteCache {
    fn get(&self, key: &str) -> Result<Option<Vec<Document>>, StorageError> {
        let conn = self.conn.lock();
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                "SELECT value FROM cache_entries WHERE cache_key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        match bytes {
            Some(bytes) => {
                let documents = rmp_serde::from_slice(&bytes)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(documents))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, documents: &[Document]) -> Result<(), StorageError> {
        let bytes = rmp_serde::to_vec(documents)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO cache_entries (cache_key, value) VALUES (?1, ?2)
             ON CONFLICT (cache_key) DO UPDATE SET
                 value = excluded.value,
                 written_at = CAST(unixepoch('now','subsec') * 1000 AS INTEGER)",
            rusqlite::params![key, bytes],
        )?;
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM cache_entries WHERE cache_key = ?1",
            rusqlite::params![key],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.conn.lock().execute("DELETE FROM cache_entries", [])?;
        Ok(())
    }
}
