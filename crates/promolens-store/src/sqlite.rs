//! SQLite-backed append-only vector index.
//!
//! Similarity search is a full scan: candidate rows are stacked into a
//! row-normalised matrix and scored with one matrix-vector product. At the
//! expected scale of thousands of records per hotel this stays well under
//! interactive latency.

use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView1};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::embedding::{decode_vector, encode_vector, normalized};
use crate::schema::{DIMENSION_KEY, SCHEMA_SQL};
use crate::types::*;
use promolens_core::{Error, Result};

pub struct VectorStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    dimension: usize,
}

impl VectorStore {
    /// Open or create the index in `db_dir` (file `promolens.db`).
    ///
    /// An index is pinned to the dimension it was created with; reopening it
    /// with a different dimension fails.
    pub fn open(db_dir: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Persistence(e.to_string()))?;
        let db_path = db_dir.join("promolens.db");

        let conn = Self::create_connection(&db_path)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Self::pin_dimension(&conn, dimension)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
            dimension,
        };
        info!(
            "VectorStore opened: {} records, dim={}, path={}",
            store.count()?,
            dimension,
            store.db_path.display()
        );
        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    fn pin_dimension(conn: &Connection, dimension: usize) -> Result<()> {
        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![DIMENSION_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        match stored {
            Some(value) if value == dimension.to_string() => Ok(()),
            Some(value) => Err(Error::Config(format!(
                "index was created with dimension {}, configured dimension is {}",
                value, dimension
            ))),
            None => {
                conn.execute(
                    "INSERT INTO index_meta (key, value) VALUES (?1, ?2)",
                    params![DIMENSION_KEY, dimension.to_string()],
                )
                .map_err(|e| Error::Database(e.to_string()))?;
                Ok(())
            }
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Append one record. Existing ids are never overwritten.
    pub fn insert(&self, record: &VectorRecord) -> Result<()> {
        if record.dimension() != self.dimension {
            return Err(Error::Persistence(format!(
                "record {} has dimension {}, index expects {}",
                record.id,
                record.dimension(),
                self.dimension
            )));
        }
        let metadata_json = serde_json::to_string(&record.metadata)?;
        let created_ms = record.metadata.created_at.timestamp_millis();

        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO vector_records (id, platform_id, text, vector, dimension, metadata_json, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .map_err(|e| Error::Persistence(e.to_string()))?
        .execute(params![
            record.id,
            record.metadata.platform_id,
            record.text,
            encode_vector(&record.vector),
            record.dimension() as i64,
            metadata_json,
            created_ms,
        ])
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                Error::Persistence(format!("record id {} already exists", record.id))
            } else {
                Error::Persistence(e.to_string())
            }
        })?;
        debug!("Stored record {} for platform {}", record.id, record.metadata.platform_id);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT id, text, vector, metadata_json FROM vector_records WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![id], Self::read_row)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        row.map(Self::into_record).transpose()
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM vector_records", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Records for one platform, oldest first.
    pub fn list_for_platform(&self, platform_id: &str) -> Result<Vec<VectorRecord>> {
        self.load(Some(platform_id))
    }

    /// Rank records by cosine similarity to `query`, highest first.
    ///
    /// Equal similarities keep insertion order (then id), so repeated
    /// queries over the same index return the same ranking.
    pub fn find_similar(
        &self,
        query: ArrayView1<'_, f32>,
        limit: usize,
        platform_id: Option<&str>,
    ) -> Result<Vec<SimilarRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(Error::Config(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let records = self.load(platform_id)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut matrix = Array2::<f32>::zeros((records.len(), self.dimension));
        for (i, record) in records.iter().enumerate() {
            let row = ArrayView1::from(record.vector.as_slice());
            matrix.row_mut(i).assign(&normalized(row));
        }
        // Zero rows and a zero query both score 0.
        let similarities = matrix.dot(&normalized(query));

        let mut ranked: Vec<SimilarRecord> = records
            .into_iter()
            .zip(similarities.iter())
            .map(|(record, &s)| SimilarRecord {
                record,
                similarity: s.clamp(-1.0, 1.0),
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.record.metadata.created_at.cmp(&b.record.metadata.created_at))
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let records = self.count()?;
        let platforms: i64 = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT COUNT(DISTINCT platform_id) FROM vector_records",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?
        };
        let db_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(IndexStats {
            records,
            platforms,
            dimension: self.dimension,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb: db_size as f64 / (1024.0 * 1024.0),
        })
    }

    /// All rows (optionally for one platform), oldest first. Rows whose
    /// vector does not match the index dimension are skipped.
    fn load(&self, platform_id: Option<&str>) -> Result<Vec<VectorRecord>> {
        let rows = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id, text, vector, metadata_json FROM vector_records \
                     WHERE (?1 IS NULL OR platform_id = ?1) \
                     ORDER BY created_at ASC, id ASC",
                )
                .map_err(|e| Error::Database(e.to_string()))?;
            let mapped = stmt
                .query_map(params![platform_id], Self::read_row)
                .map_err(|e| Error::Database(e.to_string()))?;
            let rows = mapped
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::Database(e.to_string()))?;
            rows
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record = Self::into_record(row)?;
            if record.dimension() != self.dimension {
                warn!(
                    "Skipping record {} with dimension {} (index dim {})",
                    record.id,
                    record.dimension(),
                    self.dimension
                );
                continue;
            }
            records.push(record);
        }
        Ok(records)
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
        Ok(RawRow {
            id: row.get(0)?,
            text: row.get(1)?,
            vector: row.get(2)?,
            metadata_json: row.get(3)?,
        })
    }

    fn into_record(row: RawRow) -> Result<VectorRecord> {
        let metadata: RecordMetadata = serde_json::from_str(&row.metadata_json)
            .map_err(|e| Error::Database(format!("record {}: bad metadata: {}", row.id, e)))?;
        Ok(VectorRecord {
            vector: decode_vector(&row.vector)?,
            id: row.id,
            text: row.text,
            metadata,
        })
    }
}

struct RawRow {
    id: String,
    text: String,
    vector: Vec<u8>,
    metadata_json: String,
}
