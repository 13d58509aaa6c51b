//! Local vector store on sqlite-vec.
//!
//! Each collection is a row in `collections`, a vec0 table for the vectors
//! (cosine distance) and rows in `entries` for the text. Queries run a KNN scan on
//! the vec0 table and report `1 - cosine_distance` as the score.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{check_bound, check_dimension, CollectionSpec, DistanceMetric, SearchResult, VectorRecord, VectorStore};
use crate::db::{self, embedding_to_bytes, schema};
use crate::error::StoreError;

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    collection: String,
}

impl SqliteStore {
    /// Open the database at `path` and bind to `collection`.
    ///
    /// Records `embedding_model` on first use and warns when a different model
    /// wrote the existing vectors.
    pub fn open(path: &Path, collection: &str, embedding_model: &str) -> anyhow::Result<Self> {
        let conn = db::open_database(path)?;
        match schema::get_embedding_model(&conn)? {
            Some(stored) if stored != embedding_model => {
                tracing::warn!(
                    stored = %stored,
                    configured = %embedding_model,
                    "embedding model changed; existing journal vectors are not comparable"
                );
            }
            Some(_) => {}
            None => schema::set_embedding_model(&conn, embedding_model)?,
        }
        Ok(Self::from_connection(conn, collection))
    }

    /// Wrap an already initialized connection (see [`db::open_in_memory`]).
    pub fn from_connection(conn: Connection, collection: &str) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: collection.to_string(),
        }
    }

    /// Number of entries stored in the bound collection.
    pub async fn count(&self) -> Result<usize, StoreError> {
        let collection = self.collection.clone();
        self.with_conn(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM entries WHERE collection = ?1",
                [&collection],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
        .await
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Task(format!("db lock poisoned: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn collection_dimension(conn: &Connection, collection: &str) -> Result<Option<usize>, StoreError> {
    let dim = conn
        .query_row(
            "SELECT dimension FROM collections WHERE name = ?1",
            [collection],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(dim.map(|d| d as usize))
}

fn require_dimension(conn: &Connection, collection: &str) -> Result<usize, StoreError> {
    collection_dimension(conn, collection)?
        .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), StoreError> {
        super::validate_collection_name(&spec.name)?;
        check_bound(&self.collection, spec)?;
        if spec.metric != DistanceMetric::Cosine {
            return Err(StoreError::UnsupportedMetric(spec.metric.to_string()));
        }
        let spec = spec.clone();
        self.with_conn(move |conn| {
            if let Some(existing) = collection_dimension(conn, &spec.name)? {
                if existing != spec.dimension {
                    return Err(StoreError::DimensionMismatch {
                        expected: existing,
                        actual: spec.dimension,
                    });
                }
                tracing::debug!(collection = %spec.name, "collection already exists");
                return Ok(());
            }

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO collections (name, dimension, metric, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    spec.name,
                    spec.dimension as i64,
                    spec.metric.as_str(),
                    chrono::Utc::now().to_rfc3339()
                ],
            )?;
            schema::create_vector_table(&tx, &spec.name, spec.dimension)?;
            tx.commit()?;

            tracing::info!(collection = %spec.name, dimension = spec.dimension, "collection created");
            Ok(())
        })
        .await
    }

    async fn upsert(&self, record: VectorRecord) -> Result<(), StoreError> {
        let collection = self.collection.clone();
        self.with_conn(move |conn| {
            let dimension = require_dimension(conn, &collection)?;
            check_dimension(dimension, &record.values)?;

            let table = schema::vector_table(&collection);
            let tx = conn.transaction()?;
            // vec0 has no upsert; replace by delete + insert.
            tx.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [&record.id])?;
            tx.execute(
                &format!("INSERT INTO {table} (id, embedding) VALUES (?1, ?2)"),
                params![record.id, embedding_to_bytes(&record.values)],
            )?;
            tx.execute(
                "INSERT OR REPLACE INTO entries (collection, id, text, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![collection, record.id, record.text, record.created_at],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>, StoreError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let collection = self.collection.clone();
        let vector = vector.to_vec();
        self.with_conn(move |conn| {
            let dimension = require_dimension(conn, &collection)?;
            check_dimension(dimension, &vector)?;

            let sql = format!(
                "WITH knn AS (\
                    SELECT id, distance FROM {table} \
                    WHERE embedding MATCH ?1 AND k = ?2\
                 ) \
                 SELECT knn.id, knn.distance, e.text FROM knn \
                 LEFT JOIN entries e ON e.collection = ?3 AND e.id = knn.id \
                 ORDER BY knn.distance",
                table = schema::vector_table(&collection)
            );
            let mut stmt = conn.prepare(&sql)?;
            let results = stmt
                .query_map(
                    params![embedding_to_bytes(&vector), top_k as i64, collection],
                    |row| {
                        let id: String = row.get(0)?;
                        let distance: f64 = row.get(1)?;
                        let text: Option<String> = row.get(2)?;
                        Ok(SearchResult {
                            text: text.unwrap_or_else(|| id.clone()),
                            id,
                            score: (1.0 - distance) as f32,
                        })
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(results)
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(dimension: usize) -> CollectionSpec {
        CollectionSpec {
            name: "journal-entries".into(),
            dimension,
            metric: DistanceMetric::Cosine,
            cloud: "aws".into(),
            region: "us-east-1".into(),
        }
    }

    fn record(id: &str, values: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.into(),
            values,
            text: format!("text of {id}"),
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn store() -> SqliteStore {
        SqliteStore::from_connection(db::open_in_memory().unwrap(), "journal-entries")
    }

    #[tokio::test]
    async fn ensure_collection_rejects_other_collection() {
        let store = store();
        let mut other = spec(4);
        other.name = "travel".into();
        let err = store.ensure_collection(&other).await.unwrap_err();
        assert!(matches!(err, StoreError::CollectionMismatch { .. }));
        assert!(matches!(
            store.query(&[1.0, 0.0, 0.0, 0.0], 1).await,
            Err(StoreError::UnknownCollection(_))
        ));
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let store = store();
        store.ensure_collection(&spec(4)).await.unwrap();
        store.ensure_collection(&spec(4)).await.unwrap();
    }

    #[tokio::test]
    async fn ensure_collection_rejects_dimension_change() {
        let store = store();
        store.ensure_collection(&spec(4)).await.unwrap();
        let err = store.ensure_collection(&spec(8)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch { expected: 4, actual: 8 }
        ));
    }

    #[tokio::test]
    async fn non_cosine_metric_is_unsupported() {
        let store = store();
        let mut s = spec(4);
        s.metric = DistanceMetric::Dotproduct;
        let err = store.ensure_collection(&s).await.unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedMetric(_)));
    }

    #[tokio::test]
    async fn query_before_ensure_is_unknown_collection() {
        let store = store();
        let err = store.query(&[1.0, 0.0, 0.0, 0.0], 3).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownCollection(_)));
    }

    #[tokio::test]
    async fn query_orders_by_descending_score() {
        let store = store();
        store.ensure_collection(&spec(4)).await.unwrap();
        store.upsert(record("a", vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        store.upsert(record("b", vec![0.6, 0.8, 0.0, 0.0])).await.unwrap();
        store.upsert(record("c", vec![0.0, 0.0, 1.0, 0.0])).await.unwrap();

        let results = store.query(&[1.0, 0.0, 0.0, 0.0], 3).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert!((results[1].score - 0.6).abs() < 1e-5);
        assert!(results[2].score.abs() < 1e-5);
        assert_eq!(results[0].text, "text of a");
    }

    #[tokio::test]
    async fn query_respects_top_k() {
        let store = store();
        store.ensure_collection(&spec(4)).await.unwrap();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let mut v = vec![0.0; 4];
            v[i] = 1.0;
            store.upsert(record(id, v)).await.unwrap();
        }
        assert_eq!(store.query(&[1.0, 0.0, 0.0, 0.0], 2).await.unwrap().len(), 2);
        assert!(store.query(&[1.0, 0.0, 0.0, 0.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_overwrites_same_key() {
        let store = store();
        store.ensure_collection(&spec(4)).await.unwrap();
        store.upsert(record("a", vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        let mut replacement = record("a", vec![0.0, 1.0, 0.0, 0.0]);
        replacement.text = "rewritten".into();
        store.upsert(replacement).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let results = store.query(&[0.0, 1.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "rewritten");
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn upsert_rejects_wrong_dimension() {
        let store = store();
        store.ensure_collection(&spec(4)).await.unwrap();
        let err = store.upsert(record("a", vec![1.0, 0.0])).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch { expected: 4, actual: 2 }
        ));
    }
}
