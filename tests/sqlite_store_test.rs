mod helpers;

use helpers::{collection_spec, VocabularyEmbedder, COLLECTION};
use penpal::config::StoreConfig;
use penpal::db::{open_database, schema};
use penpal::embedding::EmbeddingProvider;
use penpal::error::StoreError;
use penpal::store::sqlite::SqliteStore;
use penpal::store::{open_store, VectorRecord, VectorStore};

fn record(embedder: &VocabularyEmbedder, id: &str, text: &str) -> VectorRecord {
    VectorRecord {
        id: id.to_string(),
        values: embedder.embed(text).unwrap(),
        text: text.to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[tokio::test]
async fn entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.db");
    let embedder = VocabularyEmbedder::default();

    {
        let store = SqliteStore::open(&path, COLLECTION, "all-MiniLM-L6-v2").unwrap();
        store.ensure_collection(&collection_spec()).await.unwrap();
        store
            .upsert(record(&embedder, "a", "walked the dog in the park"))
            .await
            .unwrap();
        store
            .upsert(record(&embedder, "b", "finished reading a novel"))
            .await
            .unwrap();
    }

    let store = SqliteStore::open(&path, COLLECTION, "all-MiniLM-L6-v2").unwrap();
    store.ensure_collection(&collection_spec()).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);

    let query = embedder.embed("dog park").unwrap();
    let results = store.query(&query, 5).await.unwrap();
    assert_eq!(results[0].id, "a");
    assert_eq!(results[0].text, "walked the dog in the park");
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn collections_in_one_database_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.db");
    let embedder = VocabularyEmbedder::default();

    let work = SqliteStore::open(&path, "work", "m").unwrap();
    let mut spec = collection_spec();
    spec.name = "work".to_string();
    work.ensure_collection(&spec).await.unwrap();
    work.upsert(record(&embedder, "w1", "quarterly planning meeting"))
        .await
        .unwrap();

    let home = SqliteStore::open(&path, "home", "m").unwrap();
    spec.name = "home".to_string();
    home.ensure_collection(&spec).await.unwrap();

    assert_eq!(work.count().await.unwrap(), 1);
    assert_eq!(home.count().await.unwrap(), 0);
    let query = embedder.embed("planning meeting").unwrap();
    assert!(home.query(&query, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn embedding_model_change_keeps_recorded_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.db");

    SqliteStore::open(&path, COLLECTION, "all-MiniLM-L6-v2").unwrap();
    // Reopening with another model still works; the first model stays recorded.
    SqliteStore::open(&path, COLLECTION, "other-model").unwrap();

    let conn = open_database(&path).unwrap();
    assert_eq!(
        schema::get_embedding_model(&conn).unwrap().as_deref(),
        Some("all-MiniLM-L6-v2")
    );
}

#[tokio::test]
async fn open_store_selects_sqlite_backend() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        provider: "sqlite".to_string(),
        db_path: dir.path().join("nested/journal.db").to_string_lossy().into_owned(),
        ..StoreConfig::default()
    };

    let store = open_store(&config, "all-MiniLM-L6-v2").unwrap();
    assert_eq!(store.backend(), "sqlite");
    store.ensure_collection(&collection_spec()).await.unwrap();
    assert!(dir.path().join("nested/journal.db").exists());
}

#[tokio::test]
async fn open_store_rejects_bad_configuration() {
    let config = StoreConfig {
        provider: "sqlite".to_string(),
        collection: "Bad_Name".to_string(),
        ..StoreConfig::default()
    };
    assert!(open_store(&config, "m").is_err());

    let config = StoreConfig {
        provider: "chroma".to_string(),
        ..StoreConfig::default()
    };
    let err = open_store(&config, "m").err().unwrap();
    assert!(err.to_string().contains("unknown store provider"));

    let config = StoreConfig {
        provider: "pinecone".to_string(),
        api_key: None,
        ..StoreConfig::default()
    };
    assert!(open_store(&config, "m").is_err());
}

#[tokio::test]
async fn query_with_wrong_dimension_fails() {
    let store = helpers::sqlite_store().await;
    let err = store.query(&[1.0, 0.0], 3).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::DimensionMismatch { expected: 384, actual: 2 }
    ));
}
