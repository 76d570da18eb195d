//! Extraction tests against a DuckDB store holding HAPI tables
//!
//! Most tests use an in-memory database. The PostgreSQL test needs a live
//! HAPI database; set POSTGRES_TEST_URL to run it.

use futures::StreamExt;
use hapi_extract::config::{DatabaseConfig, DatabaseEngine as DbType};
use hapi_extract::decode::compress_payload;
use hapi_extract::{
    plan, ConnectionProvider, DatabaseEngine, DuckDbPool, Error, ExtractSettings,
    ExtractionConfig, ExtractionEngine, PartitionDescriptor, RowFetcher,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const PATIENTS: i64 = 60;
const ENCOUNTERS: i64 = 10;

const SCHEMA: &str = "
CREATE TABLE hfj_resource (
    res_id BIGINT PRIMARY KEY,
    res_type VARCHAR NOT NULL,
    res_updated TIMESTAMP NOT NULL,
    res_ver BIGINT NOT NULL
);
CREATE TABLE hfj_res_ver (
    res_id BIGINT NOT NULL,
    res_ver BIGINT NOT NULL,
    res_encoding VARCHAR NOT NULL,
    res_text BLOB
);
";

fn resource_json(resource_type: &str, id: i64, version: i64) -> String {
    format!(r#"{{"resourceType":"{resource_type}","id":"{id}","meta":{{"versionId":"{version}"}}}}"#)
}

fn insert_resource(conn: &duckdb::Connection, id: i64, resource_type: &str) {
    conn.execute(
        "INSERT INTO hfj_resource VALUES (?, ?, TIMESTAMP '2024-03-01 10:00:00', 2)",
        duckdb::params![id, resource_type],
    )
    .unwrap();

    // Superseded version, never extracted
    conn.execute(
        "INSERT INTO hfj_res_ver VALUES (?, 1, 'JSON', ?)",
        duckdb::params![id, resource_json(resource_type, id, 1).into_bytes()],
    )
    .unwrap();

    let current = resource_json(resource_type, id, 2);
    let (encoding, content) = if id % 10 == 0 {
        ("DEL", None)
    } else if id % 3 == 0 {
        ("JSONC", Some(compress_payload(&current).unwrap()))
    } else {
        ("JSON", Some(current.into_bytes()))
    };
    conn.execute(
        "INSERT INTO hfj_res_ver VALUES (?, 2, ?, ?)",
        duckdb::params![id, encoding, content],
    )
    .unwrap();
}

fn seed(conn: &duckdb::Connection) {
    conn.execute_batch(SCHEMA).unwrap();
    for id in 1..=PATIENTS {
        insert_resource(conn, id, "Patient");
    }
    for id in PATIENTS + 1..=PATIENTS + ENCOUNTERS {
        insert_resource(conn, id, "Encounter");
    }
}

fn seeded_pool(pool_size: u32) -> Arc<DuckDbPool> {
    let engine = DatabaseEngine::open_in_memory().unwrap();
    seed(engine.connection());
    Arc::new(DuckDbPool::new(engine, pool_size).unwrap())
}

#[tokio::test]
async fn test_fetch_partition_returns_residue_class() {
    let pool = seeded_pool(2);
    let fetcher = RowFetcher::new(Arc::clone(&pool));

    let descriptors = plan("Patient", 2, 3, 1).unwrap();
    assert_eq!(descriptors.len(), 2);

    for descriptor in descriptors {
        let remainder = i64::from(descriptor.remainder);
        let records = fetcher
            .fetch_partition(descriptor)
            .collect_records()
            .await
            .unwrap();

        let expected: Vec<i64> = (1..=PATIENTS).filter(|id| id % 6 == remainder).collect();
        let mut ids: Vec<i64> = records
            .iter()
            .map(|r| r.resource_id.parse().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, expected);

        for record in &records {
            assert_eq!(record.resource_type, "Patient");
            assert_eq!(record.resource_version, 2);
            assert_eq!(record.last_updated, "2024-03-01 10:00:00");
            let id: i64 = record.resource_id.parse().unwrap();
            if id % 10 == 0 {
                assert!(record.is_deleted());
            } else {
                assert_eq!(record.payload, resource_json("Patient", id, 2));
            }
        }
    }
}

#[tokio::test]
async fn test_count_resources() {
    let pool = seeded_pool(2);
    let engine = ExtractionEngine::new(pool, ExtractSettings::default());

    assert_eq!(engine.count("Patient").await.unwrap(), PATIENTS as u64);
    assert_eq!(engine.count("Encounter").await.unwrap(), ENCOUNTERS as u64);
    assert_eq!(engine.count("Observation").await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_engine_extracts_current_versions_once() {
    let pool = seeded_pool(3);
    let settings = ExtractSettings::default().with_rows_per_batch(16);
    let engine = ExtractionEngine::new(Arc::clone(&pool), settings);

    let mut seen = HashSet::new();
    let stats = engine
        .run("Patient", |record| {
            assert!(!record.payload.contains(r#""versionId":"1""#));
            assert!(seen.insert(record.resource_id.clone()), "duplicate {}", record.resource_id);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(seen.len(), PATIENTS as usize);
    assert_eq!(stats.records, PATIENTS as u64);
    assert_eq!(stats.tombstones, 6);
    assert_eq!(stats.batches, 4);
    assert_eq!(stats.partitions_completed, 12);
    assert_eq!(stats.partitions_failed, 0);
    assert_eq!(pool.available(), 3);
}

#[tokio::test]
async fn test_unknown_encoding_fails_partition() {
    let engine = DatabaseEngine::open_in_memory().unwrap();
    seed(engine.connection());
    engine
        .connection()
        .execute_batch(
            "UPDATE hfj_res_ver SET res_encoding = 'XML' WHERE res_id = 7 AND res_ver = 2;",
        )
        .unwrap();
    let pool = Arc::new(DuckDbPool::new(engine, 2).unwrap());

    let strict = ExtractionEngine::new(Arc::clone(&pool), ExtractSettings::default());
    let result = strict.run("Patient", |_| Ok(())).await;
    assert!(matches!(result, Err(Error::UnknownEncoding { ref encoding, .. }) if encoding == "XML"));

    let lenient = ExtractionEngine::new(pool, ExtractSettings::default().with_fail_fast(false));
    let stats = lenient.run("Patient", |_| Ok(())).await.unwrap();
    assert_eq!(stats.partitions_failed, 1);
    assert_eq!(stats.partitions_completed, 1);
}

#[tokio::test]
async fn test_dropped_stream_releases_connection() {
    let pool = seeded_pool(1);
    let fetcher = RowFetcher::new(Arc::clone(&pool)).with_channel_capacity(1);

    let descriptor = plan("Patient", 1, 1, 0).unwrap().remove(0);
    let mut stream = fetcher.fetch_partition(descriptor);
    assert!(stream.next().await.unwrap().is_ok());
    drop(stream);

    let connection = tokio::time::timeout(Duration::from_secs(5), pool.acquire())
        .await
        .expect("pool slot was not released")
        .unwrap();
    drop(connection);
    assert_eq!(pool.available(), 1);
}

#[tokio::test]
async fn test_closed_pool_rejects_fetch() {
    let pool = seeded_pool(1);
    pool.close();
    let fetcher = RowFetcher::new(Arc::clone(&pool));

    let descriptor = plan("Patient", 1, 1, 0).unwrap().remove(0);
    let result = fetcher.fetch_partition(descriptor).collect_records().await;
    assert!(matches!(result, Err(Error::Pool { .. })));
}

#[tokio::test]
async fn test_malformed_descriptor_is_rejected() {
    let pool = seeded_pool(1);
    let fetcher = RowFetcher::new(Arc::clone(&pool));

    assert!(serde_json::from_str::<PartitionDescriptor>(
        r#"{"resource_type":"Patient","modulus":4,"remainder":9}"#
    )
    .is_err());

    let descriptor = PartitionDescriptor {
        resource_type: "Patient".to_string(),
        modulus: 0,
        remainder: 0,
    };
    let result = fetcher.fetch_partition(descriptor).collect_records().await;
    assert!(matches!(result, Err(Error::InvalidConfiguration { .. })));
    assert_eq!(pool.available(), 1);
}

#[tokio::test]
async fn test_planned_descriptor_from_json() {
    let pool = seeded_pool(1);
    let fetcher = RowFetcher::new(Arc::clone(&pool));

    let json = serde_json::to_string(&plan("Patient", 2, 2, 1).unwrap()[1]).unwrap();
    let descriptor: PartitionDescriptor = serde_json::from_str(&json).unwrap();
    let records = fetcher.fetch_partition(descriptor).collect_records().await.unwrap();

    assert_eq!(records.len(), (1..=PATIENTS).filter(|id| id % 4 == 3).count());
}

#[tokio::test]
async fn test_attached_duckdb_file_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hapi.duckdb");
    {
        let conn = duckdb::Connection::open(&path).unwrap();
        seed(&conn);
    }

    let yaml = format!(
        "database:\n  engine: duckdb\n  connection_string: '{}'\nextraction:\n  pool_size: 2\n  batch_count: 2\nresource_types: [Encounter]\n",
        path.display()
    );
    let config = ExtractionConfig::from_yaml_str(&yaml).unwrap();

    let store = DatabaseEngine::new(&config.database).unwrap();
    assert_eq!(store.table_prefix(), Some("source_db"));
    store.check_connection().unwrap();

    let pool = Arc::new(DuckDbPool::new(store, config.extraction.pool_size).unwrap());
    let engine = ExtractionEngine::new(pool, config.extraction.clone());

    let mut ids = Vec::new();
    let stats = engine
        .run(&config.resource_types[0], |record| {
            ids.push(record.resource_id.parse::<i64>().unwrap());
            Ok(())
        })
        .await
        .unwrap();

    ids.sort_unstable();
    assert_eq!(ids, (PATIENTS + 1..=PATIENTS + ENCOUNTERS).collect::<Vec<_>>());
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.tombstones, 1);
}

#[tokio::test]
async fn test_postgres_extraction() {
    let Ok(conn_str) = std::env::var("POSTGRES_TEST_URL") else {
        println!("Skipping: POSTGRES_TEST_URL not set");
        return;
    };

    let config = DatabaseConfig {
        engine: DbType::Postgres,
        connection_string: Some(conn_str),
        host: None,
        port: None,
        database: None,
        user: None,
        password: None,
        schema: None,
    };

    let store = DatabaseEngine::new(&config).unwrap();
    store.check_connection().unwrap();

    let pool = Arc::new(DuckDbPool::new(store, 2).unwrap());
    let engine = ExtractionEngine::new(pool, ExtractSettings::default());
    let expected = engine.count("Patient").await.unwrap();

    let stats = engine.run("Patient", |_| Ok(())).await.unwrap();
    assert_eq!(stats.records, expected);
}
