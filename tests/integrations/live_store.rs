//! Live integration tests for the PostgreSQL result stores.
//!
//! These tests need a PostgreSQL server the configured user can create tables
//! on, with two databases (one per store). They are enabled with the
//! `live-tests` feature flag and read their connection details from the
//! environment:
//!
//! - `SCRUMMAGE_LIVE_PG_HOST` (default `127.0.0.1`)
//! - `SCRUMMAGE_LIVE_PG_PORT` (default `5432`)
//! - `SCRUMMAGE_LIVE_PG_USER` / `SCRUMMAGE_LIVE_PG_PASSWORD` (default `postgres`)
//! - `SCRUMMAGE_LIVE_PG_DATABASE` (default `scrummage_live`)
//! - `SCRUMMAGE_LIVE_SCUMBLR_DATABASE` (default `scumblr_live`)
//!
//! To run these tests:
//! `cargo test --test live_store --features live-tests -- --nocapture`

#![cfg(feature = "live-tests")]

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::sample_finding;
use scrummage_connectors::core::Delivery;
use scrummage_connectors::sinks::{PrimaryStoreSink, ScumblrSink};
use scrummage_connectors::StaticConfig;
use serde_json::{json, Value};
use serial_test::serial;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::sync::Arc;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn section(database: &str) -> Value {
    json!({
        "host": env_or("SCRUMMAGE_LIVE_PG_HOST", "127.0.0.1"),
        "port": env_or("SCRUMMAGE_LIVE_PG_PORT", "5432"),
        "user": env_or("SCRUMMAGE_LIVE_PG_USER", "postgres"),
        "password": env_or("SCRUMMAGE_LIVE_PG_PASSWORD", "postgres"),
        "database": database,
    })
}

fn primary_database() -> String {
    env_or("SCRUMMAGE_LIVE_PG_DATABASE", "scrummage_live")
}

fn scumblr_database() -> String {
    env_or("SCRUMMAGE_LIVE_SCUMBLR_DATABASE", "scumblr_live")
}

fn config() -> Arc<StaticConfig> {
    Arc::new(StaticConfig(json!({
        "postgresql": [section(&primary_database())],
        "scumblr": [section(&scumblr_database())],
    })))
}

async fn connect(database: &str) -> PgConnection {
    let port = env_or("SCRUMMAGE_LIVE_PG_PORT", "5432").parse().unwrap();
    let options = PgConnectOptions::new()
        .host(&env_or("SCRUMMAGE_LIVE_PG_HOST", "127.0.0.1"))
        .port(port)
        .username(&env_or("SCRUMMAGE_LIVE_PG_USER", "postgres"))
        .password(&env_or("SCRUMMAGE_LIVE_PG_PASSWORD", "postgres"))
        .database(database);
    PgConnection::connect_with(&options).await.unwrap()
}

/// Creates the `results` table of each store if needed.
async fn prepare_tables() {
    let mut primary = connect(&primary_database()).await;
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS results (
            result_id SERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            plugin TEXT NOT NULL,
            status TEXT NOT NULL,
            domain TEXT NOT NULL,
            link TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            output_file TEXT NOT NULL,
            result_type TEXT NOT NULL,
            task_id BIGINT NOT NULL
        )
        ",
    )
    .execute(&mut primary)
    .await
    .unwrap();
    primary.close().await.unwrap();

    let mut scumblr = connect(&scumblr_database()).await;
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS results (
            id SERIAL PRIMARY KEY,
            title TEXT,
            url TEXT,
            created_at TIMESTAMP,
            updated_at TIMESTAMP,
            domain TEXT
        )
        ",
    )
    .execute(&mut scumblr)
    .await
    .unwrap();
    scumblr.close().await.unwrap();
}

/// A link no earlier run has stored.
fn fresh_link(label: &str) -> String {
    format!(
        "http://live.test/{}/{}",
        label,
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

#[tokio::test]
#[serial]
async fn test_primary_store_inserts_once_per_link() {
    prepare_tables().await;
    let sink = PrimaryStoreSink::new(config());
    let link = fresh_link("primary");
    let finding = sample_finding(&link);

    assert!(matches!(sink.try_record(&finding).await, Ok(Delivery::Delivered)));
    assert!(matches!(sink.try_record(&finding).await, Ok(Delivery::Duplicate)));

    let mut conn = connect(&primary_database()).await;
    let rows: Vec<(String, String, String, i64)> =
        sqlx::query_as("SELECT status, plugin, created_at, task_id FROM results WHERE link = $1")
            .bind(&link)
            .fetch_all(&mut conn)
            .await
            .unwrap();
    assert_eq!(rows.len(), 1);
    let (status, plugin, created_at, task_id) = &rows[0];
    assert_eq!(status, "Open");
    assert_eq!(plugin, "Domain Fuzzer");
    assert_eq!(*task_id, 1);
    assert!(chrono::NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S%.6f").is_ok());
}

#[tokio::test]
#[serial]
async fn test_primary_store_matches_links_exactly() {
    prepare_tables().await;
    let sink = PrimaryStoreSink::new(config());
    let link = fresh_link("exact");
    let longer = format!("{}/page", link);
    let wildcard = format!("{}%", link);

    sink.record(&sample_finding(&longer)).await;
    assert!(matches!(sink.try_record(&sample_finding(&link)).await, Ok(Delivery::Delivered)));
    assert!(matches!(sink.try_record(&sample_finding(&wildcard)).await, Ok(Delivery::Delivered)));

    let mut conn = connect(&primary_database()).await;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM results WHERE link LIKE $1")
        .bind(format!("{}%", link))
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
#[serial]
async fn test_scumblr_store_inserts_once_per_url() {
    prepare_tables().await;
    let sink = ScumblrSink::new(config());
    let link = fresh_link("scumblr");
    let finding = sample_finding(&link);

    assert!(matches!(sink.try_record(&finding).await, Ok(Delivery::Delivered)));
    assert!(matches!(sink.try_record(&finding).await, Ok(Delivery::Duplicate)));

    let mut conn = connect(&scumblr_database()).await;
    let rows: Vec<(String, Option<chrono::NaiveDateTime>)> =
        sqlx::query_as("SELECT domain, created_at FROM results WHERE url = $1")
            .bind(&link)
            .fetch_all(&mut conn)
            .await
            .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "examp1e.com");
    assert!(rows[0].1.is_some());
}
