//! Insert-once persistence of findings into relational result stores.
//!
//! A delivery opens one session, begins a transaction, checks for an
//! existing row with the same link, inserts when there is none, and always
//! finishes the session (commit and close) whatever happened in between.

use crate::core::{Delivery, Finding};
use crate::error::SinkError;
use crate::formatting::format_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

/// Status given to newly recorded findings.
pub const OPEN_STATUS: &str = "Open";

/// Connection parameters shared by the result stores.
#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatabaseSettings {
    pub host: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// The table layout a session writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSchema {
    /// `results(title, plugin, status, domain, link, created_at, updated_at,
    /// output_file, result_type, task_id)`
    Scrummage,
    /// `results(title, url, created_at, updated_at, domain)`
    Scumblr,
}

impl ResultSchema {
    fn exists_query(self) -> &'static str {
        match self {
            ResultSchema::Scrummage => "SELECT 1 FROM results WHERE link = $1 LIMIT 1",
            ResultSchema::Scumblr => "SELECT 1 FROM results WHERE url = $1 LIMIT 1",
        }
    }
}

/// One open connection to a result store.
#[async_trait]
pub trait StoreSession: Send {
    /// Starts the transaction the check and insert run in.
    async fn begin(&mut self) -> Result<(), SinkError>;

    /// Returns whether a row with exactly this link exists.
    async fn link_exists(&mut self, link: &str) -> Result<bool, SinkError>;

    async fn insert(&mut self, finding: &Finding, at: DateTime<Local>) -> Result<(), SinkError>;

    /// Commits outstanding work and closes the connection.
    async fn finish(self: Box<Self>) -> Result<(), SinkError>;
}

/// Opens sessions against a result store.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn open(
        &self,
        target: &DatabaseSettings,
        schema: ResultSchema,
    ) -> Result<Box<dyn StoreSession>, SinkError>;
}

/// Records a finding unless a row with the same link already exists.
pub async fn record_once(
    connector: &dyn StoreConnector,
    target: &DatabaseSettings,
    schema: ResultSchema,
    finding: &Finding,
) -> Result<Delivery, SinkError> {
    let mut session = connector.open(target, schema).await?;
    let written = match session.begin().await {
        Ok(()) => insert_if_absent(session.as_mut(), finding).await,
        Err(e) => Err(e),
    };
    let finished = session.finish().await;
    let delivery = written?;
    finished?;
    Ok(delivery)
}

async fn insert_if_absent(
    session: &mut dyn StoreSession,
    finding: &Finding,
) -> Result<Delivery, SinkError> {
    if session.link_exists(&finding.link).await? {
        return Ok(Delivery::Duplicate);
    }
    session.insert(finding, Local::now()).await?;
    Ok(Delivery::Delivered)
}

/// Connects to PostgreSQL, one connection per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

#[async_trait]
impl StoreConnector for PgConnector {
    async fn open(
        &self,
        target: &DatabaseSettings,
        schema: ResultSchema,
    ) -> Result<Box<dyn StoreSession>, SinkError> {
        let options = PgConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .username(&target.user)
            .password(&target.password)
            .database(&target.database);
        let conn = PgConnection::connect_with(&options).await?;
        Ok(Box::new(PgSession { conn, schema }))
    }
}

struct PgSession {
    conn: PgConnection,
    schema: ResultSchema,
}

#[async_trait]
impl StoreSession for PgSession {
    async fn begin(&mut self) -> Result<(), SinkError> {
        sqlx::query("BEGIN").execute(&mut self.conn).await?;
        Ok(())
    }

    async fn link_exists(&mut self, link: &str) -> Result<bool, SinkError> {
        let row = sqlx::query_scalar::<_, i32>(self.schema.exists_query())
            .bind(link)
            .fetch_optional(&mut self.conn)
            .await?;
        Ok(row.is_some())
    }

    async fn insert(&mut self, finding: &Finding, at: DateTime<Local>) -> Result<(), SinkError> {
        match self.schema {
            ResultSchema::Scrummage => {
                let stamp = format_timestamp(at);
                sqlx::query(
                    r"
                    INSERT INTO results (
                        title, plugin, status, domain, link, created_at, updated_at,
                        output_file, result_type, task_id
                    ) VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8, $9)
                    ",
                )
                .bind(&finding.title)
                .bind(&finding.plugin_name)
                .bind(OPEN_STATUS)
                .bind(&finding.domain)
                .bind(&finding.link)
                .bind(&stamp)
                .bind(&finding.output_file)
                .bind(&finding.result_type)
                .bind(finding.task_id)
                .execute(&mut self.conn)
                .await?;
            }
            ResultSchema::Scumblr => {
                sqlx::query(
                    r"
                    INSERT INTO results (title, url, created_at, updated_at, domain)
                    VALUES ($1, $2, $3, $3, $4)
                    ",
                )
                .bind(&finding.title)
                .bind(&finding.link)
                .bind(at.naive_local())
                .bind(&finding.domain)
                .execute(&mut self.conn)
                .await?;
            }
        }
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<(), SinkError> {
        let PgSession { mut conn, .. } = *self;
        let committed = sqlx::query("COMMIT").execute(&mut conn).await;
        let closed = conn.close().await;
        committed?;
        closed?;
        Ok(())
    }
}
