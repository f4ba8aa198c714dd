//! Redshift over the Postgres wire protocol

use super::{TextRow, Warehouse, WarehouseSession};
use crate::config::WarehouseConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, PgSslMode};
use sqlx::{Connection, Executor, Row};
use std::str::FromStr;
use tracing::debug;

/// Connects to Redshift with one fresh connection per session
#[derive(Clone)]
pub struct RedshiftWarehouse {
    options: PgConnectOptions,
    endpoint: String,
}

impl std::fmt::Debug for RedshiftWarehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedshiftWarehouse")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl RedshiftWarehouse {
    /// Build connection options from config
    pub fn from_config(config: &WarehouseConfig) -> Result<Self> {
        let host = config.require_host()?;
        let database = config.require_database()?;
        let user = config.require_user()?;
        let ssl_mode = PgSslMode::from_str(&config.ssl_mode)
            .map_err(|e| Error::invalid_value("ssl_mode", e.to_string()))?;

        // Redshift rejects extra_float_digits=3
        let mut options = PgConnectOptions::new()
            .host(host)
            .port(config.port)
            .database(database)
            .username(user)
            .ssl_mode(ssl_mode)
            .extra_float_digits(None::<i8>);

        if let Some(password) = &config.password {
            options = options.password(password);
        }

        Ok(Self {
            options,
            endpoint: format!("{host}:{}/{database}", config.port),
        })
    }

    /// `host:port/database`, for logs
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Warehouse for RedshiftWarehouse {
    async fn connect(&self) -> Result<Box<dyn WarehouseSession>> {
        debug!("Connecting to {}", self.endpoint);
        let conn = PgConnection::connect_with(&self.options).await?;
        Ok(Box::new(RedshiftSession { conn }))
    }
}

struct RedshiftSession {
    conn: PgConnection,
}

#[async_trait]
impl WarehouseSession for RedshiftSession {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        debug!("Executing: {sql}");
        // Plain &str runs over the simple query protocol
        let conn: &mut PgConnection = &mut self.conn;
        conn.execute(sql).await?;
        Ok(())
    }

    async fn fetch_row(&mut self, sql: &str) -> Result<Option<TextRow>> {
        debug!("Querying: {sql}");
        let conn: &mut PgConnection = &mut self.conn;
        let row: Option<PgRow> = conn.fetch_optional(sql).await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut values = TextRow::with_capacity(row.len());
        for i in 0..row.len() {
            values.push(row.try_get::<Option<String>, _>(i)?);
        }
        Ok(Some(values))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}
