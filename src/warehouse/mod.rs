//! Warehouse module
//!
//! Truncate-then-load of uploaded objects into Redshift tables with the
//! native `COPY ... FROM 's3://...'` statement, plus a read-only summary of
//! the output tables.
//!
//! Connections go through the [`Warehouse`] trait so the loader and the
//! orchestrator can run against a recording fake.

mod loader;
mod redshift;
mod statements;
mod summary;

pub use loader::{LoadedTable, WarehouseLoader};
pub use redshift::RedshiftWarehouse;
pub use statements::{
    copy_statement, truncate_statement, validate_identifier, validate_object_key,
};
pub use summary::{summarize, BusiestRoute, TableCount, WarehouseSummary, OUTPUT_TABLES};

use crate::error::Result;
use async_trait::async_trait;

/// A row returned as text columns
pub type TextRow = Vec<Option<String>>;

/// Opens warehouse sessions
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Open a fresh autocommit session
    async fn connect(&self) -> Result<Box<dyn WarehouseSession>>;
}

/// A single open connection
#[async_trait]
pub trait WarehouseSession: Send {
    /// Execute one statement
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Fetch the first row of a query, every column as text
    async fn fetch_row(&mut self, sql: &str) -> Result<Option<TextRow>>;

    /// Close the connection
    async fn close(self: Box<Self>) -> Result<()>;
}
