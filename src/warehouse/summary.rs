//! Read-only overview of the output tables

use super::statements::validate_identifier;
use super::{TextRow, Warehouse, WarehouseSession};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Output tables, in reporting order. `dim_time` may not exist.
pub const OUTPUT_TABLES: [&str; 4] = ["fact_trips", "dim_routes", "dim_junctions", "dim_time"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCount {
    pub table: String,
    /// `None` when the table could not be queried
    pub rows: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusiestRoute {
    pub route: String,
    pub trips: i64,
}

/// Row counts plus headline trip metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseSummary {
    pub schema: String,
    pub tables: Vec<TableCount>,
    pub total_trips: Option<i64>,
    pub avg_travel_time: Option<f64>,
    pub busiest_route: Option<BusiestRoute>,
}

/// Query the output tables under `schema`.
///
/// Only the schema check and the connection can fail; a table that cannot
/// be queried reports `None`.
pub async fn summarize(warehouse: &dyn Warehouse, schema: &str) -> Result<WarehouseSummary> {
    validate_identifier(schema)?;

    let mut session = warehouse.connect().await?;
    let summary = collect(session.as_mut(), schema).await;
    if let Err(e) = session.close().await {
        warn!("Error closing summary connection: {e}");
    }
    Ok(summary)
}

async fn collect(session: &mut dyn WarehouseSession, schema: &str) -> WarehouseSummary {
    let mut tables = Vec::with_capacity(OUTPUT_TABLES.len());
    for table in OUTPUT_TABLES {
        let sql = format!("SELECT COUNT(*)::VARCHAR FROM {schema}.{table};");
        let rows = query_row(session, &sql, table)
            .await
            .as_ref()
            .and_then(|r| column(r, 0))
            .and_then(|v| v.parse().ok());
        tables.push(TableCount {
            table: table.to_string(),
            rows,
        });
    }

    let headline = query_row(
        session,
        &format!(
            "SELECT SUM(trip_count)::VARCHAR, AVG(avg_travel_time)::VARCHAR FROM {schema}.fact_trips;"
        ),
        "trip totals",
    )
    .await;
    let total_trips = headline
        .as_ref()
        .and_then(|r| column(r, 0))
        .and_then(|v| v.parse().ok());
    let avg_travel_time = headline
        .as_ref()
        .and_then(|r| column(r, 1))
        .and_then(|v| v.parse().ok());

    let busiest = query_row(
        session,
        &format!(
            "SELECT route::VARCHAR, SUM(trip_count)::VARCHAR FROM {schema}.fact_trips \
             GROUP BY route ORDER BY SUM(trip_count) DESC LIMIT 1;"
        ),
        "busiest route",
    )
    .await;
    let busiest_route = busiest.as_ref().and_then(|r| {
        Some(BusiestRoute {
            route: column(r, 0)?.to_string(),
            trips: column(r, 1)?.parse().ok()?,
        })
    });

    WarehouseSummary {
        schema: schema.to_string(),
        tables,
        total_trips,
        avg_travel_time,
        busiest_route,
    }
}

/// A failed query reads as no row
async fn query_row(session: &mut dyn WarehouseSession, sql: &str, what: &str) -> Option<TextRow> {
    match session.fetch_row(sql).await {
        Ok(row) => row,
        Err(e) => {
            debug!("Could not read {what}: {e}");
            None
        }
    }
}

fn column(row: &TextRow, index: usize) -> Option<&str> {
    row.get(index).and_then(|v| v.as_deref())
}
