use serde_json::Value;
use sqlx::any::AnyRow;
use sqlx::{AnyPool, Column, Row};
use tracing::{info, warn};

use crate::app::error::{PipelineError, Result};
use crate::app::models::Table;

/// Run one SQL string exactly as given and return the tabular result. No
/// parameterization, no plan inspection. An empty result set is valid; any
/// execution error is fatal for this query only, and callers run batch items
/// independently.
pub async fn execute(pool: &AnyPool, sql: &str) -> Result<Table> {
    let rows: Vec<AnyRow> = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .map_err(PipelineError::QueryExecution)?;

    let columns: Vec<String> = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let table = Table {
        rows: rows.iter().map(decode_row).collect(),
        columns,
    };

    if table.is_empty() {
        warn!("query executed but returned no results");
    } else {
        info!("query executed successfully and returned {} rows", table.rows.len());
    }
    Ok(table)
}

// The Any driver erases column types, so each value is decoded by trying the
// scalar types it supports and falling back to null.
fn decode_row(row: &AnyRow) -> Vec<Value> {
    (0..row.columns().len()).map(|i| decode_value(row, i)).collect()
}

fn decode_value(row: &AnyRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::any::AnyPoolOptions;

    // sqlite::memory: gives every connection its own database, so the pool
    // is pinned to a single connection.
    async fn seeded_pool() -> AnyPool {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE orders (category TEXT, total REAL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO orders VALUES ('books', 9.5), ('games', 3.0)")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn batch_continues_past_a_failing_query() {
        let pool = seeded_pool().await;
        let batch = [
            "select nonsense from",
            "select category, total from orders order by category",
        ];

        let mut tables = Vec::new();
        let mut failures = 0;
        for sql in batch {
            match execute(&pool, sql).await {
                Ok(table) => tables.push(table),
                Err(PipelineError::QueryExecution(_)) => failures += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        assert_eq!(failures, 1);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns, vec!["category", "total"]);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[0][0], serde_json::Value::from("books"));
    }

    #[tokio::test]
    async fn empty_result_set_is_valid() {
        let pool = seeded_pool().await;
        let table = execute(&pool, "select category from orders where total > 100")
            .await
            .unwrap();
        assert!(table.is_empty());
        assert!(table.columns.is_empty());
    }
}
