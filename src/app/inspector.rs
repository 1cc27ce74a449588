use sqlx::AnyPool;
use tracing::{info, warn};

use crate::app::error::{PipelineError, Result};
use crate::app::models::{
    ColumnDescription, ColumnSummary, ConstraintSet, ForeignKeyDescription, IndexDescription,
    SchemaDescription, TableDescription, UniqueConstraint,
};
use crate::app::source::Dialect;

const DISTINCT_VALUE_LIMIT: usize = 10;

// It handles all database interaction for schema reflection. The catalog
// queries inline identifiers instead of binding them because placeholder
// syntax differs between drivers behind the Any pool.
pub struct Inspector<'a> {
    pool: &'a AnyPool,
    dialect: Dialect,
    collect_summaries: bool,
}

impl<'a> Inspector<'a> {
    pub fn new(pool: &'a AnyPool, dialect: Dialect, collect_summaries: bool) -> Self {
        Self {
            pool,
            dialect,
            collect_summaries,
        }
    }

    /// Reflect every accessible non-system schema into a `SchemaDescription`.
    /// Top-level listing failures are fatal; per-table facet failures degrade
    /// to empty results with a warning. An empty result is valid.
    pub async fn scan(&self) -> Result<SchemaDescription> {
        if self.dialect == Dialect::Sqlite {
            return self.scan_sqlite().await;
        }

        let schemas = self.schema_names().await?;
        let mut result = SchemaDescription::default();

        for schema_name in schemas {
            if is_system_schema(self.dialect, &schema_name) {
                continue;
            }
            let tables = self.table_names(&schema_name).await?;
            for table_name in tables {
                let mut table =
                    TableDescription::new(format!("{}.{}", schema_name, table_name));

                table.columns = self
                    .get_columns(&schema_name, &table_name)
                    .await
                    .unwrap_or_else(|e| {
                        warn!("error retrieving columns for {}: {}", table.name, e);
                        Vec::new()
                    });
                table.foreign_keys = self
                    .get_foreign_keys(&schema_name, &table_name)
                    .await
                    .unwrap_or_else(|e| {
                        warn!("error retrieving foreign keys for {}: {}", table.name, e);
                        Vec::new()
                    });
                table.indexes = self
                    .get_indexes(&schema_name, &table_name)
                    .await
                    .unwrap_or_else(|e| {
                        warn!("error retrieving indexes for {}: {}", table.name, e);
                        Vec::new()
                    });
                table.constraints = self
                    .get_constraints(&schema_name, &table_name)
                    .await
                    .unwrap_or_else(|e| {
                        warn!("error retrieving constraints for {}: {}", table.name, e);
                        ConstraintSet::default()
                    });

                if self.collect_summaries {
                    table.summaries = self
                        .get_data_summaries(&schema_name, &table_name, &table.columns)
                        .await;
                }

                result.tables.push(table);
            }
        }

        if result.is_empty() {
            warn!("no schema information was retrieved");
        } else {
            info!("schema retrieved with {} tables", result.len());
        }
        Ok(result)
    }

    async fn schema_names(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT schema_name FROM information_schema.schemata ORDER BY schema_name",
        )
        .fetch_all(self.pool)
        .await
        .map_err(PipelineError::Introspection)?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn table_names(&self, schema_name: &str) -> Result<Vec<String>> {
        let query = format!(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = '{}' AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            escape_literal(schema_name)
        );
        let rows: Vec<(String,)> = sqlx::query_as(&query)
            .fetch_all(self.pool)
            .await
            .map_err(PipelineError::Introspection)?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn get_columns(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> std::result::Result<Vec<ColumnDescription>, sqlx::Error> {
        let query = format!(
            "SELECT column_name, data_type, is_nullable, column_default \
             FROM information_schema.columns \
             WHERE table_schema = '{}' AND table_name = '{}' \
             ORDER BY ordinal_position",
            escape_literal(schema_name),
            escape_literal(table_name)
        );
        let rows: Vec<(String, String, String, Option<String>)> =
            sqlx::query_as(&query).fetch_all(self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(name, data_type, is_nullable, default)| ColumnDescription {
                name,
                data_type,
                nullable: is_nullable.eq_ignore_ascii_case("YES"),
                default,
            })
            .collect())
    }

    async fn get_foreign_keys(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> std::result::Result<Vec<ForeignKeyDescription>, sqlx::Error> {
        // MySQL exposes the referenced side directly on key_column_usage;
        // PostgreSQL and SQL Server need the constraint_column_usage join.
        let query = match self.dialect {
            Dialect::MySql => format!(
                "SELECT constraint_name, column_name, referenced_table_schema, \
                        referenced_table_name, referenced_column_name \
                 FROM information_schema.key_column_usage \
                 WHERE table_schema = '{}' AND table_name = '{}' \
                   AND referenced_table_name IS NOT NULL \
                 ORDER BY constraint_name, ordinal_position",
                escape_literal(schema_name),
                escape_literal(table_name)
            ),
            _ => format!(
                "SELECT rc.constraint_name, kcu.column_name, ccu.table_schema, \
                        ccu.table_name, ccu.column_name \
                 FROM information_schema.referential_constraints AS rc \
                 JOIN information_schema.key_column_usage AS kcu \
                   ON kcu.constraint_name = rc.constraint_name \
                 JOIN information_schema.constraint_column_usage AS ccu \
                   ON ccu.constraint_name = rc.unique_constraint_name \
                 WHERE kcu.table_schema = '{}' AND kcu.table_name = '{}' \
                 ORDER BY rc.constraint_name, kcu.ordinal_position",
                escape_literal(schema_name),
                escape_literal(table_name)
            ),
        };
        let rows: Vec<(String, String, String, String, String)> =
            sqlx::query_as(&query).fetch_all(self.pool).await?;
        Ok(group_foreign_keys(rows))
    }

    async fn get_indexes(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> std::result::Result<Vec<IndexDescription>, sqlx::Error> {
        match self.dialect {
            Dialect::Postgres => {
                let query = format!(
                    "SELECT i.relname, a.attname, ix.indisunique \
                     FROM pg_class t \
                     JOIN pg_namespace n ON n.oid = t.relnamespace \
                     JOIN pg_index ix ON t.oid = ix.indrelid \
                     JOIN pg_class i ON i.oid = ix.indexrelid \
                     JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
                     WHERE n.nspname = '{}' AND t.relname = '{}' AND NOT ix.indisprimary \
                     ORDER BY i.relname, a.attnum",
                    escape_literal(schema_name),
                    escape_literal(table_name)
                );
                let rows: Vec<(String, String, bool)> =
                    sqlx::query_as(&query).fetch_all(self.pool).await?;
                Ok(group_indexes(rows))
            }
            Dialect::MySql => {
                let query = format!(
                    "SELECT index_name, column_name, non_unique \
                     FROM information_schema.statistics \
                     WHERE table_schema = '{}' AND table_name = '{}' \
                       AND index_name <> 'PRIMARY' \
                     ORDER BY index_name, seq_in_index",
                    escape_literal(schema_name),
                    escape_literal(table_name)
                );
                let rows: Vec<(String, String, i64)> =
                    sqlx::query_as(&query).fetch_all(self.pool).await?;
                Ok(group_indexes(
                    rows.into_iter()
                        .map(|(n, c, non_unique)| (n, c, non_unique == 0))
                        .collect(),
                ))
            }
            // No portable index catalog for the remaining engines.
            _ => Ok(Vec::new()),
        }
    }

    async fn get_constraints(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> std::result::Result<ConstraintSet, sqlx::Error> {
        let query = format!(
            "SELECT tc.constraint_name, tc.constraint_type, kcu.column_name \
             FROM information_schema.table_constraints AS tc \
             JOIN information_schema.key_column_usage AS kcu \
               ON tc.constraint_name = kcu.constraint_name \
              AND tc.table_schema = kcu.table_schema \
             WHERE tc.table_schema = '{}' AND tc.table_name = '{}' \
               AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE') \
             ORDER BY tc.constraint_name, kcu.ordinal_position",
            escape_literal(schema_name),
            escape_literal(table_name)
        );
        let rows: Vec<(String, String, String)> =
            sqlx::query_as(&query).fetch_all(self.pool).await?;

        let mut constraints = ConstraintSet::default();
        for (name, kind, column) in rows {
            if kind.eq_ignore_ascii_case("PRIMARY KEY") {
                constraints.primary_key.push(column);
            } else {
                match constraints.unique.last_mut() {
                    Some(uc) if uc.name == name => uc.columns.push(column),
                    _ => constraints.unique.push(UniqueConstraint {
                        name,
                        columns: vec![column],
                    }),
                }
            }
        }
        Ok(constraints)
    }

    /// Bounded value summaries: min/max for numeric columns, a short distinct
    /// value list for text columns. A failing summary query skips that one
    /// column only.
    async fn get_data_summaries(
        &self,
        schema_name: &str,
        table_name: &str,
        columns: &[ColumnDescription],
    ) -> Vec<(String, ColumnSummary)> {
        let qualified = format!(
            "{}.{}",
            self.dialect.quote_ident(schema_name),
            self.dialect.quote_ident(table_name)
        );
        self.summarize_columns(&qualified, columns).await
    }

    async fn summarize_columns(
        &self,
        qualified: &str,
        columns: &[ColumnDescription],
    ) -> Vec<(String, ColumnSummary)> {
        let mut summaries = Vec::new();
        for column in columns {
            let summary = if is_numeric_type(&column.data_type) {
                self.numeric_summary(qualified, &column.name).await
            } else if is_text_type(&column.data_type) {
                self.text_summary(qualified, &column.name).await
            } else {
                continue;
            };
            match summary {
                Ok(s) => summaries.push((column.name.clone(), s)),
                Err(e) => warn!("error summarizing {}.{}: {}", qualified, column.name, e),
            }
        }
        summaries
    }

    async fn numeric_summary(
        &self,
        qualified: &str,
        column: &str,
    ) -> std::result::Result<ColumnSummary, sqlx::Error> {
        let col = self.dialect.quote_ident(column);
        let query = format!(
            "SELECT {}, {} FROM {}",
            self.dialect.cast_to_text(&format!("MIN({})", col)),
            self.dialect.cast_to_text(&format!("MAX({})", col)),
            qualified
        );
        let (min, max): (Option<String>, Option<String>) =
            sqlx::query_as(&query).fetch_one(self.pool).await?;
        Ok(ColumnSummary::Numeric { min, max })
    }

    async fn text_summary(
        &self,
        qualified: &str,
        column: &str,
    ) -> std::result::Result<ColumnSummary, sqlx::Error> {
        let query = self
            .dialect
            .limited_distinct(qualified, column, DISTINCT_VALUE_LIMIT);
        let rows: Vec<(Option<String>,)> =
            sqlx::query_as(&query).fetch_all(self.pool).await?;
        Ok(ColumnSummary::Text {
            distinct_values: rows.into_iter().flat_map(|(v,)| v).collect(),
        })
    }

    // SQLite has no information_schema; the main schema is reflected from
    // sqlite_master and the table_info / foreign_key_list pragmas.
    async fn scan_sqlite(&self) -> Result<SchemaDescription> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(self.pool)
        .await
        .map_err(PipelineError::Introspection)?;

        let mut result = SchemaDescription::default();
        for (table_name,) in rows {
            let mut table = TableDescription::new(format!("main.{}", table_name));

            match self.sqlite_columns(&table_name).await {
                Ok((columns, primary_key)) => {
                    table.columns = columns;
                    table.constraints.primary_key = primary_key;
                }
                Err(e) => warn!("error retrieving columns for {}: {}", table.name, e),
            }
            table.foreign_keys = self
                .sqlite_foreign_keys(&table_name)
                .await
                .unwrap_or_else(|e| {
                    warn!("error retrieving foreign keys for {}: {}", table.name, e);
                    Vec::new()
                });
            if self.collect_summaries {
                let qualified = self.dialect.quote_ident(&table_name);
                let columns = table.columns.clone();
                table.summaries = self.summarize_columns(&qualified, &columns).await;
            }
            result.tables.push(table);
        }

        if result.is_empty() {
            warn!("no schema information was retrieved");
        } else {
            info!("schema retrieved with {} tables", result.len());
        }
        Ok(result)
    }

    async fn sqlite_columns(
        &self,
        table_name: &str,
    ) -> std::result::Result<(Vec<ColumnDescription>, Vec<String>), sqlx::Error> {
        let query = format!("PRAGMA table_info('{}')", escape_literal(table_name));
        let rows: Vec<(i64, String, String, i64, Option<String>, i64)> =
            sqlx::query_as(&query).fetch_all(self.pool).await?;

        let mut columns = Vec::new();
        let mut primary_key = Vec::new();
        for (_cid, name, data_type, notnull, default, pk) in rows {
            if pk > 0 {
                primary_key.push(name.clone());
            }
            columns.push(ColumnDescription {
                name,
                data_type,
                nullable: notnull == 0,
                default,
            });
        }
        Ok((columns, primary_key))
    }

    async fn sqlite_foreign_keys(
        &self,
        table_name: &str,
    ) -> std::result::Result<Vec<ForeignKeyDescription>, sqlx::Error> {
        let query = format!("PRAGMA foreign_key_list('{}')", escape_literal(table_name));
        // id, seq, table, from, to, on_update, on_delete, match
        let rows: Vec<(i64, i64, String, String, String, String, String, String)> =
            sqlx::query_as(&query).fetch_all(self.pool).await?;

        let mut fks: Vec<(i64, ForeignKeyDescription)> = Vec::new();
        for (id, _seq, referred_table, from, to, ..) in rows {
            match fks.iter_mut().find(|(fk_id, _)| *fk_id == id) {
                Some((_, fk)) => {
                    fk.columns.push(from);
                    fk.referred_columns.push(to);
                }
                None => fks.push((
                    id,
                    ForeignKeyDescription {
                        name: format!("{}_fk_{}", table_name, id),
                        columns: vec![from],
                        referred_schema: "main".to_string(),
                        referred_table,
                        referred_columns: vec![to],
                    },
                )),
            }
        }
        Ok(fks.into_iter().map(|(_, fk)| fk).collect())
    }
}

/// System namespaces excluded from reflection, per engine.
fn is_system_schema(dialect: Dialect, schema_name: &str) -> bool {
    match dialect {
        Dialect::Postgres => {
            schema_name == "information_schema" || schema_name.starts_with("pg_")
        }
        Dialect::MsSql => matches!(schema_name, "master" | "model" | "msdb" | "tempdb"),
        _ => false,
    }
}

fn is_numeric_type(data_type: &str) -> bool {
    let upper = data_type.to_ascii_uppercase();
    ["INT", "NUMERIC", "FLOAT", "DECIMAL"]
        .iter()
        .any(|t| upper.contains(t))
}

fn is_text_type(data_type: &str) -> bool {
    let upper = data_type.to_ascii_uppercase();
    upper.contains("CHAR") || upper.contains("TEXT")
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn group_foreign_keys(
    rows: Vec<(String, String, String, String, String)>,
) -> Vec<ForeignKeyDescription> {
    let mut fks: Vec<ForeignKeyDescription> = Vec::new();
    for (name, column, referred_schema, referred_table, referred_column) in rows {
        match fks.last_mut() {
            Some(fk) if fk.name == name => {
                fk.columns.push(column);
                fk.referred_columns.push(referred_column);
            }
            _ => fks.push(ForeignKeyDescription {
                name,
                columns: vec![column],
                referred_schema,
                referred_table,
                referred_columns: vec![referred_column],
            }),
        }
    }
    fks
}

fn group_indexes(rows: Vec<(String, String, bool)>) -> Vec<IndexDescription> {
    let mut indexes: Vec<IndexDescription> = Vec::new();
    for (name, column, unique) in rows {
        match indexes.last_mut() {
            Some(idx) if idx.name == name => idx.columns.push(column),
            _ => indexes.push(IndexDescription {
                name,
                columns: vec![column],
                unique,
            }),
        }
    }
    indexes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_text_type_classification() {
        assert!(is_numeric_type("integer"));
        assert!(is_numeric_type("NUMERIC(10,2)"));
        assert!(is_numeric_type("FLOAT"));
        assert!(is_numeric_type("DECIMAL"));
        assert!(!is_numeric_type("timestamp"));

        assert!(is_text_type("character varying"));
        assert!(is_text_type("VARCHAR(50)"));
        assert!(is_text_type("text"));
        assert!(!is_text_type("bytea"));
    }

    #[test]
    fn system_schemas_are_excluded_per_dialect() {
        assert!(is_system_schema(Dialect::Postgres, "pg_catalog"));
        assert!(is_system_schema(Dialect::Postgres, "information_schema"));
        assert!(!is_system_schema(Dialect::Postgres, "public"));

        assert!(is_system_schema(Dialect::MsSql, "tempdb"));
        assert!(!is_system_schema(Dialect::MsSql, "dbo"));

        // Other dialects get no exclusions.
        assert!(!is_system_schema(Dialect::MySql, "information_schema"));
    }

    #[test]
    fn foreign_key_rows_group_in_ordinal_order() {
        let rows = vec![
            (
                "orders_customer_fkey".to_string(),
                "customer_id".to_string(),
                "public".to_string(),
                "customers".to_string(),
                "id".to_string(),
            ),
            (
                "orders_customer_fkey".to_string(),
                "customer_region".to_string(),
                "public".to_string(),
                "customers".to_string(),
                "region".to_string(),
            ),
            (
                "orders_product_fkey".to_string(),
                "product_id".to_string(),
                "public".to_string(),
                "products".to_string(),
                "id".to_string(),
            ),
        ];
        let fks = group_foreign_keys(rows);
        assert_eq!(fks.len(), 2);
        assert_eq!(fks[0].columns, vec!["customer_id", "customer_region"]);
        assert_eq!(fks[0].referred_columns, vec!["id", "region"]);
        assert_eq!(fks[0].columns.len(), fks[0].referred_columns.len());
        assert_eq!(fks[1].referred_table, "products");
    }

    #[test]
    fn index_rows_group_by_name() {
        let rows = vec![
            ("idx_a".to_string(), "x".to_string(), false),
            ("idx_a".to_string(), "y".to_string(), false),
            ("idx_b".to_string(), "z".to_string(), true),
        ];
        let indexes = group_indexes(rows);
        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].columns, vec!["x", "y"]);
        assert!(indexes[1].unique);
    }

    #[test]
    fn literal_escaping_doubles_quotes() {
        assert_eq!(escape_literal("o'brien"), "o''brien");
    }
}
