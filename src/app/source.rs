use std::str::FromStr;
use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tracing::info;

use crate::app::error::{PipelineError, Result};
use crate::app::executor;
use crate::app::file::FileSource;
use crate::app::formatter;
use crate::app::inspector::Inspector;
use crate::app::models::{SchemaDescription, Table};

/// SQL syntax variant of the connected engine. Used for prompt phrasing,
/// row-limiting syntax and the catalog queries the inspector issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
    MsSql,
    Other,
}

impl Dialect {
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgresql://") || url.starts_with("postgres://") {
            Some(Dialect::Postgres)
        } else if url.starts_with("mysql://") {
            Some(Dialect::MySql)
        } else if url.starts_with("sqlite://") {
            Some(Dialect::Sqlite)
        } else if url.starts_with("mssql://") || url.starts_with("mssql+pyodbc://") {
            Some(Dialect::MsSql)
        } else {
            None
        }
    }

    /// Human-readable engine name, used in prompt text.
    pub fn label(&self) -> &'static str {
        match self {
            Dialect::Postgres => "PostgreSQL",
            Dialect::MySql => "MySQL",
            Dialect::Sqlite => "SQLite",
            Dialect::MsSql => "Microsoft SQL Server",
            Dialect::Other => "ANSI SQL",
        }
    }

    /// Row-limiting syntax hint for generated SQL.
    pub fn row_limit_hint(&self) -> &'static str {
        match self {
            Dialect::MsSql => "'SELECT TOP n' instead of 'LIMIT n'",
            _ => "a trailing 'LIMIT n' clause",
        }
    }

    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident),
            Dialect::MsSql => format!("[{}]", ident),
            _ => format!("\"{}\"", ident),
        }
    }

    pub fn cast_to_text(&self, expr: &str) -> String {
        match self {
            Dialect::MySql => format!("CAST({} AS CHAR)", expr),
            Dialect::MsSql => format!("CAST({} AS VARCHAR(200))", expr),
            _ => format!("CAST({} AS TEXT)", expr),
        }
    }

    /// Row-limited `SELECT DISTINCT` over one column, `LIMIT n` vs `TOP n`.
    pub fn limited_distinct(&self, table: &str, column: &str, n: usize) -> String {
        let col = self.cast_to_text(&self.quote_ident(column));
        match self {
            Dialect::MsSql => format!("SELECT DISTINCT TOP {} {} FROM {}", n, col, table),
            _ => format!("SELECT DISTINCT {} FROM {} LIMIT {}", col, table, n),
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            "mssql" | "sqlserver" => Ok(Dialect::MsSql),
            other => Err(format!("unknown dialect '{}'", other)),
        }
    }
}

/// Schema of whichever source kind was opened.
#[derive(Debug, Clone)]
pub enum SourceSchema {
    Relational(SchemaDescription),
    File(Vec<(String, String)>),
}

/// A data source selected by URL-prefix sniffing: a live database connection
/// or a local delimited file. One connection per source, opened at
/// construction and reused for every introspection and query call.
pub enum DataSource {
    Database { pool: AnyPool, dialect: Dialect },
    File(FileSource),
}

impl DataSource {
    pub async fn open(source: &str, dialect_override: Option<Dialect>) -> Result<Self> {
        if let Some(sniffed) = Dialect::from_url(source) {
            sqlx::any::install_default_drivers();
            let pool = AnyPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(30))
                .connect(source)
                .await
                .map_err(PipelineError::Connection)?;
            info!("connected to {} data source", sniffed.label());
            Ok(DataSource::Database {
                pool,
                dialect: dialect_override.unwrap_or(sniffed),
            })
        } else if source.to_ascii_lowercase().ends_with(".csv") {
            info!(path = source, "using file data source");
            Ok(DataSource::File(FileSource::new(source)))
        } else {
            Err(PipelineError::UnsupportedSource(source.to_string()))
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            DataSource::Database { dialect, .. } => *dialect,
            DataSource::File(_) => Dialect::Other,
        }
    }

    pub async fn schema(&self, collect_summaries: bool) -> Result<SourceSchema> {
        match self {
            DataSource::Database { pool, dialect } => {
                let inspector = Inspector::new(pool, *dialect, collect_summaries);
                Ok(SourceSchema::Relational(inspector.scan().await?))
            }
            DataSource::File(file) => Ok(SourceSchema::File(file.schema()?)),
        }
    }

    pub fn format_schema(&self, schema: &SourceSchema) -> String {
        match schema {
            SourceSchema::Relational(desc) => formatter::format_schema(desc),
            SourceSchema::File(columns) => FileSource::format_schema(columns),
        }
    }

    pub async fn execute_sql(&self, sql: &str) -> Result<Table> {
        match self {
            DataSource::Database { pool, .. } => executor::execute(pool, sql).await,
            DataSource::File(_) => Err(PipelineError::UnsupportedOperation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_sniffing_covers_known_prefixes() {
        assert_eq!(
            Dialect::from_url("postgresql://u:p@localhost/db"),
            Some(Dialect::Postgres)
        );
        assert_eq!(
            Dialect::from_url("postgres://u:p@localhost/db"),
            Some(Dialect::Postgres)
        );
        assert_eq!(
            Dialect::from_url("mssql+pyodbc://u:p@host/db"),
            Some(Dialect::MsSql)
        );
        assert_eq!(Dialect::from_url("mysql://u@host/db"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_url("data/orders.csv"), None);
    }

    #[test]
    fn limited_distinct_uses_dialect_row_limiting() {
        let pg = Dialect::Postgres.limited_distinct("public.orders", "status", 10);
        assert!(pg.ends_with("LIMIT 10"), "{}", pg);
        let ms = Dialect::MsSql.limited_distinct("dbo.orders", "status", 10);
        assert!(ms.starts_with("SELECT DISTINCT TOP 10"), "{}", ms);
        assert!(!ms.contains("LIMIT"));
    }

    #[test]
    fn identifier_quoting_per_dialect() {
        assert_eq!(Dialect::Postgres.quote_ident("total"), "\"total\"");
        assert_eq!(Dialect::MySql.quote_ident("total"), "`total`");
        assert_eq!(Dialect::MsSql.quote_ident("total"), "[total]");
    }

    #[tokio::test]
    async fn unsupported_source_is_rejected() {
        let err = DataSource::open("ftp://host/data", None).await.err().unwrap();
        assert!(matches!(err, PipelineError::UnsupportedSource(_)));
    }
}
