//! Turns model output into executable `VisualizationItem`s. Structured
//! responses pass through with SQL cleanup applied; free-form text goes
//! through the legacy marker-based extraction.

use crate::app::error::{PipelineError, Result};
use crate::app::models::{DataAnalysisResponse, VisualizationItem};
use crate::app::source::Dialect;

const SQL_MARKER: &str = "SQL Query:";
const SUGGESTION_MARKER: &str = "Visualization Suggestions:";

/// Structured path: the response was already validated by the gateway, so
/// each item maps straight across, with the SQL cleanup every extracted
/// query gets.
pub fn interpret_structured(
    response: DataAnalysisResponse,
    dialect: Dialect,
) -> Vec<VisualizationItem> {
    response
        .visualizations
        .into_iter()
        .map(|item| VisualizationItem {
            description: item.description,
            sql_query: clean_sql(&item.sql_query, dialect),
            visualization: item.visualization,
            plotly_express_function: match item.plotly_express_function.trim() {
                "" => None,
                call => Some(call.to_string()),
            },
        })
        .collect()
}

/// Fallback path for semi-structured text. With both literal markers present,
/// the SQL is the first fenced block after the SQL marker and each non-empty
/// line under the suggestion marker yields one item; the markers may appear
/// in either order. Without markers, the first fenced block anywhere is taken
/// with a single "bar" suggestion.
pub fn interpret_text(raw: &str, dialect: Dialect) -> Result<Vec<VisualizationItem>> {
    let (sql_part, suggestions) = match (raw.find(SQL_MARKER), raw.find(SUGGESTION_MARKER)) {
        (Some(sql_at), Some(suggestions_at)) => {
            let sql_start = sql_at + SQL_MARKER.len();
            let (sql_part, suggestion_text) = if sql_at < suggestions_at {
                (
                    &raw[sql_start..suggestions_at],
                    &raw[suggestions_at + SUGGESTION_MARKER.len()..],
                )
            } else {
                (
                    &raw[sql_start..],
                    &raw[suggestions_at + SUGGESTION_MARKER.len()..sql_at],
                )
            };
            let suggestions: Vec<String> = suggestion_text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
            (sql_part, suggestions)
        }
        _ => (raw, vec!["bar".to_string()]),
    };

    let sql = clean_sql(first_fenced_block(sql_part)?, dialect);
    Ok(suggestions
        .into_iter()
        .map(|suggestion| VisualizationItem {
            description: format!("{} visualization", suggestion),
            sql_query: sql.clone(),
            visualization: suggestion,
            plotly_express_function: None,
        })
        .collect())
}

/// Ad hoc cleanup applied to every extracted SQL string: trim, lowercase,
/// strip a leading `sql` keyword token, and for SQL Server targets rewrite a
/// trailing `LIMIT n` into a leading `SELECT TOP n`. No syntax validation.
pub fn clean_sql(sql: &str, dialect: Dialect) -> String {
    let mut sql = sql.trim().to_lowercase();
    if let Some(rest) = sql.strip_prefix("sql") {
        if rest.starts_with(char::is_whitespace) {
            sql = rest.trim_start().to_string();
        }
    }
    if dialect == Dialect::MsSql {
        sql = rewrite_limit_to_top(&sql);
    }
    sql.trim().to_string()
}

// Input is already lowercased, so matching "limit" covers any original
// casing. The keyword must sit on whitespace boundaries, which may be
// newlines or tabs, not just spaces.
fn rewrite_limit_to_top(sql: &str) -> String {
    let Some(pos) = sql
        .match_indices("limit")
        .filter(|(i, _)| {
            sql[..*i].ends_with(char::is_whitespace)
                && sql[*i + "limit".len()..].starts_with(char::is_whitespace)
        })
        .map(|(i, _)| i)
        .last()
    else {
        return sql.to_string();
    };
    let value = sql[pos + "limit".len()..]
        .trim()
        .trim_end_matches(';')
        .trim();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return sql.to_string();
    }
    let head = sql[..pos].trim_end();
    head.replacen("select", &format!("select top {}", value), 1)
}

fn first_fenced_block(text: &str) -> Result<&str> {
    let mut parts = text.split("```");
    let _before = parts.next();
    let block = parts
        .next()
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .ok_or(PipelineError::Extraction {
            expected: "a fenced SQL block",
        })?;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::ResponseItem;

    #[test]
    fn marker_response_yields_one_item_per_suggestion() {
        let raw = "SQL Query:\n```select * from orders```\nVisualization Suggestions:\nbar\nline";
        let items = interpret_text(raw, Dialect::Postgres).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].sql_query, "select * from orders");
        assert_eq!(items[0].visualization, "bar");
        assert_eq!(items[1].sql_query, "select * from orders");
        assert_eq!(items[1].visualization, "line");
    }

    #[test]
    fn reversed_marker_order_still_yields_items() {
        let raw =
            "Visualization Suggestions:\nbar\nSQL Query:\n```select * from orders```";
        let items = interpret_text(raw, Dialect::Postgres).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sql_query, "select * from orders");
        assert_eq!(items[0].visualization, "bar");
    }

    #[test]
    fn missing_markers_fall_back_to_first_block_and_bar() {
        let raw = "Here is the query you asked for:\n```sql\nSELECT name FROM users\n```\nEnjoy!";
        let items = interpret_text(raw, Dialect::Postgres).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sql_query, "select name from users");
        assert_eq!(items[0].visualization, "bar");
    }

    #[test]
    fn response_without_fenced_block_is_an_extraction_error() {
        let raw = "I cannot produce SQL for that question.";
        assert!(matches!(
            interpret_text(raw, Dialect::Postgres),
            Err(PipelineError::Extraction { .. })
        ));
    }

    #[test]
    fn limit_rewrites_to_top_for_sql_server() {
        assert_eq!(
            clean_sql("select * from orders limit 10", Dialect::MsSql),
            "select top 10 * from orders"
        );
        // Case-insensitive LIMIT, trailing semicolon tolerated.
        assert_eq!(
            clean_sql("SELECT * FROM orders LIMIT 5;", Dialect::MsSql),
            "select top 5 * from orders"
        );
        // The keyword may sit after a newline or tab instead of a space.
        assert_eq!(
            clean_sql("select *\nfrom orders\nlimit 10", Dialect::MsSql),
            "select top 10 *\nfrom orders"
        );
        // "unlimited" must not trigger the rewrite.
        assert_eq!(
            clean_sql("select unlimited from plans", Dialect::MsSql),
            "select unlimited from plans"
        );
        // Non-mssql targets keep the limit clause.
        assert_eq!(
            clean_sql("select * from orders limit 10", Dialect::Postgres),
            "select * from orders limit 10"
        );
    }

    #[test]
    fn leading_sql_keyword_token_is_stripped() {
        assert_eq!(
            clean_sql("sql\nselect 1", Dialect::Postgres),
            "select 1"
        );
        // "sqlite_master" must not lose its prefix.
        assert_eq!(
            clean_sql("select * from sqlite_master", Dialect::Postgres),
            "select * from sqlite_master"
        );
    }

    #[test]
    fn structured_items_carry_cleaned_sql_and_optional_plot_call() {
        let response = DataAnalysisResponse {
            visualizations: vec![
                ResponseItem {
                    description: "Totals".to_string(),
                    sql_query: "SELECT category, total FROM orders LIMIT 10".to_string(),
                    visualization: "bar".to_string(),
                    plotly_express_function: "px.bar(data, x=\"category\", y=\"total\")"
                        .to_string(),
                },
                ResponseItem {
                    description: "Counts".to_string(),
                    sql_query: "select count(*) from orders".to_string(),
                    visualization: "pie".to_string(),
                    plotly_express_function: "  ".to_string(),
                },
            ],
        };
        let items = interpret_structured(response, Dialect::MsSql);
        assert_eq!(items[0].sql_query, "select top 10 category, total from orders");
        assert!(items[0].plotly_express_function.is_some());
        assert!(items[1].plotly_express_function.is_none());
    }
}
