//! Prompt assembly: role-tagged message sequences embedding the formatted
//! schema, the user's question, a dialect hint, and the expected output
//! format. String interpolation only; nothing here validates the schema or
//! the query.

use crate::app::source::Dialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// The JSON shape the analysis prompt demands from the model.
pub const JSON_SHAPE_DESCRIPTION: &str = r#"{
  "visualizations": [
    {
      "description": "one-sentence explanation of the insight",
      "sql_query": "the SQL query that fetches the data",
      "visualization": "chart type tag, e.g. bar, line, pie, scatter",
      "plotly_express_function": "plotting call, e.g. px.bar(data, x=\"a\", y=\"b\")"
    }
  ]
}"#;

/// Overview prompt: a 1-2 sentence plain-language summary of the data source
/// plus 3-5 example questions, explicitly without markdown or code.
pub fn overview_messages(formatted_schema: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "CONTEXT: You are a highly skilled database analyst whose goal is to \
             understand the structure and purpose of a given data source schema and \
             provide insightful, concise analysis based on the schema details provided. \
             RULES: \
             - The introduction/summary must be one to two sentences long. \
             - Suggest 3 to 5 example questions. \
             - Do not include markdown formatting or code in your response.",
        ),
        ChatMessage::user(
            "Based on the schema details, provide a brief introduction about the data \
             source and suggest 3 to 5 example questions an end-user might ask to gain \
             insights from it. The schema details below describe the structure and \
             content of the data source:",
        ),
        ChatMessage::system(formatted_schema),
    ]
}

/// Analysis prompt: asks for the fixed `DataAnalysisResponse` JSON shape,
/// constrained to the provided schema and the dialect's row-limiting syntax.
pub fn analysis_messages(
    formatted_schema: &str,
    dialect: Dialect,
    query: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "CONTEXT: You are a highly skilled data analyst who translates natural \
             language questions into SQL queries and chart suggestions. \
             RULES: \
             - Respond with a single JSON object matching exactly this shape:\n{}\n\
             - Do not wrap the JSON in markdown fences or add any other text. \
             - Reference only tables and columns that appear in the provided schema. \
             - All SQL must be valid {} syntax; for row limiting use {}.",
            JSON_SHAPE_DESCRIPTION,
            dialect.label(),
            dialect.row_limit_hint(),
        )),
        ChatMessage::user(format!(
            "Generate the SQL queries and visualization suggestions that answer this \
             question: '{}'. The schema details below describe the structure and \
             content of the data source:",
            query
        )),
        ChatMessage::system(formatted_schema.to_string()),
    ]
}

/// Dashboard prompt: one block of executable plotting code, no markdown
/// fences, dialect-correct SQL.
pub fn dashboard_messages(
    formatted_schema: &str,
    dialect: Dialect,
    query: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "CONTEXT: You are a highly skilled data analyst with expertise in building \
             dashboards from database queries. Your goal is to generate the code for a \
             comprehensive, readable dashboard that answers the user's question using \
             the provided schema. \
             RULES: \
             - Include SQL queries that fetch data directly from the provided schema. \
             - Do not use tables, columns, or data structures not present in the schema. \
             - All SQL must be fully compatible with {}; for row limiting use {}. \
             - Build every chart with plotting calls of the form \
               px.<chart_type>(data, ...) with keyword arguments naming result columns. \
             - Give every chart an appropriate title. \
             - Skip any chart whose query fails and continue with the rest. \
             - Output a single block of executable code with no markdown fences, \
               comments, or surrounding prose.",
            dialect.label(),
            dialect.row_limit_hint(),
        )),
        ChatMessage::user(format!(
            "Based on the following question, generate the code for a dashboard: '{}'. \
             The schema details below describe the structure and content of the data \
             source:",
            query
        )),
        ChatMessage::system(formatted_schema.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "Table: public.orders\n  Columns:\n    - id (INT)\n";

    #[test]
    fn overview_embeds_schema_as_trailing_system_message() {
        let messages = overview_messages(SCHEMA);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[2].role, ChatRole::System);
        assert_eq!(messages[2].content, SCHEMA);
        assert!(messages[0].content.contains("Do not include markdown"));
    }

    #[test]
    fn analysis_names_dialect_and_json_shape() {
        let messages = analysis_messages(SCHEMA, Dialect::MsSql, "total sales by region");
        assert!(messages[0].content.contains("Microsoft SQL Server"));
        assert!(messages[0].content.contains("SELECT TOP n"));
        assert!(messages[0].content.contains("\"visualizations\""));
        assert!(messages[1].content.contains("total sales by region"));
    }

    #[test]
    fn dashboard_asks_for_unfenced_code() {
        let messages = dashboard_messages(SCHEMA, Dialect::Postgres, "sales overview");
        assert!(messages[0].content.contains("PostgreSQL"));
        assert!(messages[0].content.contains("no markdown fences"));
        assert!(messages[1].content.contains("sales overview"));
        assert_eq!(messages[2].content, SCHEMA);
    }
}
