use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

// Local and referred column lists are positionally paired; the inspector builds
// them from catalog rows ordered by ordinal position, so they always have equal
// length.
#[derive(Debug, Clone)]
pub struct ForeignKeyDescription {
    pub name: String,
    pub columns: Vec<String>,
    pub referred_schema: String,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IndexDescription {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    pub primary_key: Vec<String>,
    pub unique: Vec<UniqueConstraint>,
}

/// Bounded per-column value summary: numeric columns get a min/max pair, text
/// columns get a short list of distinct values. Never both.
#[derive(Debug, Clone)]
pub enum ColumnSummary {
    Numeric {
        min: Option<String>,
        max: Option<String>,
    },
    Text {
        distinct_values: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct TableDescription {
    /// Qualified name, `schema.table`.
    pub name: String,
    pub columns: Vec<ColumnDescription>,
    pub foreign_keys: Vec<ForeignKeyDescription>,
    pub indexes: Vec<IndexDescription>,
    pub constraints: ConstraintSet,
    pub summaries: Vec<(String, ColumnSummary)>,
}

impl TableDescription {
    pub fn new(name: String) -> Self {
        Self {
            name,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            constraints: ConstraintSet::default(),
            summaries: Vec::new(),
        }
    }
}

/// Schema description in introspection order. Rebuilt on every request, never
/// cached.
#[derive(Debug, Clone, Default)]
pub struct SchemaDescription {
    pub tables: Vec<TableDescription>,
}

impl SchemaDescription {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }
}

/// One suggested analysis produced from a model response. Created fresh per
/// query and discarded after rendering.
#[derive(Debug, Clone, Serialize)]
pub struct VisualizationItem {
    pub description: String,
    pub sql_query: String,
    pub visualization: String,
    pub plotly_express_function: Option<String>,
}

/// Wire shape the analysis prompt asks the model for. All fields are required,
/// so a missing key fails deserialization of the whole response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataAnalysisResponse {
    pub visualizations: Vec<ResponseItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseItem {
    pub description: String,
    pub sql_query: String,
    pub visualization: String,
    pub plotly_express_function: String,
}

/// Tabular query result. An empty row set is valid.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_response_parses_complete_items() {
        let json = r#"{"visualizations":[{"description":"Totals by category",
            "sql_query":"select category, sum(total) from orders group by category",
            "visualization":"bar",
            "plotly_express_function":"px.bar(data, x=\"category\", y=\"sum\")"}]}"#;
        let parsed: DataAnalysisResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.visualizations.len(), 1);
        assert_eq!(parsed.visualizations[0].visualization, "bar");
    }

    #[test]
    fn analysis_response_rejects_missing_sql_query() {
        let json = r#"{"visualizations":[
            {"description":"ok","sql_query":"select 1","visualization":"bar","plotly_express_function":""},
            {"description":"broken","visualization":"line","plotly_express_function":""}]}"#;
        assert!(serde_json::from_str::<DataAnalysisResponse>(json).is_err());
    }
}
