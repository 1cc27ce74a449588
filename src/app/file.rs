use tracing::info;

use crate::app::error::{PipelineError, Result};

/// How many records get sampled when sniffing column types.
const TYPE_SNIFF_ROWS: usize = 50;

/// Local delimited-file data source. Supports schema discovery only; SQL
/// execution against a file is a defined failure, not an afterthought.
pub struct FileSource {
    path: String,
}

impl FileSource {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }

    /// Column names from the header row, types sniffed from a bounded sample
    /// of values.
    pub fn schema(&self) -> Result<Vec<(String, String)>> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(|source| {
            PipelineError::File {
                path: self.path.clone(),
                source,
            }
        })?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| PipelineError::File {
                path: self.path.clone(),
                source,
            })?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut kinds: Vec<Option<ValueKind>> = vec![None; headers.len()];
        for record in reader.records().take(TYPE_SNIFF_ROWS) {
            let record = record.map_err(|source| PipelineError::File {
                path: self.path.clone(),
                source,
            })?;
            for (i, field) in record.iter().enumerate() {
                if i >= kinds.len() || field.is_empty() {
                    continue;
                }
                let observed = ValueKind::of(field);
                kinds[i] = Some(match kinds[i] {
                    None => observed,
                    Some(current) => current.widen(observed),
                });
            }
        }

        let schema: Vec<(String, String)> = headers
            .into_iter()
            .zip(kinds)
            .map(|(name, kind)| {
                (name, kind.unwrap_or(ValueKind::Text).type_name().to_string())
            })
            .collect();
        info!("file schema retrieved with {} columns", schema.len());
        Ok(schema)
    }

    pub fn format_schema(columns: &[(String, String)]) -> String {
        if columns.is_empty() {
            return String::new();
        }
        let mut out = String::from("File Schema:\n");
        for (name, dtype) in columns {
            out.push_str(&format!("  - {}: {}\n", name, dtype));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ValueKind {
    fn of(value: &str) -> Self {
        if value.parse::<i64>().is_ok() {
            ValueKind::Integer
        } else if value.parse::<f64>().is_ok() {
            ValueKind::Float
        } else if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
            ValueKind::Boolean
        } else {
            ValueKind::Text
        }
    }

    /// Widen the running inference with a newly observed value kind.
    fn widen(self, other: Self) -> Self {
        use ValueKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ValueKind::Integer => "INTEGER",
            ValueKind::Float => "FLOAT",
            ValueKind::Boolean => "BOOLEAN",
            ValueKind::Text => "TEXT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn schema_sniffs_column_types_from_values() {
        let file = write_csv("id,total,category,active\n1,9.5,books,true\n2,3,games,false\n");
        let source = FileSource::new(file.path().to_str().unwrap());
        let schema = source.schema().unwrap();
        assert_eq!(
            schema,
            vec![
                ("id".to_string(), "INTEGER".to_string()),
                ("total".to_string(), "FLOAT".to_string()),
                ("category".to_string(), "TEXT".to_string()),
                ("active".to_string(), "BOOLEAN".to_string()),
            ]
        );
    }

    #[test]
    fn mixed_integer_and_float_widen_to_float() {
        assert_eq!(ValueKind::Integer.widen(ValueKind::Float), ValueKind::Float);
        assert_eq!(ValueKind::Float.widen(ValueKind::Text), ValueKind::Text);
        assert_eq!(
            ValueKind::Boolean.widen(ValueKind::Integer),
            ValueKind::Text
        );
    }

    #[test]
    fn format_schema_lists_columns() {
        let columns = vec![
            ("id".to_string(), "INTEGER".to_string()),
            ("name".to_string(), "TEXT".to_string()),
        ];
        let text = FileSource::format_schema(&columns);
        assert!(text.starts_with("File Schema:"));
        assert!(text.contains("  - id: INTEGER"));
        assert!(text.contains("  - name: TEXT"));
    }

    #[test]
    fn empty_file_schema_formats_to_empty_string() {
        assert_eq!(FileSource::format_schema(&[]), "");
    }

    #[test]
    fn missing_file_is_an_error() {
        let source = FileSource::new("/nonexistent/orders.csv");
        assert!(source.schema().is_err());
    }
}
