use std::fmt::Write;

use tracing::warn;

use crate::app::models::{ColumnSummary, SchemaDescription};

/// Serialize a schema description into the text block embedded in prompts.
/// Pure function of its input; table order follows introspection order. An
/// empty schema formats to an empty string (warned, not an error).
pub fn format_schema(schema: &SchemaDescription) -> String {
    if schema.is_empty() {
        warn!("schema is empty");
        return String::new();
    }

    let mut sections = Vec::with_capacity(schema.len());
    for table in &schema.tables {
        let mut out = String::new();
        let _ = writeln!(out, "Table: {}", table.name);

        let _ = writeln!(out, "  Columns:");
        for column in &table.columns {
            let _ = write!(out, "    - {} ({})", column.name, column.data_type);
            if column.nullable {
                let _ = write!(out, " [NULLABLE]");
            }
            if let Some(default) = &column.default {
                let _ = write!(out, " [DEFAULT: {}]", default);
            }
            let _ = writeln!(out);
        }

        if !table.foreign_keys.is_empty() {
            let _ = writeln!(out, "  Foreign Keys:");
            for fk in &table.foreign_keys {
                let _ = writeln!(
                    out,
                    "    - {} -> {}.{}({})",
                    fk.name,
                    fk.referred_schema,
                    fk.referred_table,
                    fk.referred_columns.join(", ")
                );
            }
        }

        if !table.indexes.is_empty() {
            let _ = writeln!(out, "  Indexes:");
            for idx in &table.indexes {
                let _ = writeln!(
                    out,
                    "    - {} on {} [UNIQUE: {}]",
                    idx.name,
                    idx.columns.join(", "),
                    idx.unique
                );
            }
        }

        if !table.constraints.primary_key.is_empty() {
            let _ = writeln!(out, "  Primary Key:");
            let _ = writeln!(out, "    - {}", table.constraints.primary_key.join(", "));
        }

        if !table.constraints.unique.is_empty() {
            let _ = writeln!(out, "  Unique Constraints:");
            for uc in &table.constraints.unique {
                let _ = writeln!(out, "    - {} on {}", uc.name, uc.columns.join(", "));
            }
        }

        if !table.summaries.is_empty() {
            let _ = writeln!(out, "  Data Summary:");
            for (column, summary) in &table.summaries {
                match summary {
                    ColumnSummary::Numeric { min, max } => {
                        let _ = writeln!(
                            out,
                            "    - {}: min={}, max={}",
                            column,
                            min.as_deref().unwrap_or("null"),
                            max.as_deref().unwrap_or("null")
                        );
                    }
                    ColumnSummary::Text { distinct_values } => {
                        let _ = writeln!(
                            out,
                            "    - {}: distinct values: {}",
                            column,
                            distinct_values.join(", ")
                        );
                    }
                }
            }
        }

        sections.push(out);
    }

    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{
        ColumnDescription, ForeignKeyDescription, IndexDescription, TableDescription,
        UniqueConstraint,
    };

    fn orders_table() -> TableDescription {
        let mut table = TableDescription::new("public.orders".to_string());
        table.columns = vec![
            ColumnDescription {
                name: "id".to_string(),
                data_type: "INT".to_string(),
                nullable: false,
                default: None,
            },
            ColumnDescription {
                name: "total".to_string(),
                data_type: "FLOAT".to_string(),
                nullable: true,
                default: Some("0".to_string()),
            },
        ];
        table
    }

    #[test]
    fn empty_schema_formats_to_empty_string() {
        assert_eq!(format_schema(&SchemaDescription::default()), "");
    }

    #[test]
    fn column_flags_only_appear_when_set() {
        let schema = SchemaDescription {
            tables: vec![orders_table()],
        };
        let text = format_schema(&schema);
        assert!(text.contains("Table: public.orders"));
        assert!(text.contains("    - id (INT)\n"));
        assert!(text.contains("    - total (FLOAT) [NULLABLE] [DEFAULT: 0]\n"));
        // No constraint blocks for a bare table.
        assert!(!text.contains("Foreign Keys:"));
        assert!(!text.contains("Primary Key:"));
    }

    #[test]
    fn constraint_blocks_render_in_order() {
        let mut table = orders_table();
        table.foreign_keys = vec![ForeignKeyDescription {
            name: "orders_customer_fkey".to_string(),
            columns: vec!["customer_id".to_string()],
            referred_schema: "public".to_string(),
            referred_table: "customers".to_string(),
            referred_columns: vec!["id".to_string(), "region".to_string()],
        }];
        table.indexes = vec![IndexDescription {
            name: "idx_orders_total".to_string(),
            columns: vec!["total".to_string()],
            unique: false,
        }];
        table.constraints.primary_key = vec!["id".to_string()];
        table.constraints.unique = vec![UniqueConstraint {
            name: "orders_number_key".to_string(),
            columns: vec!["number".to_string()],
        }];
        table.summaries = vec![(
            "total".to_string(),
            ColumnSummary::Numeric {
                min: Some("0".to_string()),
                max: Some("120.5".to_string()),
            },
        )];

        let schema = SchemaDescription { tables: vec![table] };
        let text = format_schema(&schema);
        assert!(text.contains(
            "    - orders_customer_fkey -> public.customers(id, region)\n"
        ));
        assert!(text.contains("    - idx_orders_total on total [UNIQUE: false]\n"));
        assert!(text.contains("  Primary Key:\n    - id\n"));
        assert!(text.contains("    - orders_number_key on number\n"));
        assert!(text.contains("    - total: min=0, max=120.5\n"));
    }

    #[test]
    fn tables_keep_introspection_order() {
        let mut first = orders_table();
        first.name = "public.a_first".to_string();
        let mut second = orders_table();
        second.name = "public.z_second".to_string();
        let schema = SchemaDescription {
            tables: vec![second.clone(), first.clone()],
        };
        let text = format_schema(&schema);
        let z = text.find("public.z_second").unwrap();
        let a = text.find("public.a_first").unwrap();
        assert!(z < a);
    }
}
