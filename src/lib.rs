pub mod app;

// Re-export useful types for library users
pub use app::config::AppConfig;
pub use app::gateway::LlmGateway;
pub use app::inspector::Inspector;
pub use app::models::{
    ColumnDescription, DataAnalysisResponse, ForeignKeyDescription, SchemaDescription, Table,
    TableDescription, VisualizationItem,
};
pub use app::renderer::{ChartSpec, ChartType};
pub use app::source::{DataSource, Dialect};
