use thiserror::Error;

// Fatal errors bubble to the CLI boundary as user-visible messages. Facet-level
// introspection failures and unknown chart tags are warnings, not variants here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to connect to data source: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("failed to list schemas from data source: {0}")]
    Introspection(#[source] sqlx::Error),

    #[error("failed to read file data source {path}: {source}")]
    File {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("language model request failed: {0}")]
    Gateway(String),

    #[error("language model returned a malformed response: {message}\n--- raw response ---\n{raw}")]
    MalformedResponse { message: String, raw: String },

    #[error("could not extract {expected} from model response")]
    Extraction { expected: &'static str },

    #[error("query execution failed: {0}")]
    QueryExecution(#[source] sqlx::Error),

    #[error("SQL execution is not supported for file-based data sources")]
    UnsupportedOperation,

    #[error("unsupported data source: {0}")]
    UnsupportedSource(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
