pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod file;
pub mod formatter;
pub mod gateway;
pub mod inspector;
pub mod interpreter;
pub mod models;
pub mod prompts;
pub mod renderer;
pub mod source;

use anyhow::Result;
use clap::Parser;
use tracing::{error, warn};

use self::cli::{Cli, Command};
use self::config::{resolve_config, AppConfig};
use self::error::PipelineError;
use self::gateway::LlmGateway;
use self::models::{Table, VisualizationItem};
use self::renderer::ChartSpec;
use self::source::DataSource;

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let config = resolve_config(&args)?;
    let source = DataSource::open(&config.source, config.dialect_override).await?;

    match args.command {
        Command::Schema { .. } => {
            print!("{}", formatted_schema(&source, &config).await?);
        }
        Command::Overview => {
            let schema = formatted_schema(&source, &config).await?;
            let gateway = LlmGateway::new(config.require_api_key()?, &config.model);
            let overview = gateway.send(&prompts::overview_messages(&schema)).await?;
            println!("{}", overview);
        }
        Command::Ask { ref query } => {
            ask(&source, &config, query).await?;
        }
        Command::Dashboard { ref query } => {
            let schema = formatted_schema(&source, &config).await?;
            let gateway = LlmGateway::new(config.require_api_key()?, &config.model);
            let code = gateway
                .send(&prompts::dashboard_messages(&schema, source.dialect(), query))
                .await?;
            println!("{}", code);
        }
    }

    Ok(())
}

async fn formatted_schema(source: &DataSource, config: &AppConfig) -> Result<String> {
    let schema = source.schema(config.collect_summaries).await?;
    Ok(source.format_schema(&schema))
}

/// The full question-to-charts pipeline: introspect, prompt, interpret,
/// then execute and render each suggested visualization independently so one
/// bad query never sinks the rest of the batch.
async fn ask(source: &DataSource, config: &AppConfig, query: &str) -> Result<()> {
    let schema = formatted_schema(source, config).await?;
    if schema.is_empty() {
        warn!("data source schema is empty; the model has nothing to work with");
    }

    let gateway = LlmGateway::new(config.require_api_key()?, &config.model);
    let dialect = source.dialect();
    let messages = prompts::analysis_messages(&schema, dialect, query);

    let items = match gateway.analyze(&messages).await {
        Ok(response) => interpreter::interpret_structured(response, dialect),
        // Some models ignore the JSON instruction; fall back to the
        // marker-based text format before giving up.
        Err(PipelineError::MalformedResponse { raw, .. }) => {
            warn!("response was not valid JSON, trying text extraction");
            interpreter::interpret_text(&raw, dialect)?
        }
        Err(e) => return Err(e.into()),
    };

    for item in &items {
        if let Err(e) = run_item(source, item).await {
            error!("visualization failed: {}", e);
        }
    }
    Ok(())
}

async fn run_item(source: &DataSource, item: &VisualizationItem) -> Result<()> {
    println!("\n{}", item.description);
    println!("SQL: {}", item.sql_query);

    let table = source.execute_sql(&item.sql_query).await?;
    print_table(&table);

    let chart = match &item.plotly_express_function {
        Some(call) => match renderer::parse_plot_call(call) {
            Ok(parsed) => renderer::render_call(&parsed, &table),
            Err(reason) => {
                warn!("rejected plotting call: {}", reason);
                renderer::render(&item.visualization, &table)
            }
        },
        None => renderer::render(&item.visualization, &table),
    };
    if let Some(chart) = chart {
        print_chart(&chart)?;
    }
    Ok(())
}

fn print_table(table: &Table) {
    if table.is_empty() {
        println!("(no rows)");
        return;
    }
    println!("{}", table.columns.join(" | "));
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(render_cell).collect();
        println!("{}", cells.join(" | "));
    }
}

fn render_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn print_chart(chart: &ChartSpec) -> Result<()> {
    println!("Chart: {}", serde_json::to_string(chart)?);
    Ok(())
}
