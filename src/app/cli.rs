use clap::{Parser, Subcommand};

use crate::app::source::Dialect;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Data source: a database URL or a path to a .csv file. If not
    /// provided, looks for the DATABASE_URL env var.
    #[arg(short, long)]
    pub source: Option<String>,

    /// Override the dialect sniffed from the source URL.
    #[arg(long)]
    pub dialect: Option<Dialect>,

    /// Chat model to use. If not provided, looks for DATATALK_MODEL.
    #[arg(long)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the formatted schema of the data source.
    Schema {
        /// Also collect per-column data summaries (min/max, distinct values).
        #[arg(long)]
        summaries: bool,
    },
    /// Ask the model for a plain-language overview of the data source.
    Overview,
    /// Answer a natural-language question with SQL, results, and charts.
    Ask {
        /// The question to answer.
        query: String,
    },
    /// Generate dashboard code answering a natural-language question.
    Dashboard {
        /// The question the dashboard should answer.
        query: String,
    },
}
