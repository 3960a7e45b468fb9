use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::{Map, Value, json};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wolldb::dataset::{Dataset, Schema};
use wolldb::search;
use wolldb::settings::Settings;

/// Searches the configured data sources and prints one JSON object per hit.
#[derive(Parser)]
#[command(name = "wolldb")]
#[command(version)]
struct Cli {
    /// Settings file, defaults to an optional wolldb.toml
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Search words, e.g. "Mustermann, Max"
    words: Vec<String>,
}

fn as_json(dataset: &dyn Dataset, schema: &Schema) -> Value {
    let columns: Map<String, Value> = schema
        .iter()
        .map(|column| {
            let value = match dataset.get(column) {
                Ok(Some(v)) => Value::String(v),
                Ok(None) | Err(_) => Value::Null,
            };
            (column.clone(), value)
        })
        .collect();
    json!({ "key": dataset.key(), "columns": columns })
}

fn run(settings: &Settings, words: &[String]) -> wolldb::Result<usize> {
    let (joiner, strategy) = settings.open()?;
    let query = words.join(" ");
    let results = search::search(&query, &strategy, &joiner, settings.use_main_source)?;
    info!(query = %query, hits = results.len(), "Search finished");

    // hits from other sources print the columns they share with the main schema
    let schema = joiner.main_schema();
    for dataset in &results {
        println!("{}", as_json(dataset.as_ref(), &schema));
    }
    Ok(results.len())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = Settings::load(cli.settings.as_deref());
    let fallback = settings
        .as_ref()
        .map(|s| s.log_filter.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_writer(std::io::stderr)
        .init();

    match settings.and_then(|s| run(&s, &cli.words)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "wolldb failed");
            ExitCode::FAILURE
        }
    }
}
