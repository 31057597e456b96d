mod address;
mod artifact_store;
mod builders;
mod code_mapper;
mod config;
mod entities;
mod error;
mod graph;
mod layout;
mod models;
mod normalize;
mod owners;
mod schema;
mod sources;
mod transform;

use std::process::ExitCode;

use anyhow::Result;
use config::Config;
use tracing::{debug, info};
use transform::Mappers;

fn run() -> Result<usize> {
    let config = Config::from_env()?;
    info!(
        input = %config.input_path.display(),
        output_dir = %config.output_dir.display(),
        "parcel-graph starting"
    );

    let use_codes = sources::load_use_codes(&config.use_codes_path)?;
    let deed_codes = sources::load_deed_codes(config.deed_codes_path.as_deref())?;
    let mappers = Mappers::new(use_codes, deed_codes, config.strict_deed_types);

    let input = sources::load_parcel_input(&config)?;
    transform::write_parcel_graph(&input, &mappers, &config.output_dir)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parcel_graph=info".into()),
        )
        .init();

    match run() {
        Ok(documents) => {
            info!(documents, "parcel-graph finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            debug!("{err:#}");
            eprintln!("{}", error::diagnostic_for(&err));
            ExitCode::FAILURE
        }
    }
}
