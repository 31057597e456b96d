use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::code_mapper::CodeTableFile;
use crate::config::Config;
use crate::error::PipelineError;
use crate::models::{parcel_identifier, ParcelInput, PropertySeed, RawParcel};
use crate::schema::{Classification, DeedType};

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

pub fn feed_key(parcel_id: &str) -> String {
    format!("property_{parcel_id}")
}

pub fn load_feed<T: DeserializeOwned>(path: &Path, parcel_id: &str) -> Result<Option<T>> {
    if !path.exists() {
        debug!(path = %path.display(), "Optional feed not present");
        return Ok(None);
    }
    let mut feed: BTreeMap<String, Value> = read_json(path)?;
    let key = feed_key(parcel_id);
    let Some(entry) = feed.remove(&key) else {
        debug!(path = %path.display(), key = %key, "Feed has no entry for parcel");
        return Ok(None);
    };
    if entry.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(entry) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            warn!(path = %path.display(), key = %key, error = %err, "Ignoring malformed feed entry");
            Ok(None)
        }
    }
}

pub fn load_use_codes(path: &Path) -> Result<CodeTableFile<Classification>> {
    let table: CodeTableFile<Classification> = read_json(path)?;
    info!(path = %path.display(), entries = table.entries.len(), "Loaded use-code table");
    Ok(table)
}

pub fn load_deed_codes(path: Option<&Path>) -> Result<Option<CodeTableFile<DeedType>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let table: CodeTableFile<DeedType> = read_json(path)?;
    info!(path = %path.display(), entries = table.entries.len(), "Loaded deed-code table");
    Ok(Some(table))
}

pub fn load_parcel_input(config: &Config) -> Result<ParcelInput> {
    let seed: PropertySeed = read_json(&config.seed_path)?;
    let raw: RawParcel = read_json(&config.input_path)?;
    let parcel_id = parcel_identifier(&seed, &raw)
        .ok_or_else(|| PipelineError::missing("property.parcel_identifier"))?;

    let owners = load_feed(&config.owners_path, &parcel_id)?;
    let utility = load_feed(&config.utilities_path, &parcel_id)?;
    let layouts = load_feed(&config.layouts_path, &parcel_id)?;
    info!(
        parcel_id = %parcel_id,
        owners = owners.is_some(),
        utility = utility.is_some(),
        layouts = layouts.is_some(),
        "Loaded parcel input"
    );

    Ok(ParcelInput {
        seed,
        raw,
        owners,
        utility,
        layouts,
    })
}
