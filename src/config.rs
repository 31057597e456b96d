use std::{env, path::PathBuf};

use anyhow::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub input_path: PathBuf,
    pub seed_path: PathBuf,
    pub owners_path: PathBuf,
    pub utilities_path: PathBuf,
    pub layouts_path: PathBuf,
    pub use_codes_path: PathBuf,
    pub deed_codes_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub strict_deed_types: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let value = |name: &str| {
            lookup(name)
                .map(|v| v.trim().trim_matches('"').trim_matches('\'').to_string())
                .filter(|v| !v.is_empty())
        };
        let path = |name: &str, default: &str| {
            PathBuf::from(value(name).unwrap_or_else(|| default.to_string()))
        };

        let strict_deed_types = value("PARCEL_GRAPH_STRICT_DEED_TYPES")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Ok(Self {
            input_path: path("PARCEL_GRAPH_INPUT", "input/parcel.json"),
            seed_path: path("PARCEL_GRAPH_SEED", "input/property_seed.json"),
            owners_path: path("PARCEL_GRAPH_OWNERS", "owners/owner_data.json"),
            utilities_path: path("PARCEL_GRAPH_UTILITIES", "owners/utilities_data.json"),
            layouts_path: path("PARCEL_GRAPH_LAYOUTS", "owners/layout_data.json"),
            use_codes_path: path("PARCEL_GRAPH_USE_CODES", "tables/use_codes.json"),
            deed_codes_path: value("PARCEL_GRAPH_DEED_CODES").map(PathBuf::from),
            output_dir: path("PARCEL_GRAPH_OUTPUT_DIR", "data"),
            strict_deed_types,
        })
    }
}
