use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::entities::Utility;
use crate::normalize::clean_text;

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

// Flags arrive as booleans, `"Y"`/`"yes"`/`"true"`, or 0/1. Anything else is unknown.
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" | "1" => Some(true),
            "n" | "no" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHttpRequest {
    pub method: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySeed {
    #[serde(default, deserialize_with = "lenient_text")]
    pub parcel_id: Option<String>,
    pub request_identifier: String,
    pub source_http_request: SourceHttpRequest,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawParcel {
    #[serde(deserialize_with = "lenient_text")]
    pub parcel_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub legal_description: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub use_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub year_built: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub effective_year_built: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub livable_area: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub total_area: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub subdivision: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub zoning: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub number_of_units: Option<String>,
    pub address: RawAddress,
    #[serde(deserialize_with = "lenient_text")]
    pub mailing_address: Option<String>,
    pub lot: RawLot,
    pub structure: RawStructure,
    pub geometry: Option<RawGeometry>,
    pub taxes: Vec<RawTaxRow>,
    pub sales: Vec<RawSaleRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAddress {
    #[serde(deserialize_with = "lenient_text")]
    pub full: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub street_number: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub street_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub unit: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub state: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub postal_code: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub county: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub section: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub township: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub range: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub lot: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub block: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLot {
    #[serde(deserialize_with = "lenient_text")]
    pub acreage: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub area_sqft: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub frontage: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub depth: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStructure {
    #[serde(deserialize_with = "lenient_text")]
    pub exterior_wall: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub roof_cover: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub roof_type: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub foundation: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub stories: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub framing: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub buildings: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawGeometry {
    /// Ring of `[longitude, latitude]` pairs.
    pub polygon: Vec<[f64; 2]>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTaxRow {
    #[serde(deserialize_with = "lenient_text")]
    pub year: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub assessed: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub market: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub land: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub building: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub taxable: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub total_tax: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSaleRow {
    #[serde(deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub price: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub instrument: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub book: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub page: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub document_url: Option<String>,
}

pub const CURRENT_OWNERS_KEY: &str = "current";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnerHistory {
    #[serde(default, deserialize_with = "lenient_owner_buckets")]
    pub owners_by_date: BTreeMap<String, Vec<RawOwner>>,
}

fn lenient_owner_buckets<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<RawOwner>>, D::Error>
where
    D: Deserializer<'de>,
{
    let buckets = match Value::deserialize(deserializer)? {
        Value::Object(buckets) => buckets,
        Value::Null => return Ok(BTreeMap::new()),
        other => {
            warn!(owners_by_date = %other, "owners_by_date is not an object, ignoring it");
            return Ok(BTreeMap::new());
        }
    };
    Ok(buckets
        .into_iter()
        .map(|(key, entries)| {
            let entries = match entries {
                Value::Array(entries) => entries,
                Value::Null => Vec::new(),
                other => {
                    warn!(bucket = %key, entry = %other, "Owner bucket is not a list, ignoring it");
                    Vec::new()
                }
            };
            let owners = entries
                .into_iter()
                .filter_map(|entry| match serde_json::from_value::<RawOwner>(entry) {
                    Ok(owner) => Some(owner),
                    Err(err) => {
                        warn!(bucket = %key, error = %err, "Skipping owner entry that does not parse");
                        None
                    }
                })
                .collect();
            (key, owners)
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawOwner {
    Person {
        #[serde(default, deserialize_with = "lenient_text")]
        first_name: Option<String>,
        #[serde(default, deserialize_with = "lenient_text")]
        middle_name: Option<String>,
        #[serde(default, deserialize_with = "lenient_text")]
        last_name: Option<String>,
        #[serde(default, deserialize_with = "lenient_text")]
        prefix_name: Option<String>,
        #[serde(default, deserialize_with = "lenient_text")]
        suffix_name: Option<String>,
    },
    Company {
        #[serde(default, deserialize_with = "lenient_text")]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutFeed {
    #[serde(default)]
    pub layouts: Vec<RawLayout>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLayout {
    #[serde(deserialize_with = "lenient_text")]
    pub space_type: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub building_number: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub floor_level: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub size_square_feet: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_exterior: Option<bool>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_finished: Option<bool>,
    #[serde(deserialize_with = "lenient_text")]
    pub flooring_material_type: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub has_windows: Option<bool>,
    #[serde(deserialize_with = "lenient_text")]
    pub pool_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParcelInput {
    pub seed: PropertySeed,
    pub raw: RawParcel,
    pub owners: Option<OwnerHistory>,
    pub utility: Option<Utility>,
    pub layouts: Option<LayoutFeed>,
}

pub fn parcel_identifier(seed: &PropertySeed, raw: &RawParcel) -> Option<String> {
    clean_text(seed.parcel_id.as_deref()).or_else(|| clean_text(raw.parcel_id.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_scalars_accept_strings_and_numbers() {
        let raw: RawParcel = serde_json::from_str(
            r#"{"parcel_id": 12345, "year_built": "1987", "sales": [{"price": 100000}]}"#,
        )
        .expect("raw parcel");
        assert_eq!(raw.parcel_id.as_deref(), Some("12345"));
        assert_eq!(raw.year_built.as_deref(), Some("1987"));
        assert_eq!(raw.sales[0].price.as_deref(), Some("100000"));
        assert!(raw.taxes.is_empty());
    }

    #[test]
    fn seed_parcel_id_takes_precedence() {
        let seed: PropertySeed = serde_json::from_str(
            r#"{"parcel_id": " ", "request_identifier": "r1",
                "source_http_request": {"method": "GET", "url": "https://example.org"}}"#,
        )
        .expect("seed");
        let raw = RawParcel {
            parcel_id: Some("A-1".to_string()),
            ..RawParcel::default()
        };
        assert_eq!(parcel_identifier(&seed, &raw).as_deref(), Some("A-1"));
        assert_eq!(parcel_identifier(&seed, &RawParcel::default()), None);
    }

    #[test]
    fn owners_are_tagged_by_type() {
        let history: OwnerHistory = serde_json::from_str(
            r#"{"owners_by_date": {"current": [
                {"type": "person", "first_name": "jane", "last_name": "doe"},
                {"type": "company", "name": "ACME LLC"}
            ]}}"#,
        )
        .expect("owners");
        let current = &history.owners_by_date[CURRENT_OWNERS_KEY];
        assert!(matches!(&current[0], RawOwner::Person { first_name: Some(f), .. } if f == "jane"));
        assert!(matches!(&current[1], RawOwner::Company { name: Some(n) } if n == "ACME LLC"));
    }

    #[test]
    fn malformed_owner_entries_are_skipped() {
        let history: OwnerHistory = serde_json::from_str(
            r#"{"owners_by_date": {
                "current": [
                    {"type": null, "name": "Nobody"},
                    {"type": "trust", "name": "Family Trust"},
                    "JANE DOE",
                    {"type": "company", "name": 42}
                ],
                "2019-05-01": "unknown"
            }}"#,
        )
        .expect("owners");
        assert_eq!(
            history.owners_by_date[CURRENT_OWNERS_KEY],
            vec![RawOwner::Company {
                name: Some("42".to_string())
            }]
        );
        assert!(history.owners_by_date["2019-05-01"].is_empty());
    }
}
