use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::SourceHttpRequest;
use crate::schema::{
    BuildStatus, DeedType, DocumentType, LotType, OwnershipEstateType, PropertyType,
    PropertyUsageType, StructureForm, UnitsType,
};

fn amount<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => serializer.serialize_i64(*v as i64),
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Provenance {
    pub source_http_request: SourceHttpRequest,
    pub request_identifier: String,
}

#[derive(Debug, Serialize)]
pub struct Stamped<'a, T> {
    #[serde(flatten)]
    pub entity: &'a T,
    #[serde(flatten)]
    pub provenance: &'a Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub parcel_identifier: String,
    pub property_legal_description_text: Option<String>,
    pub property_structure_built_year: Option<i32>,
    pub property_effective_built_year: Option<i32>,
    pub livable_floor_area: Option<String>,
    pub total_area: Option<String>,
    pub property_type: PropertyType,
    pub property_usage_type: PropertyUsageType,
    pub build_status: BuildStatus,
    pub structure_form: Option<StructureForm>,
    pub ownership_estate_type: OwnershipEstateType,
    pub subdivision: Option<String>,
    pub zoning: Option<String>,
    pub number_of_units: Option<i64>,
    pub number_of_units_type: Option<UnitsType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Address {
    pub street_number: Option<String>,
    pub street_pre_directional_text: Option<String>,
    pub street_name: Option<String>,
    pub street_suffix_type: Option<String>,
    pub street_post_directional_text: Option<String>,
    pub unit_identifier: Option<String>,
    pub city_name: Option<String>,
    pub state_code: Option<String>,
    pub postal_code: Option<String>,
    pub plus_four_postal_code: Option<String>,
    pub county_name: Option<String>,
    pub country_code: Option<String>,
    pub unnormalized_address: Option<String>,
    pub section: Option<String>,
    pub township: Option<String>,
    pub range: Option<String>,
    pub lot: Option<String>,
    pub block: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailingAddress {
    pub unnormalized_address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lot {
    pub lot_area_sqft: Option<i64>,
    pub lot_size_acre: Option<f64>,
    pub lot_length_feet: Option<f64>,
    pub lot_width_feet: Option<f64>,
    pub lot_type: Option<LotType>,
    pub landscaping_features: Option<String>,
    pub view: Option<String>,
    pub fencing_type: Option<String>,
    pub driveway_material: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Structure {
    pub exterior_wall_material_primary: Option<String>,
    pub roof_covering_material: Option<String>,
    pub roof_design_type: Option<String>,
    pub foundation_type: Option<String>,
    pub number_of_stories: Option<f64>,
    pub primary_framing_material: Option<String>,
    pub number_of_buildings: Option<i64>,
    pub attachment_type: Option<String>,
    pub interior_wall_surface_material_primary: Option<String>,
}

pub const UTILITY_FIELDS: [&str; 19] = [
    "cooling_system_type",
    "heating_system_type",
    "public_utility_type",
    "sewer_type",
    "water_source_type",
    "plumbing_system_type",
    "plumbing_system_type_other_description",
    "electrical_panel_capacity",
    "electrical_wiring_type",
    "electrical_wiring_type_other_description",
    "hvac_condensing_unit_present",
    "hvac_unit_condition",
    "hvac_unit_issues",
    "solar_panel_present",
    "solar_panel_type",
    "solar_panel_type_other_description",
    "solar_inverter_visible",
    "smart_home_features",
    "smart_home_features_other_description",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Utility(Map<String, Value>);

impl Utility {
    pub fn from_feed(entry: Value) -> Self {
        let mut fields: Map<String, Value> = UTILITY_FIELDS
            .iter()
            .map(|field| (field.to_string(), Value::Null))
            .collect();
        match entry {
            Value::Object(feed) => fields.extend(feed),
            other => warn!(entry = %other, "Utility entry is not an object, writing empty utility"),
        }
        Self(fields)
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

impl Default for Utility {
    fn default() -> Self {
        Self::from_feed(Value::Object(Map::new()))
    }
}

impl<'de> Deserialize<'de> for Utility {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_feed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub space_type: String,
    pub space_index: u32,
    pub building_number: Option<u32>,
    pub floor_level: String,
    pub size_square_feet: Option<f64>,
    pub is_exterior: bool,
    pub is_finished: Option<bool>,
    pub flooring_material_type: Option<String>,
    pub has_windows: Option<bool>,
    pub pool_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tax {
    pub tax_year: Option<i32>,
    #[serde(serialize_with = "amount")]
    pub property_assessed_value_amount: Option<f64>,
    #[serde(serialize_with = "amount")]
    pub property_market_value_amount: Option<f64>,
    #[serde(serialize_with = "amount")]
    pub property_building_amount: Option<f64>,
    #[serde(serialize_with = "amount")]
    pub property_land_amount: Option<f64>,
    #[serde(serialize_with = "amount")]
    pub property_taxable_value_amount: Option<f64>,
    #[serde(serialize_with = "amount")]
    pub yearly_tax_amount: Option<f64>,
    #[serde(serialize_with = "amount")]
    pub monthly_tax_amount: Option<f64>,
    pub period_start_date: Option<NaiveDate>,
    pub period_end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sales {
    pub ownership_transfer_date: Option<NaiveDate>,
    #[serde(serialize_with = "amount")]
    pub purchase_price_amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deed {
    pub deed_type: DeedType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRef {
    pub document_type: DocumentType,
    pub file_format: Option<String>,
    pub name: Option<String>,
    pub original_url: Option<String>,
    pub ipfs_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Person {
    pub prefix_name: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub suffix_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub us_citizenship_status: Option<String>,
    pub veteran_status: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Company {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    pub polygon: Option<Vec<[f64; 2]>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
