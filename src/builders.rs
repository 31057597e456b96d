use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::warn;

use crate::code_mapper::{CodeMapper, CodeTable, CodeTableFile, KeywordRule, Strategy};
use crate::entities::{Deed, FileRef, Geometry, Lot, Property, Sales, Structure, Tax};
use crate::error::PipelineError;
use crate::models::{RawGeometry, RawLot, RawParcel, RawSaleRow, RawStructure, RawTaxRow};
use crate::normalize::{
    acres_to_sqft, clean_text, numeric_text, parse_acreage, parse_area, parse_currency,
    parse_date, parse_decimal, parse_int, parse_year, sqft_to_acres,
};
use crate::schema::{Classification, DeedType, LotType};

pub fn build_property(
    raw: &RawParcel,
    parcel_identifier: String,
    classification: Classification,
) -> Property {
    Property {
        parcel_identifier,
        property_legal_description_text: clean_text(raw.legal_description.as_deref()),
        property_structure_built_year: raw.year_built.as_deref().and_then(parse_year),
        property_effective_built_year: raw.effective_year_built.as_deref().and_then(parse_year),
        livable_floor_area: raw.livable_area.as_deref().and_then(numeric_text),
        total_area: raw.total_area.as_deref().and_then(numeric_text),
        property_type: classification.property_type,
        property_usage_type: classification.property_usage_type,
        build_status: classification.build_status,
        structure_form: classification.structure_form,
        ownership_estate_type: classification.ownership_estate_type,
        subdivision: clean_text(raw.subdivision.as_deref()),
        zoning: clean_text(raw.zoning.as_deref()),
        number_of_units: raw.number_of_units.as_deref().and_then(parse_int),
        number_of_units_type: classification.property_type.units_type(),
    }
}

pub fn build_lot(raw: &RawLot) -> Option<Lot> {
    let acres = raw.acreage.as_deref().and_then(parse_acreage);
    let sqft = raw.area_sqft.as_deref().and_then(parse_area);
    let (area_sqft, size_acre) = match (sqft, acres) {
        (Some(sqft), Some(acres)) => (Some(sqft), Some(acres)),
        (Some(sqft), None) => (Some(sqft), Some(sqft_to_acres(sqft))),
        (None, Some(acres)) => (Some(acres_to_sqft(acres)), Some(acres)),
        (None, None) => (None, None),
    };
    let width = raw.frontage.as_deref().and_then(parse_area);
    let length = raw.depth.as_deref().and_then(parse_area);

    if area_sqft.is_none() && width.is_none() && length.is_none() {
        return None;
    }

    Some(Lot {
        lot_area_sqft: area_sqft.map(|v| v.round() as i64),
        lot_size_acre: size_acre.map(|v| (v * 10_000.0).round() / 10_000.0),
        lot_length_feet: length,
        lot_width_feet: width,
        lot_type: size_acre.map(LotType::from_acres),
        landscaping_features: None,
        view: None,
        fencing_type: None,
        driveway_material: None,
    })
}

#[derive(Debug, Clone)]
pub struct StructureVocabulary {
    pub exterior_wall: CodeMapper<&'static str>,
    pub roof_covering: CodeMapper<&'static str>,
    pub roof_design: CodeMapper<&'static str>,
    pub foundation: CodeMapper<&'static str>,
    pub framing: CodeMapper<&'static str>,
}

impl Default for StructureVocabulary {
    fn default() -> Self {
        let rule = KeywordRule::new;
        Self {
            exterior_wall: CodeMapper::keywords(vec![
                rule(&["STUCCO"], "Stucco"),
                rule(&["BRICK"], "Brick"),
                rule(&["STONE"], "Natural Stone"),
                rule(&["VINYL"], "Vinyl Siding"),
                rule(&["ALUM"], "Aluminum Siding"),
                rule(&["HARDI"], "Fiber Cement Siding"),
                rule(&["BLOCK"], "Concrete Block"),
                rule(&["CONC"], "Concrete Block"),
                rule(&["CB"], "Concrete Block"),
                rule(&["LOG"], "Log"),
                rule(&["WOOD"], "Wood Siding"),
                rule(&["FRAME"], "Wood Siding"),
                rule(&["SIDING"], "Wood Siding"),
            ]),
            roof_covering: CodeMapper::keywords(vec![
                rule(&["SHINGLE"], "Architectural Asphalt Shingle"),
                rule(&["ASPH"], "Architectural Asphalt Shingle"),
                rule(&["COMP"], "Architectural Asphalt Shingle"),
                rule(&["METAL"], "Metal Standing Seam"),
                rule(&["TILE"], "Clay Tile"),
                rule(&["BUILT"], "Built-Up Roof"),
                rule(&["TPO"], "TPO Membrane"),
                rule(&["SLATE"], "Natural Slate"),
                rule(&["WOOD"], "Wood Shake"),
            ]),
            roof_design: CodeMapper::keywords(vec![
                rule(&["GABLE"], "Gable").excluding(&["HIP"]),
                rule(&["HIP"], "Hip").excluding(&["GABLE"]),
                rule(&["GABLE", "HIP"], "Combination"),
                rule(&["FLAT"], "Flat"),
                rule(&["SHED"], "Shed"),
                rule(&["MANSARD"], "Mansard"),
                rule(&["GAMBREL"], "Gambrel"),
            ]),
            foundation: CodeMapper::keywords(vec![
                rule(&["SLAB"], "Slab on Grade"),
                rule(&["CRAWL"], "Crawl Space"),
                rule(&["BASEMENT"], "Full Basement"),
                rule(&["PIER"], "Pier and Beam"),
                rule(&["PILING"], "Pier and Beam"),
                rule(&["STEM"], "Stem Wall"),
            ]),
            framing: CodeMapper::keywords(vec![
                rule(&["STEEL"], "Steel Frame"),
                rule(&["MASONRY"], "Masonry"),
                rule(&["BLOCK"], "Masonry"),
                rule(&["CONC"], "Poured Concrete"),
                rule(&["WOOD"], "Wood Frame"),
                rule(&["FRAME"], "Wood Frame"),
            ]),
        }
    }
}

fn vocabulary_value(
    mapper: &CodeMapper<&'static str>,
    raw: Option<&str>,
    path: &str,
) -> Option<String> {
    let label = clean_text(raw)?;
    match mapper.resolve(&label) {
        Some(resolved) => Some(resolved.value.to_string()),
        None => {
            warn!(label = %label, path, "No canonical value for structure label");
            None
        }
    }
}

pub fn build_structure(raw: &RawStructure, vocabulary: &StructureVocabulary) -> Option<Structure> {
    let structure = Structure {
        exterior_wall_material_primary: vocabulary_value(
            &vocabulary.exterior_wall,
            raw.exterior_wall.as_deref(),
            "structure.exterior_wall_material_primary",
        ),
        roof_covering_material: vocabulary_value(
            &vocabulary.roof_covering,
            raw.roof_cover.as_deref(),
            "structure.roof_covering_material",
        ),
        roof_design_type: vocabulary_value(
            &vocabulary.roof_design,
            raw.roof_type.as_deref(),
            "structure.roof_design_type",
        ),
        foundation_type: vocabulary_value(
            &vocabulary.foundation,
            raw.foundation.as_deref(),
            "structure.foundation_type",
        ),
        number_of_stories: raw.stories.as_deref().and_then(parse_decimal),
        primary_framing_material: vocabulary_value(
            &vocabulary.framing,
            raw.framing.as_deref(),
            "structure.primary_framing_material",
        ),
        number_of_buildings: raw.buildings.as_deref().and_then(parse_int),
        attachment_type: None,
        interior_wall_surface_material_primary: None,
    };
    let empty = structure.exterior_wall_material_primary.is_none()
        && structure.roof_covering_material.is_none()
        && structure.roof_design_type.is_none()
        && structure.foundation_type.is_none()
        && structure.number_of_stories.is_none()
        && structure.primary_framing_material.is_none()
        && structure.number_of_buildings.is_none();
    (!empty).then_some(structure)
}

pub fn build_tax(row: &RawTaxRow) -> Option<Tax> {
    let money = |raw: &Option<String>| raw.as_deref().and_then(parse_currency);
    let tax_year = row.year.as_deref().and_then(parse_year);
    let yearly = money(&row.total_tax);
    let tax = Tax {
        tax_year,
        property_assessed_value_amount: money(&row.assessed),
        property_market_value_amount: money(&row.market),
        property_building_amount: money(&row.building),
        property_land_amount: money(&row.land),
        property_taxable_value_amount: money(&row.taxable),
        yearly_tax_amount: yearly,
        monthly_tax_amount: yearly.map(|y| (y / 12.0 * 100.0).round() / 100.0),
        period_start_date: tax_year.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)),
        period_end_date: tax_year.and_then(|y| NaiveDate::from_ymd_opt(y, 12, 31)),
    };
    let empty = tax.tax_year.is_none()
        && tax.property_assessed_value_amount.is_none()
        && tax.property_market_value_amount.is_none()
        && tax.property_building_amount.is_none()
        && tax.property_land_amount.is_none()
        && tax.property_taxable_value_amount.is_none()
        && tax.yearly_tax_amount.is_none();
    (!empty).then_some(tax)
}

pub fn build_taxes(rows: &[RawTaxRow]) -> Vec<Tax> {
    let mut taxes: Vec<Tax> = rows.iter().filter_map(build_tax).collect();
    taxes.sort_by(|a, b| b.tax_year.cmp(&a.tax_year));
    taxes
}

pub fn build_sale(row: &RawSaleRow) -> Sales {
    Sales {
        ownership_transfer_date: row.date.as_deref().and_then(parse_date),
        purchase_price_amount: row.price.as_deref().and_then(parse_currency),
    }
}

fn has_recording(row: &RawSaleRow) -> bool {
    [&row.instrument, &row.book, &row.page, &row.document_url]
        .into_iter()
        .any(|field| clean_text(field.as_deref()).is_some())
}

pub fn ordered_sales(rows: &[RawSaleRow]) -> Vec<(Sales, &RawSaleRow)> {
    let mut sales: Vec<(Sales, &RawSaleRow)> = rows
        .iter()
        .map(|row| (build_sale(row), row))
        .filter(|(sale, row)| {
            sale.ownership_transfer_date.is_some()
                || sale.purchase_price_amount.is_some()
                || has_recording(row)
        })
        .collect();
    sales.sort_by(|(a, _), (b, _)| {
        match (a.ownership_transfer_date, b.ownership_transfer_date) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
    sales
}

/// Deed classification. Built-in abbreviations sit under any injected
/// override table. Unless `strict`, the chain ends in `Miscellaneous`, so
/// resolution never fails for a non-blank label.
pub fn deed_mapper(overrides: Option<CodeTableFile<DeedType>>, strict: bool) -> CodeMapper<DeedType> {
    let mut entries: BTreeMap<String, DeedType> = [
        ("WD", DeedType::Warranty),
        ("WTY", DeedType::Warranty),
        ("SWD", DeedType::SpecialWarranty),
        ("SW", DeedType::SpecialWarranty),
        ("QCD", DeedType::Quitclaim),
        ("QC", DeedType::Quitclaim),
        ("TD", DeedType::Tax),
        ("TRD", DeedType::Trustees),
        ("PRD", DeedType::PersonalRepresentative),
        ("PR", DeedType::PersonalRepresentative),
        ("CD", DeedType::Correction),
        ("GD", DeedType::Grant),
        ("SD", DeedType::Sheriffs),
        ("LE", DeedType::LifeEstate),
    ]
    .into_iter()
    .map(|(code, deed)| (code.to_string(), deed))
    .collect();
    let mut table_keywords = Vec::new();
    if let Some(file) = overrides {
        entries.extend(file.entries);
        table_keywords = file.keywords;
    }

    let rule = KeywordRule::new;
    let keywords = vec![
        rule(&["SPECIAL", "WARRANTY"], DeedType::SpecialWarranty),
        rule(&["WARRANTY"], DeedType::Warranty),
        rule(&["QUIT"], DeedType::Quitclaim),
        rule(&["PERSONAL", "REP"], DeedType::PersonalRepresentative),
        rule(&["TRUSTEE"], DeedType::Trustees),
        rule(&["TAX", "DEED"], DeedType::Tax),
        rule(&["SHERIFF"], DeedType::Sheriffs),
        rule(&["CORRECT"], DeedType::Correction),
        rule(&["LADY", "BIRD"], DeedType::LadyBird),
        rule(&["ENHANCED", "LIFE"], DeedType::LadyBird),
        rule(&["LIFE", "ESTATE"], DeedType::LifeEstate),
        rule(&["LIEU"], DeedType::InLieuOfForeclosure),
        rule(&["TRANSFER", "DEATH"], DeedType::TransferOnDeath),
        rule(&["GRANT"], DeedType::Grant),
        rule(&["BARGAIN"], DeedType::BargainAndSale),
        rule(&["GIFT"], DeedType::Gift),
        rule(&["GUARDIAN"], DeedType::Guardians),
        rule(&["ADMINISTRAT"], DeedType::Administrators),
        rule(&["CONTRACT", "DEED"], DeedType::ContractForDeed),
        rule(&["AGREEMENT", "DEED"], DeedType::ContractForDeed),
    ];
    let mut strategies = vec![
        Strategy::Exact,
        Strategy::Normalized,
        Strategy::TableKeywords,
        Strategy::Keywords(keywords),
    ];
    if !strict {
        strategies.push(Strategy::Fallback(DeedType::Miscellaneous));
    }
    CodeMapper::new(CodeTable::new(entries).with_keywords(table_keywords), strategies)
}

pub fn build_deed(
    row: &RawSaleRow,
    mapper: &CodeMapper<DeedType>,
) -> Result<Option<Deed>, PipelineError> {
    const PATH: &str = "deed.deed_type";
    let instrument = clean_text(row.instrument.as_deref());
    let has_recording = clean_text(row.book.as_deref()).is_some()
        || clean_text(row.document_url.as_deref()).is_some();
    let deed_type = match instrument.as_deref() {
        Some(label) => {
            let resolved = mapper
                .resolve(label)
                .ok_or_else(|| PipelineError::unknown_enum(label, PATH))?;
            if resolved.strategy == "fallback" {
                warn!(instrument = label, "Unclassified deed instrument, using Miscellaneous");
            }
            resolved.value
        }
        None if has_recording => DeedType::Miscellaneous,
        None => return Ok(None),
    };
    Ok(Some(Deed { deed_type }))
}

pub fn build_file(row: &RawSaleRow, deed: &Deed) -> Option<FileRef> {
    let book = clean_text(row.book.as_deref());
    let page = clean_text(row.page.as_deref());
    let url = clean_text(row.document_url.as_deref());
    let name = match (&book, &page) {
        (Some(book), Some(page)) => Some(format!("Book {book} Page {page}")),
        (Some(book), None) => Some(format!("Book {book}")),
        _ => None,
    };
    if name.is_none() && url.is_none() {
        return None;
    }
    Some(FileRef {
        document_type: deed.deed_type.document_type(),
        file_format: None,
        name,
        original_url: url,
        ipfs_url: None,
    })
}

pub fn build_geometry(raw: &RawGeometry) -> Option<Geometry> {
    let polygon = (raw.polygon.len() >= 3).then(|| raw.polygon.clone());
    let (latitude, longitude) = match (raw.latitude, raw.longitude) {
        (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
        _ => match &polygon {
            Some(ring) => centroid(ring),
            None => (None, None),
        },
    };
    if polygon.is_none() && latitude.is_none() {
        return None;
    }
    Some(Geometry {
        polygon,
        latitude,
        longitude,
    })
}

fn centroid(ring: &[[f64; 2]]) -> (Option<f64>, Option<f64>) {
    let points = match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    };
    if points.is_empty() {
        return (None, None);
    }
    let n = points.len() as f64;
    let lon = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let lat = points.iter().map(|p| p[1]).sum::<f64>() / n;
    (Some(lat), Some(lon))
}

pub fn classify(
    raw: &RawParcel,
    mapper: &CodeMapper<Classification>,
) -> Result<Classification, PipelineError> {
    const PATH: &str = "property.property_type";
    let code = clean_text(raw.use_code.as_deref()).ok_or_else(|| PipelineError::missing(PATH))?;
    mapper.map(&code, PATH)
}
