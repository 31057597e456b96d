use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::address::build_site_address;
use crate::artifact_store;
use crate::builders::{
    build_deed, build_file, build_geometry, build_lot, build_property, build_structure,
    build_taxes, classify, deed_mapper, ordered_sales, StructureVocabulary,
};
use crate::code_mapper::{CodeMapper, CodeTable, CodeTableFile};
use crate::entities::{MailingAddress, Provenance};
use crate::error::PipelineError;
use crate::graph::{DocumentGraph, EntityKind, EntityRef};
use crate::layout::build_layouts;
use crate::models::{parcel_identifier, ParcelInput};
use crate::normalize::clean_text;
use crate::owners::{resolve_owners, Owner};
use crate::schema::{Classification, DeedType};

#[derive(Debug, Clone)]
pub struct Mappers {
    pub property: CodeMapper<Classification>,
    pub deed: CodeMapper<DeedType>,
    pub structure: StructureVocabulary,
}

impl Mappers {
    pub fn new(
        use_codes: CodeTableFile<Classification>,
        deed_codes: Option<CodeTableFile<DeedType>>,
        strict_deed_types: bool,
    ) -> Self {
        let property = CodeMapper::strict(CodeTable::from_file(use_codes));
        if property.table().is_empty() {
            warn!("Use-code table is empty; every parcel will fail classification");
        } else {
            debug!(use_codes = property.table().len(), strict_deed_types, "Code mappers ready");
        }
        Self {
            property,
            deed: deed_mapper(deed_codes, strict_deed_types),
            structure: StructureVocabulary::default(),
        }
    }
}

struct ParcelContext<'a> {
    input: &'a ParcelInput,
    mappers: &'a Mappers,
    graph: DocumentGraph,
    property: EntityRef,
}

impl ParcelContext<'_> {
    fn attach<T: Serialize>(&mut self, kind: EntityKind, entity: &T) -> Result<EntityRef, PipelineError> {
        let entity_ref = self.graph.add(kind, entity)?;
        self.graph.relate(&self.property, &entity_ref)?;
        Ok(entity_ref)
    }

    fn add_site(&mut self) -> Result<(), PipelineError> {
        let input = self.input;
        let raw = &input.raw;
        let mappers = self.mappers;
        if let Some(address) = build_site_address(&raw.address) {
            self.attach(EntityKind::Address, &address)?;
        }
        if let Some(geometry) = raw.geometry.as_ref().and_then(build_geometry) {
            self.attach(EntityKind::Geometry, &geometry)?;
        }
        if let Some(lot) = build_lot(&raw.lot) {
            self.attach(EntityKind::Lot, &lot)?;
        }
        if let Some(structure) = build_structure(&raw.structure, &mappers.structure) {
            self.attach(EntityKind::Structure, &structure)?;
        }
        Ok(())
    }

    fn add_utility_and_layouts(&mut self) -> Result<(), PipelineError> {
        let input = self.input;
        let utility = match &input.utility {
            Some(utility) => Some(self.attach(EntityKind::Utility, utility)?),
            None => None,
        };

        let Some(feed) = &input.layouts else {
            return Ok(());
        };
        let plan = build_layouts(feed);
        let refs = plan
            .layouts
            .iter()
            .map(|layout| self.graph.add(EntityKind::Layout, layout))
            .collect::<Result<Vec<_>, _>>()?;

        for root in plan.roots() {
            self.graph.relate(&self.property, &refs[root])?;
        }
        for (parent, child) in plan.edges() {
            self.graph.relate(&refs[parent], &refs[child])?;
        }
        if let Some(utility) = &utility {
            for (index, layout) in refs.iter().enumerate() {
                if plan.is_building(index) {
                    self.graph.relate(layout, utility)?;
                }
            }
        }
        Ok(())
    }

    fn add_taxes(&mut self) -> Result<(), PipelineError> {
        let input = self.input;
        for tax in build_taxes(&input.raw.taxes) {
            self.attach(EntityKind::Tax, &tax)?;
        }
        Ok(())
    }

    fn add_sales_and_owners(&mut self) -> Result<(), PipelineError> {
        let input = self.input;
        let mappers = self.mappers;
        let sales = ordered_sales(&input.raw.sales);
        let mut sale_refs = Vec::with_capacity(sales.len());
        for (sale, row) in &sales {
            let sale_ref = self.attach(EntityKind::Sales, sale)?;
            if let Some(deed) = build_deed(row, &mappers.deed)? {
                let deed_ref = self.graph.add(EntityKind::Deed, &deed)?;
                self.graph.relate(&sale_ref, &deed_ref)?;
                if let Some(file) = build_file(row, &deed) {
                    let file_ref = self.graph.add(EntityKind::File, &file)?;
                    self.graph.relate(&deed_ref, &file_ref)?;
                }
            }
            sale_refs.push(sale_ref);
        }

        let Some(history) = &input.owners else {
            return Ok(());
        };
        let sale_dates: Vec<_> = sales
            .iter()
            .map(|(sale, _)| sale.ownership_transfer_date)
            .collect();
        let resolution = resolve_owners(history, &sale_dates);

        let owner_refs = resolution
            .owners
            .iter()
            .map(|owner| match owner {
                Owner::Person(person) => self.graph.add(EntityKind::Person, person),
                Owner::Company(company) => self.graph.add(EntityKind::Company, company),
            })
            .collect::<Result<Vec<_>, _>>()?;
        for &(sale, owner) in &resolution.sale_links {
            self.graph.relate(&sale_refs[sale], &owner_refs[owner])?;
        }

        // only written alongside current owners
        let mailing = clean_text(input.raw.mailing_address.as_deref())
            .filter(|_| !resolution.current.is_empty());
        if let Some(text) = mailing {
            let mailing_ref = self.graph.add(
                EntityKind::MailingAddress,
                &MailingAddress {
                    unnormalized_address: text,
                    latitude: None,
                    longitude: None,
                },
            )?;
            for &owner in &resolution.current {
                self.graph.relate(&owner_refs[owner], &mailing_ref)?;
            }
        }
        Ok(())
    }
}

pub fn build_parcel_graph(input: &ParcelInput, mappers: &Mappers) -> Result<DocumentGraph, PipelineError> {
    let parcel_id = parcel_identifier(&input.seed, &input.raw)
        .ok_or_else(|| PipelineError::missing("property.parcel_identifier"))?;
    let classification = classify(&input.raw, &mappers.property)?;

    let mut graph = DocumentGraph::new(Provenance {
        source_http_request: input.seed.source_http_request.clone(),
        request_identifier: input.seed.request_identifier.clone(),
    });
    let property = build_property(&input.raw, parcel_id, classification);
    let property_ref = graph.add(EntityKind::Property, &property)?;

    let mut ctx = ParcelContext {
        input,
        mappers,
        graph,
        property: property_ref,
    };
    ctx.add_site()?;
    ctx.add_utility_and_layouts()?;
    ctx.add_taxes()?;
    ctx.add_sales_and_owners()?;

    info!(
        parcel_id = %property.parcel_identifier,
        property_type = ?property.property_type,
        sales = ctx.graph.entity_count(EntityKind::Sales),
        documents = ctx.graph.documents().len(),
        relationships = ctx.graph.relationship_count(),
        "Parcel graph built"
    );
    Ok(ctx.graph)
}

pub fn write_parcel_graph(input: &ParcelInput, mappers: &Mappers, output_dir: &Path) -> Result<usize> {
    let graph = build_parcel_graph(input, mappers)?;
    let documents = graph.documents();
    artifact_store::write_graph(output_dir, documents)?;
    info!(output_dir = %output_dir.display(), documents = documents.len(), "Documents written");
    Ok(documents.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Utility;
    use crate::models::{
        LayoutFeed, OwnerHistory, PropertySeed, RawLayout, RawParcel, RawSaleRow,
        SourceHttpRequest,
    };
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn mappers() -> Mappers {
        let use_codes: CodeTableFile<Classification> = serde_json::from_value(json!({
            "entries": {
                "0100": {
                    "property_type": "SingleFamily",
                    "property_usage_type": "Residential",
                    "build_status": "Improved",
                    "structure_form": "SingleFamilyDetached",
                    "ownership_estate_type": "FeeSimple"
                }
            }
        }))
        .expect("use codes");
        Mappers::new(use_codes, None, false)
    }

    fn sale(date: &str, price: &str, instrument: Option<&str>) -> RawSaleRow {
        RawSaleRow {
            date: Some(date.to_string()),
            price: Some(price.to_string()),
            instrument: instrument.map(str::to_string),
            ..RawSaleRow::default()
        }
    }

    fn scenario() -> ParcelInput {
        let owners: OwnerHistory = serde_json::from_value(json!({
            "owners_by_date": {
                "current": [{"type": "person", "first_name": "jane", "last_name": "doe"}]
            }
        }))
        .expect("owners");
        ParcelInput {
            seed: PropertySeed {
                parcel_id: Some("12345".to_string()),
                request_identifier: "12345".to_string(),
                source_http_request: SourceHttpRequest {
                    method: "GET".to_string(),
                    url: "https://example.org/parcel?id=12345".to_string(),
                },
            },
            raw: RawParcel {
                use_code: Some("0100 SINGLE FAMILY".to_string()),
                sales: vec![
                    sale("01/15/2020", "$100,000", None),
                    sale("03/02/2022", "$250,000", None),
                ],
                ..RawParcel::default()
            },
            owners: Some(owners),
            utility: None,
            layouts: None,
        }
    }

    fn read_dir(dir: &Path) -> BTreeMap<String, String> {
        fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| {
                let path = entry.expect("entry").path();
                let name = path
                    .file_name()
                    .expect("file name")
                    .to_string_lossy()
                    .into_owned();
                (name, fs::read_to_string(&path).expect("read file"))
            })
            .collect()
    }

    fn json_of(files: &BTreeMap<String, String>, name: &str) -> Value {
        serde_json::from_str(files.get(name).unwrap_or_else(|| panic!("{name} missing")))
            .expect("document json")
    }

    #[test]
    fn two_sales_and_a_current_owner() {
        let tmp = TempDir::new().expect("tempdir");
        let out = tmp.path().join("data");
        write_parcel_graph(&scenario(), &mappers(), &out).expect("pipeline");
        let files = read_dir(&out);

        assert_eq!(json_of(&files, "sales_1.json")["purchase_price_amount"], json!(250000));
        assert_eq!(json_of(&files, "sales_2.json")["purchase_price_amount"], json!(100000));
        assert_eq!(
            json_of(&files, "sales_1.json")["ownership_transfer_date"],
            "2022-03-02"
        );
        assert_eq!(json_of(&files, "person_1.json")["first_name"], "Jane");
        assert_eq!(json_of(&files, "person_1.json")["last_name"], "Doe");

        let sales_person: Vec<&String> = files
            .keys()
            .filter(|name| name.starts_with("relationship_sales_person"))
            .collect();
        assert_eq!(sales_person.len(), 1);
        assert_eq!(
            json_of(&files, sales_person[0]),
            json!({"from": {"/": "./sales_1.json"}, "to": {"/": "./person_1.json"}})
        );

        let property = json_of(&files, "property.json");
        assert_eq!(property["parcel_identifier"], "12345");
        assert_eq!(property["property_type"], "SingleFamily");
        assert_eq!(property["number_of_units_type"], "One");
        assert!(property["zoning"].is_null());
        assert_eq!(property["request_identifier"], "12345");
        assert_eq!(property["source_http_request"]["method"], "GET");
    }

    #[test]
    fn rerun_is_byte_identical_and_clears_stale_files() {
        let tmp = TempDir::new().expect("tempdir");
        let out = tmp.path().join("data");
        fs::create_dir_all(&out).expect("mkdir");
        fs::write(out.join("relationship_sales_person_9.json"), "{}").expect("stale");

        write_parcel_graph(&scenario(), &mappers(), &out).expect("first run");
        let first = read_dir(&out);
        write_parcel_graph(&scenario(), &mappers(), &out).expect("second run");
        let second = read_dir(&out);

        assert_eq!(first, second);
        assert!(!first.contains_key("relationship_sales_person_9.json"));
        assert!(first.values().all(|contents| contents.ends_with('\n')));
    }

    #[test]
    fn every_relationship_points_at_a_written_document() {
        let mut input = scenario();
        input.raw.mailing_address = Some("PO BOX 12, GAINESVILLE FL 32601".to_string());
        input.raw.address.full = Some("123 N MAIN ST, GAINESVILLE, FL 32601".to_string());
        input.raw.lot.acreage = Some("0.3".to_string());
        input.raw.sales[0].instrument = Some("WARRANTY DEED".to_string());
        input.raw.sales[0].book = Some("1234".to_string());
        input.raw.sales[0].page = Some("56".to_string());
        input.utility = Some(Utility::from_feed(json!({"cooling_system_type": "CentralAir"})));
        input.layouts = Some(LayoutFeed {
            layouts: vec![
                RawLayout {
                    space_type: Some("Building".to_string()),
                    building_number: Some("1".to_string()),
                    ..RawLayout::default()
                },
                RawLayout {
                    space_type: Some("Bedroom".to_string()),
                    building_number: Some("1".to_string()),
                    ..RawLayout::default()
                },
            ],
        });

        let tmp = TempDir::new().expect("tempdir");
        let out = tmp.path().join("data");
        write_parcel_graph(&input, &mappers(), &out).expect("pipeline");
        let files = read_dir(&out);

        let relationships: Vec<&String> = files
            .keys()
            .filter(|name| name.starts_with("relationship_"))
            .collect();
        for name in &relationships {
            let edge = json_of(&files, name);
            for end in ["from", "to"] {
                let target = edge[end]["/"].as_str().expect("link");
                let target = target.strip_prefix("./").expect("relative link");
                assert!(files.contains_key(target), "{name} points at missing {target}");
            }
        }

        for expected in [
            "relationship_property_address_1.json",
            "relationship_property_lot_1.json",
            "relationship_property_utility_1.json",
            "relationship_property_layout_1.json",
            "relationship_layout_layout_1.json",
            "relationship_layout_utility_1.json",
            "relationship_sales_deed_1.json",
            "relationship_deed_file_1.json",
            "relationship_person_mailing_address_1.json",
        ] {
            assert!(files.contains_key(expected), "{expected} missing");
        }
        assert!(!files.contains_key("relationship_property_layout_2.json"));
        assert_eq!(json_of(&files, "deed_1.json")["deed_type"], "Warranty Deed");
        assert_eq!(
            json_of(&files, "file_1.json")["document_type"],
            "ConveyanceDeedWarrantyDeed"
        );
        assert_eq!(json_of(&files, "layout_2.json")["space_index"], 1);
        assert!(json_of(&files, "utility.json")["sewer_type"].is_null());
        assert!(files.contains_key("mailing_address.json"));
        assert!(files.values().all(|contents| !contents.contains("\"/\": \"./\"")));
    }

    #[test]
    fn unknown_use_code_fails_before_anything_is_written() {
        let mut input = scenario();
        input.raw.use_code = Some("9999 CASTLE".to_string());

        let err = build_parcel_graph(&input, &mappers()).expect_err("unmapped code");
        assert_eq!(err.path(), Some("property.property_type"));
        assert_eq!(err.diagnostic()["type"], "error");

        let tmp = TempDir::new().expect("tempdir");
        let out = tmp.path().join("data");
        let err = write_parcel_graph(&input, &mappers(), &out).expect_err("unmapped code");
        assert_eq!(
            crate::error::diagnostic_for(&err)["path"],
            "property.property_type"
        );
        assert!(!out.join("property.json").exists());
    }

    #[test]
    fn mailing_address_needs_current_owners() {
        let mut input = scenario();
        input.owners = None;
        input.raw.mailing_address = Some("PO BOX 12".to_string());
        let graph = build_parcel_graph(&input, &mappers()).expect("graph");
        assert_eq!(graph.entity_count(EntityKind::MailingAddress), 0);
        assert_eq!(graph.entity_count(EntityKind::Person), 0);
        assert_eq!(graph.entity_count(EntityKind::Sales), 2);
    }
}
