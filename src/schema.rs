use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    SingleFamily,
    Duplex,
    #[serde(rename = "3Units")]
    ThreeUnits,
    #[serde(rename = "4Units")]
    FourUnits,
    MultiFamilyLessThan10,
    MultiFamilyMoreThan10,
    Townhouse,
    Condominium,
    DetachedCondominium,
    Cooperative,
    ManufacturedHousing,
    ManufacturedHousingSingleWide,
    ManufacturedHousingMultiWide,
    MobileHome,
    Modular,
    Retirement,
    Timeshare,
    Apartment,
    VacantLand,
    MiscellaneousResidential,
    NonWarrantableCondo,
    Pud,
}

impl PropertyType {
    pub fn units_type(self) -> Option<UnitsType> {
        match self {
            Self::SingleFamily
            | Self::Townhouse
            | Self::Condominium
            | Self::DetachedCondominium
            | Self::Cooperative
            | Self::ManufacturedHousing
            | Self::ManufacturedHousingSingleWide
            | Self::ManufacturedHousingMultiWide
            | Self::MobileHome
            | Self::Modular
            | Self::Timeshare
            | Self::NonWarrantableCondo
            | Self::Pud => Some(UnitsType::One),
            Self::Duplex => Some(UnitsType::Two),
            Self::ThreeUnits => Some(UnitsType::Three),
            Self::FourUnits => Some(UnitsType::Four),
            Self::MultiFamilyLessThan10 | Self::MultiFamilyMoreThan10 => {
                Some(UnitsType::OneToFour)
            }
            Self::Apartment
            | Self::Retirement
            | Self::VacantLand
            | Self::MiscellaneousResidential => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitsType {
    One,
    Two,
    Three,
    Four,
    OneToFour,
    TwoToFour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyUsageType {
    Residential,
    Commercial,
    Industrial,
    Agricultural,
    Governmental,
    Institutional,
    Recreational,
    Conservation,
    TransportationTerminal,
    Utility,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStatus {
    VacantLand,
    Improved,
    UnderConstruction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureForm {
    SingleFamilyDetached,
    SingleFamilySemiDetached,
    TownhouseRowhouse,
    Duplex,
    Triplex,
    Quadplex,
    MultiFamilyLessThan10,
    MultiFamily5Plus,
    ApartmentUnit,
    Loft,
    MobileHome,
    ManufacturedHomeOnLand,
    ManufacturedHomeInPark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipEstateType {
    FeeSimple,
    Condominium,
    Cooperative,
    Leasehold,
    Timeshare,
    RightOfWay,
    OtherEstate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Classification {
    pub property_type: PropertyType,
    pub property_usage_type: PropertyUsageType,
    pub build_status: BuildStatus,
    // present-but-null is allowed for land-only codes; omission is not
    #[serde(deserialize_with = "Option::deserialize")]
    pub structure_form: Option<StructureForm>,
    pub ownership_estate_type: OwnershipEstateType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeedType {
    #[serde(rename = "Warranty Deed")]
    Warranty,
    #[serde(rename = "Special Warranty Deed")]
    SpecialWarranty,
    #[serde(rename = "Quitclaim Deed")]
    Quitclaim,
    #[serde(rename = "Grant Deed")]
    Grant,
    #[serde(rename = "Bargain and Sale Deed")]
    BargainAndSale,
    #[serde(rename = "Lady Bird Deed")]
    LadyBird,
    #[serde(rename = "Transfer on Death Deed")]
    TransferOnDeath,
    #[serde(rename = "Sheriff's Deed")]
    Sheriffs,
    #[serde(rename = "Tax Deed")]
    Tax,
    #[serde(rename = "Trustee's Deed")]
    Trustees,
    #[serde(rename = "Personal Representative Deed")]
    PersonalRepresentative,
    #[serde(rename = "Correction Deed")]
    Correction,
    #[serde(rename = "Deed in Lieu of Foreclosure")]
    InLieuOfForeclosure,
    #[serde(rename = "Life Estate Deed")]
    LifeEstate,
    #[serde(rename = "Gift Deed")]
    Gift,
    #[serde(rename = "Guardian's Deed")]
    Guardians,
    #[serde(rename = "Administrator's Deed")]
    Administrators,
    #[serde(rename = "Contract for Deed")]
    ContractForDeed,
    #[serde(rename = "Miscellaneous")]
    Miscellaneous,
}

impl DeedType {
    pub fn document_type(self) -> DocumentType {
        match self {
            Self::Warranty => DocumentType::ConveyanceDeedWarrantyDeed,
            Self::Quitclaim => DocumentType::ConveyanceDeedQuitClaimDeed,
            _ => DocumentType::ConveyanceDeed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    ConveyanceDeed,
    ConveyanceDeedWarrantyDeed,
    ConveyanceDeedQuitClaimDeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotType {
    GreaterThanOneQuarterAcre,
    LessThanOrEqualToOneQuarterAcre,
}

impl LotType {
    pub fn from_acres(acres: f64) -> Self {
        if acres > 0.25 {
            Self::GreaterThanOneQuarterAcre
        } else {
            Self::LessThanOrEqualToOneQuarterAcre
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classification_requires_every_field() {
        let missing_form = json!({
            "property_type": "VacantLand",
            "property_usage_type": "Residential",
            "build_status": "VacantLand",
            "ownership_estate_type": "FeeSimple"
        });
        assert!(serde_json::from_value::<Classification>(missing_form).is_err());

        let null_form = json!({
            "property_type": "VacantLand",
            "property_usage_type": "Residential",
            "build_status": "VacantLand",
            "structure_form": null,
            "ownership_estate_type": "FeeSimple"
        });
        let parsed: Classification = serde_json::from_value(null_form).expect("classification");
        assert_eq!(parsed.structure_form, None);
    }

    #[test]
    fn classification_rejects_values_outside_vocabulary() {
        let bad = json!({
            "property_type": "Castle",
            "property_usage_type": "Residential",
            "build_status": "Improved",
            "structure_form": null,
            "ownership_estate_type": "FeeSimple"
        });
        assert!(serde_json::from_value::<Classification>(bad).is_err());
    }

    #[test]
    fn units_type_buckets() {
        assert_eq!(PropertyType::SingleFamily.units_type(), Some(UnitsType::One));
        assert_eq!(
            PropertyType::MultiFamilyMoreThan10.units_type(),
            Some(UnitsType::OneToFour)
        );
        assert_eq!(PropertyType::VacantLand.units_type(), None);
        assert_eq!(
            serde_json::to_value(PropertyType::ThreeUnits).expect("serialize"),
            json!("3Units")
        );
    }

    #[test]
    fn lot_type_boundary_is_inclusive_below() {
        assert_eq!(LotType::from_acres(0.25), LotType::LessThanOrEqualToOneQuarterAcre);
        assert_eq!(LotType::from_acres(0.2501), LotType::GreaterThanOneQuarterAcre);
    }

    #[test]
    fn deed_document_types() {
        assert_eq!(
            DeedType::Quitclaim.document_type(),
            DocumentType::ConveyanceDeedQuitClaimDeed
        );
        assert_eq!(DeedType::Tax.document_type(), DocumentType::ConveyanceDeed);
        assert_eq!(
            serde_json::to_value(DeedType::SpecialWarranty).expect("serialize"),
            json!("Special Warranty Deed")
        );
    }
}
