use crate::catalog::{Catalog, DocumentFile};
use serde::Serialize;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

const TECH_SPEC_KEYWORDS: &[&str] = &["technical", "specifications"];
const INSTALLATION_KEYWORDS: &[&str] = &["installation"];
const CERTIFICATION_KEYWORDS: &[&str] = &["certification", "conformity"];

/// Product category tag attached to a product page. Unrecognized tags are
/// kept verbatim and resolved with the default rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductCategory {
    ChargingCables,
    ChargingStations,
    DcChargingStation,
    DcFastChargingStation,
    PortableEvCharging,
    Other(String),
}

impl ProductCategory {
    pub fn label(&self) -> &str {
        match self {
            ProductCategory::ChargingCables => "chargingCables",
            ProductCategory::ChargingStations => "chargingStations",
            ProductCategory::DcChargingStation => "dcChargingStation",
            ProductCategory::DcFastChargingStation => "dcFastChargingStation",
            ProductCategory::PortableEvCharging => "portableEVCharging",
            ProductCategory::Other(tag) => tag,
        }
    }

    /// Label used in output filenames, falling back to "Product" for a
    /// missing tag.
    pub fn label_or_default(&self) -> &str {
        let label = self.label();
        if label.is_empty() {
            "Product"
        } else {
            label
        }
    }

    fn is_dc(&self) -> bool {
        matches!(
            self,
            ProductCategory::DcChargingStation | ProductCategory::DcFastChargingStation
        )
    }
}

impl From<&str> for ProductCategory {
    fn from(tag: &str) -> Self {
        match tag {
            "chargingCables" => ProductCategory::ChargingCables,
            "chargingStations" => ProductCategory::ChargingStations,
            "dcChargingStation" => ProductCategory::DcChargingStation,
            "dcFastChargingStation" => ProductCategory::DcFastChargingStation,
            "portableEVCharging" => ProductCategory::PortableEvCharging,
            other => ProductCategory::Other(other.to_string()),
        }
    }
}

impl FromStr for ProductCategory {
    type Err = Infallible;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Ok(ProductCategory::from(tag))
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label_or_default())
    }
}

/// The two downloadable bundles offered per product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSet {
    DataSheets,
    Conformity,
}

impl DocumentSet {
    pub const ALL: [DocumentSet; 2] = [DocumentSet::DataSheets, DocumentSet::Conformity];

    pub fn output_name(&self, category: &ProductCategory) -> String {
        match self {
            DocumentSet::DataSheets => format!("{}_Data_Sheets", category.label_or_default()),
            DocumentSet::Conformity => {
                format!("{}_Conformity_Documents", category.label_or_default())
            }
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DocumentSet::DataSheets => "data sheets",
            DocumentSet::Conformity => "conformity documents",
        }
    }
}

/// Files selected from a catalog for one product category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedDocuments {
    pub data_sheets: Vec<DocumentFile>,
    pub conformity: Vec<DocumentFile>,
}

impl ResolvedDocuments {
    pub fn is_empty(&self) -> bool {
        self.data_sheets.is_empty() && self.conformity.is_empty()
    }

    pub fn files_for(&self, set: DocumentSet) -> &[DocumentFile] {
        match set {
            DocumentSet::DataSheets => &self.data_sheets,
            DocumentSet::Conformity => &self.conformity,
        }
    }
}

/// Selects the document lists for a product category. DC station categories
/// additionally pull installation documents into the data sheet bundle,
/// always after the technical specifications.
pub fn resolve(category: &ProductCategory, catalog: &Catalog) -> ResolvedDocuments {
    let mut data_sheets = files_for_role(catalog, TECH_SPEC_KEYWORDS);
    if category.is_dc() {
        data_sheets.extend(files_for_role(catalog, INSTALLATION_KEYWORDS));
    }

    ResolvedDocuments {
        data_sheets,
        conformity: files_for_role(catalog, CERTIFICATION_KEYWORDS),
    }
}

// First category whose name contains one of the keywords, compared
// case-insensitively.
fn files_for_role(catalog: &Catalog, keywords: &[&str]) -> Vec<DocumentFile> {
    catalog
        .categories
        .iter()
        .find(|category| {
            let name = category.name.to_lowercase();
            keywords.iter().any(|keyword| name.contains(keyword))
        })
        .map(|category| category.files.clone())
        .unwrap_or_default()
}
