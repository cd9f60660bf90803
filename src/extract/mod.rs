//! Product extraction
//!
//! The pipeline only knows the `ExtractionAdapter` trait: a pure function from
//! a fetched product document to a `FieldMap`. Site-specific markup rules live
//! in adapter implementations such as `StorefrontAdapter`.

mod storefront;

pub use storefront::{slugify, StorefrontAdapter};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that make a document unusable as a product record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("document is not a product page")]
    NotAProductPage,

    #[error("required field missing: {0}")]
    MissingField(Field),

    #[error("invalid selector {selector}: {message}")]
    Selector { selector: String, message: String },
}

/// Turns a fetched product document into a field map
///
/// Absent optional fields are reported as `None`, never as an error. An
/// error means the whole document yields no record. Supplier and Supplier-URL
/// do not come from markup and are left for the caller to fill in.
pub trait ExtractionAdapter: Send + Sync {
    /// Extracts the product fields found in an HTML document
    fn extract(&self, document: &str) -> Result<FieldMap, ExtractionError>;
}

/// The fixed set of product columns, in dataset order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Name,
    Breadcrumb,
    Variant,
    SupplierSku,
    Gtin,
    ManufacturerSku,
    Description,
    Supplier,
    SupplierUrl,
    ImageUrl,
    Manufacturer,
    Benefits,
}

impl Field {
    /// Every field, in column order
    pub const ALL: [Field; 12] = [
        Field::Name,
        Field::Breadcrumb,
        Field::Variant,
        Field::SupplierSku,
        Field::Gtin,
        Field::ManufacturerSku,
        Field::Description,
        Field::Supplier,
        Field::SupplierUrl,
        Field::ImageUrl,
        Field::Manufacturer,
        Field::Benefits,
    ];

    /// Column header used in the dataset and in the accumulator journal
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Name => "Product Name",
            Self::Breadcrumb => "Original Data Column 1 (Breadcrumb)",
            Self::Variant => "Original Data Column 2 (Ausführung)",
            Self::SupplierSku => "Supplier Article Number",
            Self::Gtin => "EAN/GTIN",
            Self::ManufacturerSku => "Article Number",
            Self::Description => "Product Description",
            Self::Supplier => "Supplier",
            Self::SupplierUrl => "Supplier-URL",
            Self::ImageUrl => "Product Image URL",
            Self::Manufacturer => "Manufacturer",
            Self::Benefits => "Original Data Column 3 (Add. Description)",
        }
    }

    /// Dataset header row
    pub fn header() -> Vec<&'static str> {
        Self::ALL.iter().map(Field::column_name).collect()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Extracted product attributes
///
/// Serialized with the column names as keys and explicit nulls, so journal
/// lines read like the dataset rows they become. Keys missing from a
/// hand-edited journal load as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    #[serde(rename = "Product Name")]
    pub name: Option<String>,
    #[serde(rename = "Original Data Column 1 (Breadcrumb)")]
    pub breadcrumb: Option<String>,
    #[serde(rename = "Original Data Column 2 (Ausführung)")]
    pub variant: Option<String>,
    #[serde(rename = "Supplier Article Number")]
    pub supplier_sku: Option<String>,
    #[serde(rename = "EAN/GTIN")]
    pub gtin: Option<String>,
    #[serde(rename = "Article Number")]
    pub manufacturer_sku: Option<String>,
    #[serde(rename = "Product Description")]
    pub description: Option<String>,
    #[serde(rename = "Supplier")]
    pub supplier: Option<String>,
    #[serde(rename = "Supplier-URL")]
    pub supplier_url: Option<String>,
    #[serde(rename = "Product Image URL")]
    pub image_url: Option<String>,
    #[serde(rename = "Manufacturer")]
    pub manufacturer: Option<String>,
    #[serde(rename = "Original Data Column 3 (Add. Description)")]
    pub benefits: Option<String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the value of a field
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Sets the value of a field; empty or whitespace-only values become `None`
    pub fn set(&mut self, field: Field, value: Option<String>) {
        *self.slot_mut(field) = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }

    /// Builder-style `set`
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, Some(value.into()));
        self
    }

    /// Number of fields holding a value
    pub fn present_count(&self) -> usize {
        Field::ALL.iter().filter(|f| self.get(**f).is_some()).count()
    }

    /// Field values in column order, absent fields as empty strings
    pub fn to_row(&self) -> Vec<&str> {
        Field::ALL
            .iter()
            .map(|f| self.get(*f).unwrap_or(""))
            .collect()
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Name => &self.name,
            Field::Breadcrumb => &self.breadcrumb,
            Field::Variant => &self.variant,
            Field::SupplierSku => &self.supplier_sku,
            Field::Gtin => &self.gtin,
            Field::ManufacturerSku => &self.manufacturer_sku,
            Field::Description => &self.description,
            Field::Supplier => &self.supplier,
            Field::SupplierUrl => &self.supplier_url,
            Field::ImageUrl => &self.image_url,
            Field::Manufacturer => &self.manufacturer,
            Field::Benefits => &self.benefits,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Name => &mut self.name,
            Field::Breadcrumb => &mut self.breadcrumb,
            Field::Variant => &mut self.variant,
            Field::SupplierSku => &mut self.supplier_sku,
            Field::Gtin => &mut self.gtin,
            Field::ManufacturerSku => &mut self.manufacturer_sku,
            Field::Description => &mut self.description,
            Field::Supplier => &mut self.supplier,
            Field::SupplierUrl => &mut self.supplier_url,
            Field::ImageUrl => &mut self.image_url,
            Field::Manufacturer => &mut self.manufacturer,
            Field::Benefits => &mut self.benefits,
        }
    }
}
