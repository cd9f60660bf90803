//! Extraction rules for the storefront's product detail pages
//!
//! The storefront renders with hashed CSS module class names
//! (`ProductCard_paragraph__x1y2z`), so selectors match on the stable
//! prefix only.

use crate::extract::{ExtractionAdapter, ExtractionError, Field, FieldMap};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

const NAME: &str = r#"h1[data-testid="pdp-product-info-product-name"]"#;
const DESCRIPTION: &str = r#"div[class*="ProductDescription_description"]"#;
const IMAGE: &str = "img.image-gallery-image";
const BENEFITS: &str = r#"div[class*="ProductBenefits_productBenefits"]"#;
const BREADCRUMB: &str = r#"span[class*="CategoryBreadcrumbs_breadcrumb"]"#;
const PARAGRAPH: &str = r#"div[class*="ProductCard_paragraph"]"#;
const SKU: &str = r#"[data-testid="product-information-sku"]"#;
const GTIN: &str = r#"[data-testid="product-information-gtin"]"#;
const VARIANT_INFO: &str = r#"div[class*="ProductInformation_variantInfo"]"#;
const TABLE_CELL: &str = "td";

const VARIANT_LABEL: &str = "Ausführung:";
const SKU_LABEL: &str = "Artikelnummer:";
const MANUFACTURER_LABEL: &str = "Hersteller";

struct Selectors {
    name: Selector,
    description: Selector,
    image: Selector,
    benefits: Selector,
    breadcrumb: Selector,
    paragraph: Selector,
    sku: Selector,
    gtin: Selector,
    variant_info: Selector,
    table_cell: Selector,
}

impl Selectors {
    fn compile() -> Result<Self, ExtractionError> {
        Ok(Self {
            name: compile(NAME)?,
            description: compile(DESCRIPTION)?,
            image: compile(IMAGE)?,
            benefits: compile(BENEFITS)?,
            breadcrumb: compile(BREADCRUMB)?,
            paragraph: compile(PARAGRAPH)?,
            sku: compile(SKU)?,
            gtin: compile(GTIN)?,
            variant_info: compile(VARIANT_INFO)?,
            table_cell: compile(TABLE_CELL)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Extraction adapter for the storefront's product pages
pub struct StorefrontAdapter {
    selectors: Selectors,
    digits: Regex,
    manufacturer_sku: Regex,
}

impl StorefrontAdapter {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            selectors: Selectors::compile()?,
            digits: Regex::new(r"\d+").unwrap_or_else(|_| unreachable!()),
            manufacturer_sku: Regex::new(r"Herstellernummer:\s*(\d+)")
                .unwrap_or_else(|_| unreachable!()),
        })
    }

    fn first_text(&self, document: &Html, selector: &Selector) -> Option<String> {
        document.select(selector).next().map(element_text)
    }

    fn breadcrumb(&self, document: &Html) -> Option<String> {
        let parts: Vec<String> = document
            .select(&self.selectors.breadcrumb)
            .map(|el| slugify(&element_text(el)))
            .filter(|slug| !slug.is_empty())
            .collect();
        Some(parts.join("/"))
    }

    fn variant(&self, document: &Html) -> Option<String> {
        document
            .select(&self.selectors.paragraph)
            .map(element_text)
            .find(|text| text.contains(VARIANT_LABEL))
            .map(|text| text.replace(VARIANT_LABEL, ""))
    }

    fn supplier_sku(&self, document: &Html) -> Option<String> {
        self.first_text(document, &self.selectors.sku)
            .map(|text| text.replace(SKU_LABEL, ""))
    }

    fn gtin(&self, document: &Html) -> Option<String> {
        let text = self.first_text(document, &self.selectors.gtin)?;
        self.digits.find(&text).map(|m| m.as_str().to_string())
    }

    fn manufacturer_sku(&self, document: &Html) -> Option<String> {
        let text = self.first_text(document, &self.selectors.variant_info)?;
        self.manufacturer_sku
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn image_url(&self, document: &Html) -> Option<String> {
        document
            .select(&self.selectors.image)
            .next()
            .and_then(|el| el.value().attr("src"))
            .map(str::to_string)
    }

    fn manufacturer(&self, document: &Html) -> Option<String> {
        let label = document
            .select(&self.selectors.table_cell)
            .find(|cell| element_text(*cell) == MANUFACTURER_LABEL)?;

        label
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|sibling| sibling.value().name() == "td")
            .map(element_text)
    }
}

impl ExtractionAdapter for StorefrontAdapter {
    fn extract(&self, document: &str) -> Result<FieldMap, ExtractionError> {
        let document = Html::parse_document(document);

        let name = self
            .first_text(&document, &self.selectors.name)
            .ok_or(ExtractionError::NotAProductPage)?;
        if name.is_empty() {
            return Err(ExtractionError::MissingField(Field::Name));
        }

        let mut fields = FieldMap::new();
        fields.set(Field::Name, Some(name));
        fields.set(Field::Breadcrumb, self.breadcrumb(&document));
        fields.set(Field::Variant, self.variant(&document));
        fields.set(Field::SupplierSku, self.supplier_sku(&document));
        fields.set(Field::Gtin, self.gtin(&document));
        fields.set(Field::ManufacturerSku, self.manufacturer_sku(&document));
        fields.set(
            Field::Description,
            self.first_text(&document, &self.selectors.description),
        );
        fields.set(Field::ImageUrl, self.image_url(&document));
        fields.set(Field::Manufacturer, self.manufacturer(&document));
        fields.set(
            Field::Benefits,
            self.first_text(&document, &self.selectors.benefits),
        );

        Ok(fields)
    }
}

/// Concatenated text of an element with runs of whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase ASCII slug: letters and digits separated by single hyphens
///
/// Non-ASCII text is transliterated first (`ß` becomes `ss`, `Ł` becomes `l`).
///
/// # Examples
///
/// ```
/// use catalog_harvest::extract::slugify;
///
/// assert_eq!(slugify("Reinigung & Pflege"), "reinigung-pflege");
/// assert_eq!(slugify("Handtücher / Spender"), "handtucher-spender");
/// ```
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}
