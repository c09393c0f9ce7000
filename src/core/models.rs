/*
 * Defines the data model shared by every part of the application: products,
 * restock lists, their provenance tag and the raw product fields entered by a
 * user. The structures serialize with camelCase keys so the persisted blob keeps
 * the same layout the on-device storage has always used. Timestamps are kept as
 * `OffsetDateTime` in memory and written as RFC 3339 text.
 */
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

pub const DEFAULT_IMPORTED_LIST_NAME: &str = "Imported List";

/* Generates a fresh identifier for a list or product. */
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/*
 * Maps blank input to `None`. This is the single normalization step applied
 * at the boundary (manual entry, edit, import) so that downstream code never
 * has to distinguish between "absent" and "empty string".
 */
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/*
 * Provenance marker on a list. Known tags map to dedicated variants; any other
 * provenance string (e.g. "Imported from Shopify") is preserved verbatim.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ListSource {
    ManualEntry,
    ImportedFromCode,
    ImportedFromCsv,
    Other(String),
}

impl ListSource {
    pub fn as_str(&self) -> &str {
        match self {
            ListSource::ManualEntry => "Manual Entry",
            ListSource::ImportedFromCode => "Imported from Code",
            ListSource::ImportedFromCsv => "Imported from CSV",
            ListSource::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for ListSource {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Manual Entry" => ListSource::ManualEntry,
            "Imported from Code" => ListSource::ImportedFromCode,
            "Imported from CSV" => ListSource::ImportedFromCsv,
            _ => ListSource::Other(value),
        }
    }
}

impl From<ListSource> for String {
    fn from(value: ListSource) -> Self {
        match value {
            ListSource::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ListSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/*
 * A single trackable item within a list.
 * `completed_at` is set exactly when `is_completed` becomes true and cleared
 * whenever it becomes false; the list store is responsible for keeping the two
 * in step.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_out_of_stock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub completed_at: Option<OffsetDateTime>,
}

impl Product {
    /*
     * Creates a fresh product from user-entered fields: quantity 0, not
     * completed, in stock. Optional fields are normalized (blank -> absent).
     */
    pub fn new(id: String, fields: ProductFields) -> Self {
        let fields = fields.normalized();
        Product {
            id,
            name: fields.name,
            quantity: 0,
            is_completed: false,
            is_out_of_stock: false,
            image_url: fields.image_url,
            comment: fields.comment,
            category: fields.category,
            completed_at: None,
        }
    }

    pub fn category_or_empty(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }
}

/*
 * The user-editable subset of a product: everything the add/edit forms
 * provide. Quantity, completion and stock status are never part of it.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub image_url: Option<String>,
    pub comment: Option<String>,
    pub category: Option<String>,
}

impl ProductFields {
    pub fn new(name: impl Into<String>) -> Self {
        ProductFields {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn has_blank_name(&self) -> bool {
        self.name.trim().is_empty()
    }

    pub fn normalized(self) -> Self {
        ProductFields {
            name: self.name,
            image_url: normalize_optional(self.image_url),
            comment: normalize_optional(self.comment),
            category: normalize_optional(self.category),
        }
    }
}

/* A named, ordered collection of products. */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_viewed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ListSource>,
}

impl RestockList {
    pub fn new(
        id: String,
        name: String,
        description: String,
        created_at: OffsetDateTime,
        source: ListSource,
    ) -> Self {
        RestockList {
            id,
            name,
            description,
            created_at,
            last_viewed_at: None,
            products: Vec::new(),
            source: Some(source),
        }
    }

    pub fn find_product(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    pub fn completed_count(&self) -> usize {
        self.products.iter().filter(|p| p.is_completed).count()
    }

    /* A list counts as fully completed only when it is non-empty. */
    pub fn is_fully_completed(&self) -> bool {
        !self.products.is_empty() && self.completed_count() == self.products.len()
    }
}
