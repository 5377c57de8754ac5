use serde::{Deserialize, Serialize};

use crate::types::{InventoryMovement, ProductSummary, ProductView, Tag};

// Request fields are all optional at the serde layer; the handlers validate
// presence themselves so that missing or out-of-range input produces the
// standard 400 envelope instead of an extractor rejection.

#[derive(Debug, Default, Deserialize)]
pub struct CreateProductRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub initial_stock: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockAdjustmentRequest {
    #[serde(rename = "type", default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Listing filters as they arrive on the query string. `min_stock` stays a
/// string here: non-numeric values are treated as an absent filter rather
/// than an error.
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsParams {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub min_stock: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StockAdjustmentResponse {
    pub product: ProductView,
    pub inventory_record: InventoryMovement,
    pub previous_stock: i64,
    pub new_stock: i64,
}

#[derive(Debug, Serialize)]
pub struct TagWithProducts {
    #[serde(flatten)]
    pub tag: Tag,
    pub products: Vec<ProductSummary>,
}
