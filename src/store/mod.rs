mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Input for product creation. Tag names are reconciled against existing
/// tags inside the creation transaction; missing ones are created.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub initial_stock: i64,
    pub tags: Vec<String>,
}

/// Field-level product patch. `None` leaves the field untouched. Stock and
/// tags are deliberately absent: stock moves only through `adjust_stock`,
/// tag sets only grow through product creation.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TagPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Conjunctive product listing filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive tag name; restricts to products carrying the tag.
    pub tag: Option<String>,
    pub min_stock: Option<i64>,
    /// Case-insensitive substring match on the product name.
    pub name: Option<String>,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Product operations
    fn create_product(&self, new: &NewProduct) -> Result<i64>;
    fn get_product(&self, id: i64) -> Result<Option<ProductView>>;
    fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductView>>;
    fn update_product(&self, id: i64, patch: &ProductPatch) -> Result<()>;
    fn delete_product(&self, id: i64) -> Result<bool>;

    // Ledger operations
    fn adjust_stock(
        &self,
        product_id: i64,
        direction: MovementDirection,
        quantity: i64,
        reason: Option<&str>,
    ) -> Result<StockAdjustment>;
    fn list_product_movements(&self, product_id: i64) -> Result<Vec<InventoryMovement>>;

    // Tag operations
    fn create_tag(&self, name: &str, description: Option<&str>) -> Result<Tag>;
    fn get_tag(&self, id: i64) -> Result<Option<Tag>>;
    fn list_tags(&self) -> Result<Vec<Tag>>;
    fn update_tag(&self, id: i64, patch: &TagPatch) -> Result<()>;
    fn delete_tag(&self, id: i64) -> Result<bool>;
    fn list_tag_products(&self, tag_id: i64) -> Result<Vec<ProductSummary>>;

    fn close(&self) -> Result<()>;
}
