use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, params_from_iter};

use super::schema::SCHEMA;
use super::{NewProduct, ProductFilter, ProductPatch, Store, TagPatch};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        current_stock: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn movement_from_row(row: &Row<'_>) -> rusqlite::Result<InventoryMovement> {
    let direction: String = row.get(2)?;
    Ok(InventoryMovement {
        id: row.get(0)?,
        product_id: row.get(1)?,
        // The CHECK constraint limits the column to 'in'/'out'.
        direction: direction.parse().unwrap_or(MovementDirection::In),
        quantity: row.get(3)?,
        reason: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const PRODUCT_COLS: &str = "id, name, description, price, current_stock, created_at, updated_at";
const TAG_COLS: &str = "id, name, description, created_at, updated_at";
const MOVEMENT_COLS: &str = "id, product_id, direction, quantity, reason, created_at";

/// Syncs a product's associations with the requested tag-name set inside the
/// caller's transaction: trims and dedups the names, looks up the ones that
/// already exist (exact, case-sensitive match against stored names), creates
/// the missing ones, and inserts any association row not already present.
/// Additive only; existing associations are never removed here.
fn reconcile_tags(tx: &Transaction<'_>, product_id: i64, requested: &[String]) -> Result<()> {
    let mut names: Vec<&str> = Vec::new();
    for raw in requested {
        let name = raw.trim();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    if names.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; names.len()].join(", ");
    let mut stmt = tx.prepare(&format!(
        "SELECT id, name FROM tags WHERE name IN ({placeholders})"
    ))?;
    let existing = stmt
        .query_map(params_from_iter(names.iter()), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let now = format_datetime(&Utc::now());
    let mut tag_ids: Vec<i64> = existing.iter().map(|(id, _)| *id).collect();

    for name in &names {
        if existing.iter().any(|(_, existing_name)| existing_name == name) {
            continue;
        }
        let inserted = tx.execute(
            "INSERT INTO tags (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![name, now],
        );
        match inserted {
            Ok(_) => tag_ids.push(tx.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::Conflict(format!("A tag named '{name}' already exists")));
            }
            Err(e) => return Err(Error::from(e)),
        }
    }

    for tag_id in tag_ids {
        tx.execute(
            "INSERT OR IGNORE INTO product_tags (product_id, tag_id, created_at) VALUES (?1, ?2, ?3)",
            params![product_id, tag_id, now],
        )?;
    }

    Ok(())
}

fn product_tag_names(conn: &Connection, product_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT t.name
         FROM tags t
         JOIN product_tags pt ON t.id = pt.tag_id
         WHERE pt.product_id = ?1
         ORDER BY t.name",
    )?;

    let rows = stmt.query_map(params![product_id], |row| row.get(0))?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Product operations

    fn create_product(&self, new: &NewProduct) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = format_datetime(&Utc::now());

        tx.execute(
            "INSERT INTO products (name, description, price, current_stock, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![new.name, new.description, new.price, new.initial_stock, now],
        )?;
        let product_id = tx.last_insert_rowid();

        reconcile_tags(&tx, product_id, &new.tags)?;

        // A synthetic movement keeps the ledger consistent with the stock
        // value the product was born with.
        if new.initial_stock > 0 {
            tx.execute(
                "INSERT INTO inventory (product_id, direction, quantity, reason, created_at)
                 VALUES (?1, 'in', ?2, 'Initial stock', ?3)",
                params![product_id, new.initial_stock, now],
            )?;
        }

        tx.commit()?;
        Ok(product_id)
    }

    fn get_product(&self, id: i64) -> Result<Option<ProductView>> {
        let conn = self.conn();
        let product = conn
            .query_row(
                &format!("SELECT {PRODUCT_COLS} FROM products WHERE id = ?1"),
                params![id],
                product_from_row,
            )
            .optional()?;

        match product {
            Some(product) => {
                let tags = product_tag_names(&conn, product.id)?;
                Ok(Some(ProductView { product, tags }))
            }
            None => Ok(None),
        }
    }

    fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductView>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        // Semi-join so a product with several matching tag rows still
        // appears exactly once.
        if let Some(tag) = &filter.tag {
            clauses.push(
                "id IN (SELECT pt.product_id FROM product_tags pt
                        JOIN tags t ON pt.tag_id = t.id
                        WHERE LOWER(t.name) = LOWER(?))",
            );
            args.push(Value::from(tag.clone()));
        }
        if let Some(min_stock) = filter.min_stock {
            clauses.push("current_stock >= ?");
            args.push(Value::from(min_stock));
        }
        if let Some(name) = &filter.name {
            clauses.push("LOWER(name) LIKE '%' || LOWER(?) || '%'");
            args.push(Value::from(name.clone()));
        }

        let mut sql = format!("SELECT {PRODUCT_COLS} FROM products");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let products = stmt
            .query_map(params_from_iter(args), product_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut views: Vec<ProductView> = products
            .into_iter()
            .map(|product| ProductView {
                product,
                tags: Vec::new(),
            })
            .collect();
        if views.is_empty() {
            return Ok(views);
        }

        // One batched query for the tag names of every listed product.
        let index_by_id: HashMap<i64, usize> = views
            .iter()
            .enumerate()
            .map(|(i, v)| (v.product.id, i))
            .collect();
        let ids: Vec<Value> = views.iter().map(|v| Value::from(v.product.id)).collect();
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT pt.product_id, t.name
             FROM product_tags pt
             JOIN tags t ON pt.tag_id = t.id
             WHERE pt.product_id IN ({placeholders})
             ORDER BY t.name"
        ))?;
        let pairs = stmt.query_map(params_from_iter(ids), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for pair in pairs {
            let (product_id, tag_name) = pair?;
            if let Some(&i) = index_by_id.get(&product_id) {
                views[i].tags.push(tag_name);
            }
        }

        Ok(views)
    }

    fn update_product(&self, id: i64, patch: &ProductPatch) -> Result<()> {
        let conn = self.conn();
        let product = conn
            .query_row(
                &format!("SELECT {PRODUCT_COLS} FROM products WHERE id = ?1"),
                params![id],
                product_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        let name = patch.name.clone().unwrap_or(product.name);
        let description = patch.description.clone().or(product.description);
        let price = patch.price.unwrap_or(product.price);

        conn.execute(
            "UPDATE products SET name = ?1, description = ?2, price = ?3, updated_at = ?4
             WHERE id = ?5",
            params![name, description, price, format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn delete_product(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row("SELECT id FROM products WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Ok(false);
        }

        // The schema cascades too; the explicit order keeps the delete
        // correct on connections opened without foreign_keys enabled.
        tx.execute("DELETE FROM inventory WHERE product_id = ?1", params![id])?;
        tx.execute("DELETE FROM product_tags WHERE product_id = ?1", params![id])?;
        tx.execute("DELETE FROM products WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(true)
    }

    // Ledger operations

    fn adjust_stock(
        &self,
        product_id: i64,
        direction: MovementDirection,
        quantity: i64,
        reason: Option<&str>,
    ) -> Result<StockAdjustment> {
        if quantity <= 0 {
            return Err(Error::Validation(
                "Quantity must be a positive integer".to_string(),
            ));
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        // current_stock is read and rewritten inside the same transaction;
        // a dropped transaction (any error below) leaves both the counter
        // and the ledger untouched.
        let current: i64 = tx
            .query_row(
                "SELECT current_stock FROM products WHERE id = ?1",
                params![product_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        let new_stock = match direction {
            MovementDirection::In => current + quantity,
            MovementDirection::Out => current - quantity,
        };
        if new_stock < 0 {
            return Err(Error::InsufficientStock {
                available: current,
                requested: quantity,
            });
        }

        let now = Utc::now();
        let reason = reason.map(str::to_owned).unwrap_or_else(|| {
            match direction {
                MovementDirection::In => "Stock addition",
                MovementDirection::Out => "Stock removal",
            }
            .to_string()
        });

        tx.execute(
            "INSERT INTO inventory (product_id, direction, quantity, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                product_id,
                direction.as_str(),
                quantity,
                reason,
                format_datetime(&now)
            ],
        )?;
        let movement_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE products SET current_stock = ?1, updated_at = ?2 WHERE id = ?3",
            params![new_stock, format_datetime(&now), product_id],
        )?;

        tx.commit()?;

        Ok(StockAdjustment {
            previous_stock: current,
            new_stock,
            movement: InventoryMovement {
                id: movement_id,
                product_id,
                direction,
                quantity,
                reason: Some(reason),
                created_at: now,
            },
        })
    }

    fn list_product_movements(&self, product_id: i64) -> Result<Vec<InventoryMovement>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MOVEMENT_COLS} FROM inventory WHERE product_id = ?1 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![product_id], movement_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Tag operations

    fn create_tag(&self, name: &str, description: Option<&str>) -> Result<Tag> {
        let conn = self.conn();
        let now = Utc::now();

        let result = conn.execute(
            "INSERT INTO tags (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![name, description, format_datetime(&now)],
        );

        match result {
            Ok(_) => Ok(Tag {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
                description: description.map(str::to_owned),
                created_at: now,
                updated_at: now,
            }),
            Err(e) if is_unique_violation(&e) => Err(Error::Conflict(
                "A tag with this name already exists".to_string(),
            )),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TAG_COLS} FROM tags WHERE id = ?1"),
            params![id],
            tag_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {TAG_COLS} FROM tags ORDER BY name"))?;

        let rows = stmt.query_map([], tag_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_tag(&self, id: i64, patch: &TagPatch) -> Result<()> {
        let conn = self.conn();
        let tag = conn
            .query_row(
                &format!("SELECT {TAG_COLS} FROM tags WHERE id = ?1"),
                params![id],
                tag_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        let name = patch.name.clone().unwrap_or(tag.name);
        let description = patch.description.clone().or(tag.description);

        let result = conn.execute(
            "UPDATE tags SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![name, description, format_datetime(&Utc::now()), id],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::Conflict(
                "A tag with this name already exists".to_string(),
            )),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn delete_tag(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row("SELECT id FROM tags WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Ok(false);
        }

        // Associations go first; the products they pointed at survive.
        tx.execute("DELETE FROM product_tags WHERE tag_id = ?1", params![id])?;
        tx.execute("DELETE FROM tags WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(true)
    }

    fn list_tag_products(&self, tag_id: i64) -> Result<Vec<ProductSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.name, p.price, p.current_stock
             FROM products p
             JOIN product_tags pt ON p.id = pt.product_id
             WHERE pt.tag_id = ?1
             ORDER BY p.name",
        )?;

        let rows = stmt.query_map(params![tag_id], |row| {
            Ok(ProductSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                price: row.get(2)?,
                current_stock: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use tempfile::TempDir;

    fn open_store(temp: &TempDir) -> SqliteStore {
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        store
    }

    fn ledger_sum(store: &SqliteStore, product_id: i64) -> i64 {
        store
            .list_product_movements(product_id)
            .unwrap()
            .iter()
            .map(|m| match m.direction {
                MovementDirection::In => m.quantity,
                MovementDirection::Out => -m.quantity,
            })
            .sum()
    }

    fn widget(initial_stock: i64, tags: &[&str]) -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            description: Some("A widget".to_string()),
            price: 10.0,
            initial_stock,
            tags: tags.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"products".to_string()));
        assert!(tables.contains(&"tags".to_string()));
        assert!(tables.contains(&"product_tags".to_string()));
        assert!(tables.contains(&"inventory".to_string()));
    }

    #[test]
    fn test_create_product_reconciles_tags_and_seeds_ledger() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        store.create_tag("Electronics", None).unwrap();

        let id = store
            .create_product(&widget(5, &["Electronics", "NewTag"]))
            .unwrap();

        // Only the missing tag was created.
        let tags = store.list_tags().unwrap();
        assert_eq!(tags.len(), 2);

        let view = store.get_product(id).unwrap().unwrap();
        assert_eq!(view.product.current_stock, 5);
        assert_eq!(view.tags, vec!["Electronics", "NewTag"]);

        let movements = store.list_product_movements(id).unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].direction, MovementDirection::In);
        assert_eq!(movements[0].quantity, 5);
        assert_eq!(movements[0].reason.as_deref(), Some("Initial stock"));
    }

    #[test]
    fn test_create_product_with_zero_stock_has_no_movement() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let id = store.create_product(&widget(0, &[])).unwrap();
        assert!(store.list_product_movements(id).unwrap().is_empty());
        assert_eq!(ledger_sum(&store, id), 0);
    }

    #[test]
    fn test_reconciliation_trims_and_dedups_requested_names() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let id = store
            .create_product(&widget(0, &["  Sale ", "Sale", "", "Premium"]))
            .unwrap();

        let view = store.get_product(id).unwrap().unwrap();
        assert_eq!(view.tags, vec!["Premium", "Sale"]);
        assert_eq!(store.list_tags().unwrap().len(), 2);
    }

    #[test]
    fn test_reconciliation_matches_stored_names_case_sensitively() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        store.create_tag("Electronics", None).unwrap();
        store
            .create_product(&widget(0, &["electronics"]))
            .unwrap();

        // Lowercase request did not match the stored name, so a second tag
        // row exists.
        assert_eq!(store.list_tags().unwrap().len(), 2);
    }

    #[test]
    fn test_adjust_stock_updates_counter_and_ledger_together() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let id = store.create_product(&widget(5, &[])).unwrap();

        let adj = store
            .adjust_stock(id, MovementDirection::Out, 3, None)
            .unwrap();
        assert_eq!(adj.previous_stock, 5);
        assert_eq!(adj.new_stock, 2);
        assert_eq!(adj.movement.reason.as_deref(), Some("Stock removal"));

        let view = store.get_product(id).unwrap().unwrap();
        assert_eq!(view.product.current_stock, 2);
        assert_eq!(ledger_sum(&store, id), 2);
    }

    #[test]
    fn test_insufficient_stock_leaves_no_partial_effects() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let id = store.create_product(&widget(5, &[])).unwrap();
        store
            .adjust_stock(id, MovementDirection::Out, 3, None)
            .unwrap();

        let result = store.adjust_stock(id, MovementDirection::Out, 10, None);
        assert!(matches!(
            result,
            Err(Error::InsufficientStock {
                available: 2,
                requested: 10
            })
        ));

        // Neither the counter nor the ledger moved.
        let view = store.get_product(id).unwrap().unwrap();
        assert_eq!(view.product.current_stock, 2);
        assert_eq!(store.list_product_movements(id).unwrap().len(), 2);
        assert_eq!(ledger_sum(&store, id), 2);
    }

    #[test]
    fn test_adjust_stock_rejects_bad_input() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let id = store.create_product(&widget(5, &[])).unwrap();

        assert!(matches!(
            store.adjust_stock(id, MovementDirection::In, 0, None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.adjust_stock(id, MovementDirection::In, -4, None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.adjust_stock(9999, MovementDirection::In, 1, None),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_concurrent_adjustments_never_lose_updates() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(open_store(&temp));
        let id = store.create_product(&widget(100, &[])).unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    store
                        .adjust_stock(id, MovementDirection::In, 2, None)
                        .unwrap();
                    store
                        .adjust_stock(id, MovementDirection::Out, 1, None)
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // 100 + 4 * 25 * (2 - 1)
        let view = store.get_product(id).unwrap().unwrap();
        assert_eq!(view.product.current_stock, 200);
        assert_eq!(ledger_sum(&store, id), 200);
    }

    #[test]
    fn test_list_products_filters_compose() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        store
            .create_product(&NewProduct {
                name: "iPhone 15 Pro".to_string(),
                price: 999.99,
                initial_stock: 25,
                tags: vec!["Electronics".to_string()],
                ..Default::default()
            })
            .unwrap();
        store
            .create_product(&NewProduct {
                name: "Galaxy Watch".to_string(),
                price: 299.99,
                initial_stock: 5,
                tags: vec!["Electronics".to_string()],
                ..Default::default()
            })
            .unwrap();
        store
            .create_product(&NewProduct {
                name: "Air Max 270".to_string(),
                price: 150.0,
                initial_stock: 50,
                tags: vec!["Footwear".to_string()],
                ..Default::default()
            })
            .unwrap();

        let all = store.list_products(&ProductFilter::default()).unwrap();
        assert_eq!(all.len(), 3);

        // Tag filter matches case-insensitively and semi-joins.
        let electronics = store
            .list_products(&ProductFilter {
                tag: Some("electronics".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(electronics.len(), 2);

        let filtered = store
            .list_products(&ProductFilter {
                tag: Some("Electronics".to_string()),
                min_stock: Some(10),
                name: Some("iphone".to_string()),
            })
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].product.name, "iPhone 15 Pro");
        assert_eq!(filtered[0].tags, vec!["Electronics"]);
    }

    #[test]
    fn test_list_products_ordered_by_id() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        for name in ["Zulu", "Alpha", "Mike"] {
            store
                .create_product(&NewProduct {
                    name: name.to_string(),
                    price: 1.0,
                    ..Default::default()
                })
                .unwrap();
        }

        let listed = store.list_products(&ProductFilter::default()).unwrap();
        let ids: Vec<i64> = listed.iter().map(|v| v.product.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_update_product_patches_fields() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let id = store.create_product(&widget(5, &["Sale"])).unwrap();

        store
            .update_product(
                id,
                &ProductPatch {
                    price: Some(12.5),
                    ..Default::default()
                },
            )
            .unwrap();

        let view = store.get_product(id).unwrap().unwrap();
        assert_eq!(view.product.name, "Widget");
        assert_eq!(view.product.price, 12.5);
        assert_eq!(view.product.current_stock, 5);
        assert_eq!(view.tags, vec!["Sale"]);

        assert!(matches!(
            store.update_product(9999, &ProductPatch::default()),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_delete_product_cascades_to_ledger_and_associations() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let id = store.create_product(&widget(5, &["Sale"])).unwrap();

        assert!(store.delete_product(id).unwrap());
        assert!(store.get_product(id).unwrap().is_none());
        assert!(store.list_product_movements(id).unwrap().is_empty());

        // The tag itself survives, detached.
        let tags = store.list_tags().unwrap();
        assert_eq!(tags.len(), 1);
        assert!(store.list_tag_products(tags[0].id).unwrap().is_empty());

        assert!(!store.delete_product(id).unwrap());
    }

    #[test]
    fn test_delete_tag_detaches_but_keeps_products() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let id = store.create_product(&widget(5, &["Sale"])).unwrap();
        let tag_id = store.list_tags().unwrap()[0].id;

        assert!(store.delete_tag(tag_id).unwrap());
        assert!(store.get_tag(tag_id).unwrap().is_none());

        let view = store.get_product(id).unwrap().unwrap();
        assert!(view.tags.is_empty());
        assert_eq!(view.product.current_stock, 5);
    }

    #[test]
    fn test_duplicate_tag_name_conflicts() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        store.create_tag("Sale", Some("On sale")).unwrap();
        assert!(matches!(
            store.create_tag("Sale", None),
            Err(Error::Conflict(_))
        ));

        let other = store.create_tag("Premium", None).unwrap();
        assert!(matches!(
            store.update_tag(
                other.id,
                &TagPatch {
                    name: Some("Sale".to_string()),
                    ..Default::default()
                }
            ),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn test_tag_products_ordered_by_name() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        for name in ["Zulu", "Alpha"] {
            store
                .create_product(&NewProduct {
                    name: name.to_string(),
                    price: 1.0,
                    tags: vec!["Sale".to_string()],
                    ..Default::default()
                })
                .unwrap();
        }

        let tag_id = store.list_tags().unwrap()[0].id;
        let products = store.list_tag_products(tag_id).unwrap();
        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zulu"]);
    }
}
