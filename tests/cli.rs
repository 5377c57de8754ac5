use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use stockroom::store::{ProductFilter, SqliteStore, Store};
use stockroom::types::MovementDirection;

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("stockroom")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve").and(predicate::str::contains("seed")));
}

#[test]
fn test_seed_populates_a_consistent_database() {
    let temp = TempDir::new().unwrap();

    Command::cargo_bin("stockroom")
        .unwrap()
        .args(["seed", "--data-dir"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Seeded 5 tags and 6 products"));

    let db_path = temp.path().join("stockroom.db");
    assert!(db_path.exists());

    let store = SqliteStore::new(&db_path).unwrap();
    let products = store.list_products(&ProductFilter::default()).unwrap();
    assert_eq!(products.len(), 6);

    // Every seeded product satisfies the ledger invariant.
    for view in &products {
        let ledger_sum: i64 = store
            .list_product_movements(view.product.id)
            .unwrap()
            .iter()
            .map(|m| match m.direction {
                MovementDirection::In => m.quantity,
                MovementDirection::Out => -m.quantity,
            })
            .sum();
        assert_eq!(view.product.current_stock, ledger_sum);
    }
    drop(store);

    // Seeding again replaces rather than duplicates.
    Command::cargo_bin("stockroom")
        .unwrap()
        .args(["seed", "--data-dir"])
        .arg(temp.path())
        .assert()
        .success();

    let store = SqliteStore::new(&db_path).unwrap();
    assert_eq!(
        store.list_products(&ProductFilter::default()).unwrap().len(),
        6
    );
    assert_eq!(store.list_tags().unwrap().len(), 5);
}
