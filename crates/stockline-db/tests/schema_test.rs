//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn migrated() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    stockline_db::run_migrations(&db).await.unwrap();
    db
}

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = migrated().await;

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "tenant",
        "business",
        "user",
        "product",
        "purchase_order",
        "ordered_product",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = migrated().await;
    stockline_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn product_quantity_cannot_go_negative() {
    let db = migrated().await;

    db.query(
        "CREATE product:widget SET tenant_id = 't1', code = 'W-1', \
         name = 'Widget', quantity = 1, mrp = '9.99'",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let result = db
        .query("UPDATE product:widget SET quantity -= 2")
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "negative stock must be rejected");
}

#[tokio::test]
async fn closed_enums_are_asserted() {
    let db = migrated().await;

    let result = db
        .query(
            "CREATE user SET tenant_id = 't1', role = 'Owner', username = 'x', \
             email = 'x@example.com', password_hash = 'h', name = 'X', status = 'Active'",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "unknown role must be rejected");

    let result = db
        .query(
            "CREATE purchase_order SET tenant_id = 't1', business_id = 'b1', \
             order_type = 'Booked', order_status = 'Shipped', \
             created_by = 'u', modified_by = 'u'",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "unknown order status must be rejected");
}
