//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs and decimal amounts are stored as strings. Enums are stored as
//! strings with ASSERT constraints for validation. Every domain table
//! carries an `is_deleted` flag; rows are never physically removed.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD description ON TABLE tenant TYPE option<string>;
DEFINE FIELD status ON TABLE tenant TYPE string DEFAULT 'Active';
DEFINE FIELD tenant_type ON TABLE tenant TYPE option<string>;
DEFINE FIELD sub_type ON TABLE tenant TYPE option<string>;
DEFINE FIELD start_date ON TABLE tenant TYPE option<datetime>;
DEFINE FIELD end_date ON TABLE tenant TYPE option<datetime>;
DEFINE FIELD additional_data ON TABLE tenant TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD is_deleted ON TABLE tenant TYPE bool DEFAULT false;
DEFINE FIELD created_by ON TABLE tenant TYPE option<string>;
DEFINE FIELD modified_by ON TABLE tenant TYPE option<string>;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Businesses (tenant-scoped)
-- =======================================================================
DEFINE TABLE business SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE business TYPE string;
DEFINE FIELD business_type ON TABLE business TYPE string \
    ASSERT $value IN ['WHOLESALER', 'DEALER'];
DEFINE FIELD sub_type ON TABLE business TYPE option<string>;
DEFINE FIELD name ON TABLE business TYPE string;
DEFINE FIELD description ON TABLE business TYPE option<string>;
DEFINE FIELD address_line1 ON TABLE business TYPE option<string>;
DEFINE FIELD address_line2 ON TABLE business TYPE option<string>;
DEFINE FIELD email ON TABLE business TYPE option<string>;
DEFINE FIELD phone_number ON TABLE business TYPE option<string>;
DEFINE FIELD status ON TABLE business TYPE string DEFAULT 'Active';
DEFINE FIELD start_date ON TABLE business TYPE option<datetime>;
DEFINE FIELD end_date ON TABLE business TYPE option<datetime>;
DEFINE FIELD is_deleted ON TABLE business TYPE bool DEFAULT false;
DEFINE FIELD created_by ON TABLE business TYPE option<string>;
DEFINE FIELD modified_by ON TABLE business TYPE option<string>;
DEFINE FIELD created_at ON TABLE business TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE business TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_business_tenant ON TABLE business \
    COLUMNS tenant_id, business_type;

-- =======================================================================
-- Users (tenant-scoped, optionally business-scoped)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE string;
DEFINE FIELD business_id ON TABLE user TYPE option<string>;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['SuperAdmin', 'TechAdmin', 'SalesAdmin', \
    'WholesalerAdmin', 'Wholesaler', 'DealerAdmin', 'Dealer'];
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD phone_number ON TABLE user TYPE option<string>;
DEFINE FIELD address_line1 ON TABLE user TYPE option<string>;
DEFINE FIELD address_line2 ON TABLE user TYPE option<string>;
DEFINE FIELD description ON TABLE user TYPE option<string>;
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['Active', 'Inactive'];
DEFINE FIELD is_deleted ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD created_by ON TABLE user TYPE option<string>;
DEFINE FIELD modified_by ON TABLE user TYPE option<string>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username;
DEFINE INDEX idx_user_tenant_business ON TABLE user \
    COLUMNS tenant_id, business_id;

-- =======================================================================
-- Products (tenant-scoped). Money is stored as decimal strings.
-- =======================================================================
DEFINE TABLE product SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE product TYPE string;
DEFINE FIELD code ON TABLE product TYPE string;
DEFINE FIELD name ON TABLE product TYPE string;
DEFINE FIELD description ON TABLE product TYPE option<string>;
DEFINE FIELD quantity ON TABLE product TYPE int ASSERT $value >= 0;
DEFINE FIELD mrp ON TABLE product TYPE string;
DEFINE FIELD discount_type ON TABLE product TYPE option<string> \
    ASSERT $value = NONE OR $value IN ['Fixed', 'Percentage'];
DEFINE FIELD discount_amount ON TABLE product TYPE option<string>;
DEFINE FIELD tax_type ON TABLE product TYPE option<string>;
DEFINE FIELD tax_amount ON TABLE product TYPE option<string>;
DEFINE FIELD image_link ON TABLE product TYPE option<string>;
DEFINE FIELD image_path ON TABLE product TYPE option<string>;
DEFINE FIELD additional_data ON TABLE product TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD is_deleted ON TABLE product TYPE bool DEFAULT false;
DEFINE FIELD created_by ON TABLE product TYPE option<string>;
DEFINE FIELD modified_by ON TABLE product TYPE option<string>;
DEFINE FIELD created_at ON TABLE product TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE product TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_product_tenant ON TABLE product COLUMNS tenant_id;

-- =======================================================================
-- Orders (tenant- and business-scoped)
-- =======================================================================
DEFINE TABLE purchase_order SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE purchase_order TYPE string;
DEFINE FIELD business_id ON TABLE purchase_order TYPE string;
DEFINE FIELD order_type ON TABLE purchase_order TYPE string \
    ASSERT $value IN ['Booked', 'Requested'];
DEFINE FIELD sub_type ON TABLE purchase_order TYPE option<string>;
DEFINE FIELD order_status ON TABLE purchase_order TYPE string \
    ASSERT $value IN ['New', 'InProgress', 'Done', 'Cancelled'];
DEFINE FIELD order_date_time ON TABLE purchase_order TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD additional_data ON TABLE purchase_order TYPE object \
    FLEXIBLE DEFAULT {};
DEFINE FIELD is_deleted ON TABLE purchase_order TYPE bool DEFAULT false;
DEFINE FIELD created_by ON TABLE purchase_order TYPE string;
DEFINE FIELD modified_by ON TABLE purchase_order TYPE string;
DEFINE FIELD created_at ON TABLE purchase_order TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE purchase_order TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_purchase_order_scope ON TABLE purchase_order \
    COLUMNS tenant_id, business_id;

-- =======================================================================
-- Order line items
-- =======================================================================
DEFINE TABLE ordered_product SCHEMAFULL;
DEFINE FIELD order_id ON TABLE ordered_product TYPE string;
DEFINE FIELD product_id ON TABLE ordered_product TYPE string;
DEFINE FIELD line_no ON TABLE ordered_product TYPE int;
DEFINE FIELD quantity ON TABLE ordered_product TYPE int \
    ASSERT $value > 0;
DEFINE FIELD price ON TABLE ordered_product TYPE string;
DEFINE FIELD discount_type ON TABLE ordered_product TYPE option<string> \
    ASSERT $value = NONE OR $value IN ['Fixed', 'Percentage'];
DEFINE FIELD discount_amount ON TABLE ordered_product TYPE option<string>;
DEFINE FIELD tax_type ON TABLE ordered_product TYPE option<string>;
DEFINE FIELD tax_amount ON TABLE ordered_product TYPE option<string>;
DEFINE FIELD total_cost ON TABLE ordered_product TYPE string;
DEFINE FIELD is_deleted ON TABLE ordered_product TYPE bool DEFAULT false;
DEFINE FIELD created_by ON TABLE ordered_product TYPE string;
DEFINE FIELD modified_by ON TABLE ordered_product TYPE string;
DEFINE FIELD created_at ON TABLE ordered_product TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE ordered_product TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_ordered_product_order ON TABLE ordered_product \
    COLUMNS order_id;
";

/// Run all pending migrations against the database.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum, so
/// running it against an up-to-date database is a no-op.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
