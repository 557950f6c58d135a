//! Stockline Server: application entry point.
//!
//! Connects to SurrealDB, applies migrations and wires the auth, order
//! and directory services over one shared client handle. No network
//! transport is mounted; the process holds the wired [`AppState`] until
//! it receives ctrl-c.

use std::error::Error;

use stockline_auth::{AuthConfig, AuthService};
use stockline_db::{
    DbConfig, DbManager, SurrealBusinessRepository, SurrealOrderRepository,
    SurrealProductRepository, SurrealTenantRepository, SurrealUserRepository,
};
use stockline_service::{DirectoryService, OrderConfig, OrderService};
use surrealdb::engine::remote::ws::Client;
use tracing_subscriber::EnvFilter;

type Orders = OrderService<
    SurrealOrderRepository<Client>,
    SurrealProductRepository<Client>,
    SurrealBusinessRepository<Client>,
>;

type Directory = DirectoryService<
    SurrealTenantRepository<Client>,
    SurrealBusinessRepository<Client>,
    SurrealUserRepository<Client>,
    SurrealProductRepository<Client>,
>;

/// Services sharing one database client, ready to be handed to a
/// transport layer.
pub struct AppState {
    pub auth: AuthService<SurrealUserRepository<Client>>,
    pub orders: Orders,
    pub directory: Directory,
}

/// Auth settings from `STOCKLINE_JWT_PRIVATE_KEY_PEM`,
/// `STOCKLINE_JWT_PUBLIC_KEY_PEM` and `STOCKLINE_PASSWORD_PEPPER`.
fn auth_config() -> AuthConfig {
    let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
    let defaults = AuthConfig::default();
    AuthConfig {
        jwt_private_key_pem: var("STOCKLINE_JWT_PRIVATE_KEY_PEM").unwrap_or_default(),
        jwt_public_key_pem: var("STOCKLINE_JWT_PUBLIC_KEY_PEM").unwrap_or_default(),
        pepper: var("STOCKLINE_PASSWORD_PEPPER"),
        ..defaults
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("stockline=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting Stockline server...");

    let db_config = DbConfig::from_env();
    let manager = DbManager::connect(&db_config).await?;
    let db = manager.client().clone();
    stockline_db::run_migrations(&db).await?;

    let auth_config = auth_config();
    let pepper = auth_config.pepper.clone();
    if auth_config.jwt_private_key_pem.is_empty() {
        tracing::warn!("no JWT signing key configured; logins will fail");
    }
    let user_repo = |db| match pepper.clone() {
        Some(p) => SurrealUserRepository::with_pepper(db, p),
        None => SurrealUserRepository::new(db),
    };

    let state = AppState {
        auth: AuthService::new(user_repo(db.clone()), auth_config),
        orders: OrderService::new(
            SurrealOrderRepository::new(db.clone()),
            SurrealProductRepository::new(db.clone()),
            SurrealBusinessRepository::new(db.clone()),
            OrderConfig::default(),
        ),
        directory: DirectoryService::new(
            SurrealTenantRepository::new(db.clone()),
            SurrealBusinessRepository::new(db.clone()),
            user_repo(db.clone()),
            SurrealProductRepository::new(db),
        ),
    };

    tracing::info!(
        namespace = %db_config.namespace,
        database = %db_config.database,
        "Stockline services ready"
    );

    tokio::signal::ctrl_c().await?;
    drop(state);

    tracing::info!("Stockline server stopped.");
    Ok(())
}
