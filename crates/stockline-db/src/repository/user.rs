//! SurrealDB implementation of [`UserRepository`].
//!
//! Password hashing uses Argon2id with OWASP-recommended parameters
//! (memory: 19 MiB, iterations: 2, parallelism: 1). Salt is randomly
//! generated per hash. An optional pepper (server-side secret) can be
//! provided at construction time.
//!
//! Usernames are unique among non-deleted users; emails likewise,
//! compared case-insensitively.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, Utc};
use stockline_core::error::StocklineResult;
use stockline_core::models::user::{CreateUser, UpdateUser, User, UserStatus};
use stockline_core::query::QueryDescriptor;
use stockline_core::repository::{PaginatedResult, UserRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::support::{classify_failure, parse_enum, parse_opt_uuid, parse_uuid};
use crate::error::DbError;
use crate::query::ScopedQuery;

const FAILURE_MARKERS: &[(&str, &str)] = &[
    ("username_taken", "username already in use"),
    ("email_taken", "email already in use"),
];

const USERNAME_GUARD: &str = "\
    LET $same_username = (SELECT VALUE id FROM user \
        WHERE username = $username AND is_deleted = false AND meta::id(id) != $id); \
    IF array::len($same_username) > 0 { THROW 'username_taken'; };";

const EMAIL_GUARD: &str = "\
    LET $same_email = (SELECT VALUE id FROM user \
        WHERE string::lowercase(email) = string::lowercase($email) \
        AND is_deleted = false AND meta::id(id) != $id); \
    IF array::len($same_email) > 0 { THROW 'email_taken'; };";

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: Option<String>,
    tenant_id: String,
    business_id: Option<String>,
    role: String,
    username: String,
    email: String,
    password_hash: String,
    name: String,
    phone_number: Option<String>,
    address_line1: Option<String>,
    address_line2: Option<String>,
    description: Option<String>,
    status: String,
    created_by: Option<String>,
    modified_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            business_id: parse_opt_uuid(self.business_id.as_deref(), "business")?,
            role: parse_enum(&self.role, "role")?,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            name: self.name,
            phone_number: self.phone_number,
            address_line1: self.address_line1,
            address_line2: self.address_line2,
            description: self.description,
            status: parse_enum(&self.status, "user status")?,
            created_by: parse_opt_uuid(self.created_by.as_deref(), "created_by")?,
            modified_by: parse_opt_uuid(self.modified_by.as_deref(), "modified_by")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    fn try_into_user(self) -> Result<User, DbError> {
        let id = parse_uuid(self.record_id.as_deref().unwrap_or_default(), "user")?;
        self.into_user(id)
    }
}

/// Hash a password with Argon2id using OWASP-recommended parameters.
///
/// If a pepper is provided, it is prepended to the password before
/// hashing. The salt is randomly generated for each call.
fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, DbError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::Hash(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| DbError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }

    async fn select_one(&self, query: &str, key: &'static str, value: String) -> StocklineResult<User> {
        let mut result = self
            .db
            .query(query)
            .bind((key, value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", format!("{key}={value}")))?;

        Ok(row.try_into_user()?)
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser, actor_id: Uuid) -> StocklineResult<User> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        let query = format!(
            "BEGIN TRANSACTION; {USERNAME_GUARD} {EMAIL_GUARD} \
             CREATE type::record('user', $id) SET \
                 tenant_id = $tenant_id, business_id = $business_id, role = $role, \
                 username = $username, email = $email, password_hash = $password_hash, \
                 name = $name, phone_number = $phone_number, \
                 address_line1 = $address_line1, address_line2 = $address_line2, \
                 description = $description, status = $status, \
                 created_by = $actor_id, modified_by = $actor_id; \
             COMMIT TRANSACTION;"
        );

        let result = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("business_id", input.business_id.map(|b| b.to_string())))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("username", input.username))
            .bind(("email", input.email))
            .bind(("password_hash", password_hash))
            .bind(("name", input.name))
            .bind(("phone_number", input.phone_number))
            .bind(("address_line1", input.address_line1))
            .bind(("address_line2", input.address_line2))
            .bind(("description", input.description))
            .bind(("status", UserStatus::Active.as_str().to_string()))
            .bind(("actor_id", actor_id.to_string()))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| classify_failure(e.to_string(), FAILURE_MARKERS, DbError::Query))?;

        debug!(user_id = %id, role = %input.role, "user created");
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> StocklineResult<User> {
        self.select_one(
            "SELECT meta::id(id) AS record_id, * FROM type::record('user', $id) \
             WHERE is_deleted = false",
            "id",
            id.to_string(),
        )
        .await
    }

    async fn get_by_username(&self, username: &str) -> StocklineResult<User> {
        self.select_one(
            "SELECT meta::id(id) AS record_id, * FROM user \
             WHERE username = $username AND is_deleted = false",
            "username",
            username.to_string(),
        )
        .await
    }

    async fn update(&self, id: Uuid, input: UpdateUser, actor_id: Uuid) -> StocklineResult<User> {
        let password_hash = input
            .password
            .as_deref()
            .map(|p| hash_password(p, self.pepper.as_deref()))
            .transpose()?;

        let mut guards = String::new();
        let mut sets = Vec::new();
        if input.business_id.is_some() {
            sets.push("business_id = $business_id");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.username.is_some() {
            guards.push_str(USERNAME_GUARD);
            sets.push("username = $username");
        }
        if input.email.is_some() {
            guards.push_str(EMAIL_GUARD);
            sets.push("email = $email");
        }
        if password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.phone_number.is_some() {
            sets.push("phone_number = $phone_number");
        }
        if input.address_line1.is_some() {
            sets.push("address_line1 = $address_line1");
        }
        if input.address_line2.is_some() {
            sets.push("address_line2 = $address_line2");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        sets.push("modified_by = $actor_id");
        sets.push("updated_at = time::now()");

        let query = format!(
            "BEGIN TRANSACTION; {guards} \
             UPDATE type::record('user', $id) SET {} WHERE is_deleted = false; \
             COMMIT TRANSACTION;",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("actor_id", actor_id.to_string()));

        if let Some(business_id) = input.business_id {
            // Some(None) detaches the user from its business.
            builder = builder.bind(("business_id", business_id.map(|b| b.to_string())));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }
        if let Some(username) = input.username {
            builder = builder.bind(("username", username));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(password_hash) = password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(phone_number) = input.phone_number {
            builder = builder.bind(("phone_number", phone_number));
        }
        if let Some(address_line1) = input.address_line1 {
            builder = builder.bind(("address_line1", address_line1));
        }
        if let Some(address_line2) = input.address_line2 {
            builder = builder.bind(("address_line2", address_line2));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status.as_str().to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| classify_failure(e.to_string(), FAILURE_MARKERS, DbError::Query))?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid, actor_id: Uuid) -> StocklineResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 is_deleted = true, status = 'Inactive', \
                 modified_by = $actor_id, updated_at = time::now() \
                 WHERE is_deleted = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("actor_id", actor_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::not_found("user", id_str).into());
        }
        debug!(user_id = %id, "user soft-deleted");
        Ok(())
    }

    async fn list(&self, query: &QueryDescriptor) -> StocklineResult<PaginatedResult<User>> {
        let scoped = ScopedQuery::new("user", query);
        let pagination = scoped.pagination();
        let (rows, total) = scoped.fetch::<C, UserRow>(&self.db).await?;

        let items = rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
