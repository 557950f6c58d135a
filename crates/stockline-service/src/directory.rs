//! Directory service: tenants, businesses, users and the product
//! catalogue, each read and written through the access policy.

use stockline_core::actor::Actor;
use stockline_core::error::{StocklineError, StocklineResult};
use stockline_core::models::business::{Business, BusinessType, CreateBusiness, UpdateBusiness};
use stockline_core::models::product::{CreateProduct, Product, UpdateProduct};
use stockline_core::models::tenant::{CreateTenant, Tenant, TenantDetail, UpdateTenant};
use stockline_core::models::user::{CreateUser, UpdateUser, User};
use stockline_core::policy::{AccessPolicy, Action, ResourceKind, Scope, Target, UserTarget};
use stockline_core::query::{ListFilters, MAX_PAGE_SIZE, QueryScope};
use stockline_core::repository::{
    BusinessRepository, PaginatedResult, ProductRepository, TenantRepository, UserRepository,
};
use tracing::{info, instrument};
use uuid::Uuid;

pub struct DirectoryService<T, B, U, P>
where
    T: TenantRepository,
    B: BusinessRepository,
    U: UserRepository,
    P: ProductRepository,
{
    tenants: T,
    businesses: B,
    users: U,
    products: P,
}

impl<T, B, U, P> DirectoryService<T, B, U, P>
where
    T: TenantRepository,
    B: BusinessRepository,
    U: UserRepository,
    P: ProductRepository,
{
    pub fn new(tenants: T, businesses: B, users: U, products: P) -> Self {
        Self {
            tenants,
            businesses,
            users,
            products,
        }
    }

    // -----------------------------------------------------------------------
    // Tenants
    // -----------------------------------------------------------------------

    pub async fn list_tenants(
        &self,
        actor: &Actor,
        filters: &ListFilters,
    ) -> StocklineResult<PaginatedResult<Tenant>> {
        let query = QueryScope::build(actor, ResourceKind::Tenant, filters)?;
        self.tenants.list(&query).await
    }

    pub async fn get_tenant(&self, actor: &Actor, id: Uuid) -> StocklineResult<Tenant> {
        let scope = AccessPolicy::record_scope(actor, ResourceKind::Tenant, Action::Read)?;
        let tenant = self.tenants.get_by_id(id).await?;
        if !scope.covers(Target::tenant(tenant.id)) {
            return Err(StocklineError::not_found("tenant", id));
        }
        Ok(tenant)
    }

    /// The tenant with its wholesaler and dealers, limited to the
    /// businesses the actor may read.
    pub async fn get_tenant_detail(&self, actor: &Actor, id: Uuid) -> StocklineResult<TenantDetail> {
        let tenant = self.get_tenant(actor, id).await?;

        let mut businesses = Vec::new();
        let mut filters = ListFilters {
            tenant_id: Some(tenant.id),
            sort_by: Some("name".into()),
            order: Some("asc".into()),
            size: Some(MAX_PAGE_SIZE),
            ..ListFilters::default()
        };
        for page in 1.. {
            filters.page = Some(page);
            let query = QueryScope::build(actor, ResourceKind::Business, &filters)?;
            let batch = self.businesses.list(&query).await?;
            let fetched = batch.items.len() as u64;
            businesses.extend(batch.items);
            if fetched < MAX_PAGE_SIZE || businesses.len() as u64 >= batch.total {
                break;
            }
        }

        let (wholesalers, dealers): (Vec<_>, Vec<_>) = businesses
            .into_iter()
            .partition(|b| b.business_type == BusinessType::Wholesaler);
        Ok(TenantDetail {
            tenant,
            wholesaler: wholesalers.into_iter().next(),
            dealers,
        })
    }

    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub async fn create_tenant(&self, actor: &Actor, input: CreateTenant) -> StocklineResult<Tenant> {
        AccessPolicy::authorize(actor, ResourceKind::Tenant, Action::Create, None)?;
        check_date_range(input.start_date, input.end_date)?;
        let tenant = self.tenants.create(input, actor.id).await?;
        info!(tenant_id = %tenant.id, "tenant created");
        Ok(tenant)
    }

    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub async fn update_tenant(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateTenant,
    ) -> StocklineResult<Tenant> {
        let tenant = self.get_tenant(actor, id).await?;
        AccessPolicy::authorize(
            actor,
            ResourceKind::Tenant,
            Action::Update,
            Some(Target::tenant(tenant.id)),
        )?;
        check_date_range(
            input.start_date.or(tenant.start_date),
            input.end_date.or(tenant.end_date),
        )?;
        self.tenants.update(id, input, actor.id).await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_tenant(&self, actor: &Actor, id: Uuid) -> StocklineResult<()> {
        let tenant = self.get_tenant(actor, id).await?;
        AccessPolicy::authorize(
            actor,
            ResourceKind::Tenant,
            Action::Delete,
            Some(Target::tenant(tenant.id)),
        )?;
        self.tenants.delete(id, actor.id).await
    }

    // -----------------------------------------------------------------------
    // Businesses
    // -----------------------------------------------------------------------

    pub async fn list_businesses(
        &self,
        actor: &Actor,
        filters: &ListFilters,
    ) -> StocklineResult<PaginatedResult<Business>> {
        let query = QueryScope::build(actor, ResourceKind::Business, filters)?;
        self.businesses.list(&query).await
    }

    pub async fn get_business(&self, actor: &Actor, id: Uuid) -> StocklineResult<Business> {
        let scope = AccessPolicy::record_scope(actor, ResourceKind::Business, Action::Read)?;
        let business = self.businesses.get_by_id(id).await?;
        if !scope.covers(Target::business(business.tenant_id, business.id)) {
            return Err(StocklineError::not_found("business", id));
        }
        Ok(business)
    }

    /// A tenant holds at most one wholesaler; the store enforces it.
    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id, tenant_id = %input.tenant_id))]
    pub async fn create_business(
        &self,
        actor: &Actor,
        input: CreateBusiness,
    ) -> StocklineResult<Business> {
        AccessPolicy::authorize(
            actor,
            ResourceKind::Business,
            Action::Create,
            Some(Target::tenant(input.tenant_id)),
        )?;
        check_date_range(input.start_date, input.end_date)?;
        self.tenants.get_by_id(input.tenant_id).await?;
        let business = self.businesses.create(input, actor.id).await?;
        info!(business_id = %business.id, business_type = %business.business_type, "business created");
        Ok(business)
    }

    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub async fn update_business(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateBusiness,
    ) -> StocklineResult<Business> {
        let business = self.get_business(actor, id).await?;
        AccessPolicy::authorize(
            actor,
            ResourceKind::Business,
            Action::Update,
            Some(Target::business(business.tenant_id, business.id)),
        )?;
        check_date_range(
            input.start_date.or(business.start_date),
            input.end_date.or(business.end_date),
        )?;
        self.businesses.update(id, input, actor.id).await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_business(&self, actor: &Actor, id: Uuid) -> StocklineResult<()> {
        let business = self.get_business(actor, id).await?;
        AccessPolicy::authorize(
            actor,
            ResourceKind::Business,
            Action::Delete,
            Some(Target::business(business.tenant_id, business.id)),
        )?;
        self.businesses.delete(id, actor.id).await
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Wholesalers only ever see users attached to wholesaler or dealer
    /// businesses of their tenant.
    pub async fn list_users(
        &self,
        actor: &Actor,
        filters: &ListFilters,
    ) -> StocklineResult<PaginatedResult<User>> {
        let query = QueryScope::build(actor, ResourceKind::User, filters)?;
        self.users.list(&query).await
    }

    pub async fn get_user(&self, actor: &Actor, id: Uuid) -> StocklineResult<User> {
        let scope = AccessPolicy::record_scope(actor, ResourceKind::User, Action::Read)?;
        let user = self.users.get_by_id(id).await?;
        if !scope.covers(user_row(&user)) || !self.business_type_visible(actor, &user).await? {
            return Err(StocklineError::not_found("user", id));
        }
        Ok(user)
    }

    async fn business_type_visible(&self, actor: &Actor, user: &User) -> StocklineResult<bool> {
        let Some(types) = AccessPolicy::visible_business_types(actor, ResourceKind::User) else {
            return Ok(true);
        };
        let Some(business_id) = user.business_id else {
            return Ok(false);
        };
        match self.businesses.get_by_id(business_id).await {
            Ok(business) => Ok(types.contains(&business.business_type)),
            Err(StocklineError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id, role = %input.role))]
    pub async fn create_user(&self, actor: &Actor, input: CreateUser) -> StocklineResult<User> {
        input.role.check_business(input.business_id)?;
        let cross_tenant =
            AccessPolicy::scope(actor, ResourceKind::User, Action::Create) == Scope::AllTenants;

        if let Some(business_id) = input.business_id {
            let business = match self.businesses.get_by_id(business_id).await {
                Ok(business) => business,
                Err(StocklineError::NotFound { .. }) if !cross_tenant => {
                    return Err(StocklineError::denied("business is outside your scope"));
                }
                Err(e) => return Err(e),
            };
            if business.tenant_id != input.tenant_id {
                let reason = "business does not belong to the user's tenant";
                return Err(if cross_tenant {
                    StocklineError::validation(reason)
                } else {
                    StocklineError::denied(reason)
                });
            }
        }

        AccessPolicy::authorize_user_write(
            actor,
            Action::Create,
            UserTarget {
                id: None,
                tenant_id: input.tenant_id,
                business_id: input.business_id,
                role: input.role,
            },
        )?;
        self.tenants.get_by_id(input.tenant_id).await?;

        let user = self.users.create(input, actor.id).await?;
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub async fn update_user(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateUser,
    ) -> StocklineResult<User> {
        let user = self.get_user(actor, id).await?;
        let current = user_target(&user);
        AccessPolicy::authorize_user_write(actor, Action::Update, current)?;

        let next = UserTarget {
            business_id: input.business_id.unwrap_or(user.business_id),
            role: input.role.unwrap_or(user.role),
            ..current
        };
        if next.role != current.role || next.business_id != current.business_id {
            next.role.check_business(next.business_id)?;
            if let Some(business_id) = next.business_id {
                let business = self.businesses.get_by_id(business_id).await?;
                if business.tenant_id != user.tenant_id {
                    return Err(StocklineError::validation(
                        "business does not belong to the user's tenant",
                    ));
                }
            }
            AccessPolicy::authorize_user_write(actor, Action::Update, next)?;
        }

        self.users.update(id, input, actor.id).await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_user(&self, actor: &Actor, id: Uuid) -> StocklineResult<()> {
        let user = self.get_user(actor, id).await?;
        AccessPolicy::authorize_user_write(actor, Action::Delete, user_target(&user))?;
        self.users.delete(id, actor.id).await
    }

    // -----------------------------------------------------------------------
    // Products
    // -----------------------------------------------------------------------

    pub async fn list_products(
        &self,
        actor: &Actor,
        filters: &ListFilters,
    ) -> StocklineResult<PaginatedResult<Product>> {
        let query = QueryScope::build(actor, ResourceKind::Product, filters)?;
        self.products.list(&query).await
    }

    pub async fn get_product(&self, actor: &Actor, id: Uuid) -> StocklineResult<Product> {
        let scope = AccessPolicy::record_scope(actor, ResourceKind::Product, Action::Read)?;
        let product = self.products.get_by_id(id).await?;
        if !scope.covers(Target::tenant(product.tenant_id)) {
            return Err(StocklineError::not_found("product", id));
        }
        Ok(product)
    }

    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id, tenant_id = %input.tenant_id))]
    pub async fn create_product(
        &self,
        actor: &Actor,
        input: CreateProduct,
    ) -> StocklineResult<Product> {
        AccessPolicy::authorize(
            actor,
            ResourceKind::Product,
            Action::Create,
            Some(Target::tenant(input.tenant_id)),
        )?;
        if input.quantity < 0 {
            return Err(StocklineError::validation("quantity cannot be negative"));
        }
        self.tenants.get_by_id(input.tenant_id).await?;
        let product = self.products.create(input, actor.id).await?;
        info!(product_id = %product.id, quantity = product.quantity, "product created");
        Ok(product)
    }

    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub async fn update_product(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateProduct,
    ) -> StocklineResult<Product> {
        let product = self.get_product(actor, id).await?;
        AccessPolicy::authorize(
            actor,
            ResourceKind::Product,
            Action::Update,
            Some(Target::tenant(product.tenant_id)),
        )?;
        if input.quantity.is_some_and(|q| q < 0) {
            return Err(StocklineError::validation("quantity cannot be negative"));
        }
        self.products.update(id, input, actor.id).await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_product(&self, actor: &Actor, id: Uuid) -> StocklineResult<()> {
        let product = self.get_product(actor, id).await?;
        AccessPolicy::authorize(
            actor,
            ResourceKind::Product,
            Action::Delete,
            Some(Target::tenant(product.tenant_id)),
        )?;
        self.products.delete(id, actor.id).await
    }

    /// Add `delta` units to (or take them from) a product's stock, for
    /// restocking and for reconciling cancelled Booked orders.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn adjust_stock(
        &self,
        actor: &Actor,
        id: Uuid,
        delta: i64,
    ) -> StocklineResult<Product> {
        if delta == 0 {
            return Err(StocklineError::validation("stock adjustment must be non-zero"));
        }
        let scope = AccessPolicy::record_scope(actor, ResourceKind::Product, Action::Update)?;
        let product = self.products.adjust_quantity(scope, id, delta, actor.id).await?;
        info!(product_id = %id, delta, quantity = product.quantity, "stock adjusted");
        Ok(product)
    }
}

fn user_row(user: &User) -> Target {
    Target {
        tenant_id: user.tenant_id,
        business_id: user.business_id,
    }
}

fn user_target(user: &User) -> UserTarget {
    UserTarget {
        id: Some(user.id),
        tenant_id: user.tenant_id,
        business_id: user.business_id,
        role: user.role,
    }
}

fn check_date_range<D: PartialOrd>(start: Option<D>, end: Option<D>) -> StocklineResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(StocklineError::validation(
            "start date must not be after end date",
        )),
        _ => Ok(()),
    }
}
