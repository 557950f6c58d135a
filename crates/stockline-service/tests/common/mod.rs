//! Shared fixture for service integration tests: an in-memory store
//! with one tenant holding a wholesaler and two dealers.

#![allow(dead_code)]

use rust_decimal::Decimal;
use stockline_core::actor::Actor;
use stockline_core::models::business::{Business, BusinessType, CreateBusiness};
use stockline_core::models::order::{LineItemInput, OrderSubmission, OrderType};
use stockline_core::models::product::{CreateProduct, Product};
use stockline_core::models::tenant::{CreateTenant, Tenant};
use stockline_core::models::user::Role;
use stockline_db::repository::{
    SurrealBusinessRepository, SurrealOrderRepository, SurrealProductRepository,
    SurrealTenantRepository, SurrealUserRepository,
};
use stockline_service::{DirectoryService, OrderConfig, OrderService};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

pub type Directory = DirectoryService<
    SurrealTenantRepository<Db>,
    SurrealBusinessRepository<Db>,
    SurrealUserRepository<Db>,
    SurrealProductRepository<Db>,
>;

pub type Orders = OrderService<
    SurrealOrderRepository<Db>,
    SurrealProductRepository<Db>,
    SurrealBusinessRepository<Db>,
>;

pub struct Fixture {
    pub directory: Directory,
    pub orders: Orders,
    pub admin: Actor,
    pub tenant: Tenant,
    pub wholesaler: Business,
    pub dealer: Business,
    pub other_dealer: Business,
}

pub async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    stockline_db::run_migrations(&db).await.unwrap();

    let directory = DirectoryService::new(
        SurrealTenantRepository::new(db.clone()),
        SurrealBusinessRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        SurrealProductRepository::new(db.clone()),
    );
    let orders = OrderService::new(
        SurrealOrderRepository::new(db.clone()),
        SurrealProductRepository::new(db.clone()),
        SurrealBusinessRepository::new(db),
        OrderConfig::default(),
    );

    let admin = Actor::new(Uuid::new_v4(), Role::SuperAdmin, Uuid::new_v4(), None);
    let tenant = create_tenant(&directory, &admin, "Acme").await;
    let wholesaler = create_business(
        &directory,
        &admin,
        tenant.id,
        BusinessType::Wholesaler,
        "Acme Wholesale",
    )
    .await;
    let dealer = create_business(&directory, &admin, tenant.id, BusinessType::Dealer, "North").await;
    let other_dealer =
        create_business(&directory, &admin, tenant.id, BusinessType::Dealer, "South").await;

    Fixture {
        directory,
        orders,
        admin,
        tenant,
        wholesaler,
        dealer,
        other_dealer,
    }
}

pub async fn create_tenant(directory: &Directory, admin: &Actor, name: &str) -> Tenant {
    directory
        .create_tenant(
            admin,
            CreateTenant {
                name: name.into(),
                description: None,
                status: None,
                tenant_type: None,
                sub_type: None,
                start_date: None,
                end_date: None,
                additional_data: None,
            },
        )
        .await
        .unwrap()
}

pub async fn create_business(
    directory: &Directory,
    admin: &Actor,
    tenant_id: Uuid,
    business_type: BusinessType,
    name: &str,
) -> Business {
    directory
        .create_business(admin, business_input(tenant_id, business_type, name))
        .await
        .unwrap()
}

pub fn business_input(tenant_id: Uuid, business_type: BusinessType, name: &str) -> CreateBusiness {
    CreateBusiness {
        tenant_id,
        business_type,
        sub_type: None,
        name: name.into(),
        description: None,
        address_line1: None,
        address_line2: None,
        email: None,
        phone_number: None,
        start_date: None,
        end_date: None,
        status: None,
    }
}

impl Fixture {
    pub async fn product(&self, code: &str, quantity: i64) -> Product {
        self.product_in(self.tenant.id, code, quantity).await
    }

    pub async fn product_in(&self, tenant_id: Uuid, code: &str, quantity: i64) -> Product {
        self.directory
            .create_product(
                &self.admin,
                CreateProduct {
                    tenant_id,
                    code: code.into(),
                    name: format!("Product {code}"),
                    description: None,
                    quantity,
                    mrp: Decimal::new(1250, 2),
                    discount_type: None,
                    discount_amount: None,
                    tax_type: None,
                    tax_amount: None,
                    image_link: None,
                    image_path: None,
                    additional_data: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn stock(&self, product_id: Uuid) -> i64 {
        self.directory
            .get_product(&self.admin, product_id)
            .await
            .unwrap()
            .quantity
    }

    pub fn actor(&self, role: Role, business: Option<&Business>) -> Actor {
        Actor::new(Uuid::new_v4(), role, self.tenant.id, business.map(|b| b.id))
    }

    pub fn dealer_actor(&self) -> Actor {
        self.actor(Role::Dealer, Some(&self.dealer))
    }

    pub fn wholesaler_admin(&self) -> Actor {
        self.actor(Role::WholesalerAdmin, Some(&self.wholesaler))
    }

    /// A submission placed by the admin on behalf of `business`.
    pub fn submission(
        &self,
        business: &Business,
        order_type: OrderType,
        items: Vec<LineItemInput>,
    ) -> OrderSubmission {
        OrderSubmission {
            tenant_id: Some(business.tenant_id),
            business_id: business.id,
            order_type,
            sub_type: None,
            status: None,
            additional_data: None,
            items,
        }
    }
}

pub fn item(product_id: Uuid, quantity: i64) -> LineItemInput {
    let price = Decimal::new(1250, 2);
    LineItemInput {
        product_id,
        quantity,
        price,
        discount_type: None,
        discount_amount: None,
        tax_type: None,
        tax_amount: None,
        total_cost: price * Decimal::from(quantity),
    }
}
