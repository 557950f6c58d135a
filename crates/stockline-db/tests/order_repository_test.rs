//! Integration tests for the Order repository: transactional batch
//! commit, status compare-and-set and soft delete.

use rust_decimal::Decimal;
use stockline_core::error::StocklineError;
use stockline_core::models::order::{
    NewOrder, NewOrderedProduct, OrderBatchPlan, OrderStatus, OrderType, StockDemand,
    UpdateOrder,
};
use stockline_core::models::product::{CreateProduct, DiscountType, Product};
use stockline_core::policy::{RecordScope, ResourceKind};
use stockline_core::query::{QueryDescriptor, Sort, SortDirection};
use stockline_core::repository::{OrderRepository, Pagination, ProductRepository};
use stockline_db::repository::{SurrealOrderRepository, SurrealProductRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

struct Fixture {
    orders: SurrealOrderRepository<Db>,
    products: SurrealProductRepository<Db>,
    tenant_id: Uuid,
    actor_id: Uuid,
}

async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    stockline_db::run_migrations(&db).await.unwrap();

    Fixture {
        orders: SurrealOrderRepository::new(db.clone()),
        products: SurrealProductRepository::new(db),
        tenant_id: Uuid::new_v4(),
        actor_id: Uuid::new_v4(),
    }
}

impl Fixture {
    async fn product(&self, code: &str, quantity: i64) -> Product {
        self.products
            .create(
                CreateProduct {
                    tenant_id: self.tenant_id,
                    code: code.into(),
                    name: code.into(),
                    description: None,
                    quantity,
                    mrp: Decimal::new(500, 2),
                    discount_type: None,
                    discount_amount: None,
                    tax_type: None,
                    tax_amount: None,
                    image_link: None,
                    image_path: None,
                    additional_data: None,
                },
                self.actor_id,
            )
            .await
            .unwrap()
    }

    async fn stock(&self, id: Uuid) -> i64 {
        self.products.get_by_id(id).await.unwrap().quantity
    }

    fn plan(&self, orders: Vec<NewOrder>, demand: Vec<StockDemand>) -> OrderBatchPlan {
        OrderBatchPlan {
            tenant_id: self.tenant_id,
            actor_id: self.actor_id,
            orders,
            demand,
        }
    }
}

fn line(product_id: Uuid, quantity: i64) -> NewOrderedProduct {
    NewOrderedProduct {
        id: Uuid::new_v4(),
        product_id,
        quantity,
        price: Decimal::new(500, 2),
        discount_type: Some(DiscountType::Percentage),
        discount_amount: Some(Decimal::new(10, 0)),
        tax_type: None,
        tax_amount: None,
        total_cost: Decimal::new(450, 2) * Decimal::from(quantity),
    }
}

fn order(order_type: OrderType, items: Vec<NewOrderedProduct>) -> NewOrder {
    NewOrder {
        id: Uuid::new_v4(),
        business_id: Uuid::new_v4(),
        order_type,
        sub_type: None,
        status: OrderStatus::New,
        additional_data: serde_json::json!({ "note": "test" }),
        items,
    }
}

fn all_orders() -> QueryDescriptor {
    QueryDescriptor {
        resource: ResourceKind::Order,
        scope: RecordScope::unrestricted(),
        visible_business_types: None,
        business_type: None,
        order_type: None,
        status: None,
        search: None,
        from: None,
        before: None,
        sort: Sort {
            column: "created_at",
            direction: SortDirection::Desc,
        },
        pagination: Pagination::default(),
    }
}

#[tokio::test]
async fn commit_writes_orders_lines_and_decrements_stock() {
    let f = setup().await;
    let a = f.product("A", 10).await;
    let b = f.product("B", 4).await;

    let booked = order(OrderType::Booked, vec![line(a.id, 3), line(b.id, 4)]);
    let requested = order(OrderType::Requested, vec![line(a.id, 50)]);
    let plan = f.plan(
        vec![booked.clone(), requested.clone()],
        vec![
            StockDemand {
                product_id: a.id,
                quantity: 3,
            },
            StockDemand {
                product_id: b.id,
                quantity: 4,
            },
        ],
    );

    let orders = f.orders.commit_batch(&plan).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id, booked.id);
    assert_eq!(orders[0].items.len(), 2);
    assert_eq!(orders[0].items[0].product_id, a.id);
    assert_eq!(orders[0].items[1].total_cost, Decimal::new(1800, 2));
    assert_eq!(orders[0].created_by, f.actor_id);
    assert_eq!(orders[0].tenant_id, f.tenant_id);
    assert_eq!(orders[1].items[0].quantity, 50);

    assert_eq!(f.stock(a.id).await, 7);
    assert_eq!(f.stock(b.id).await, 0);
}

#[tokio::test]
async fn refused_guard_rolls_back_everything() {
    let f = setup().await;
    let a = f.product("A", 10).await;
    let b = f.product("B", 1).await;

    let booked = order(OrderType::Booked, vec![line(a.id, 5), line(b.id, 2)]);
    let plan = f.plan(
        vec![booked.clone()],
        vec![
            StockDemand {
                product_id: a.id,
                quantity: 5,
            },
            StockDemand {
                product_id: b.id,
                quantity: 2,
            },
        ],
    );

    let err = f.orders.commit_batch(&plan).await.unwrap_err();
    assert!(matches!(err, StocklineError::Conflict { .. }), "{err:?}");

    assert_eq!(f.stock(a.id).await, 10);
    assert_eq!(f.stock(b.id).await, 1);
    let err = f.orders.get_by_id(booked.id).await.unwrap_err();
    assert!(matches!(err, StocklineError::NotFound { .. }));
    assert_eq!(f.orders.list(&all_orders()).await.unwrap().total, 0);
}

#[tokio::test]
async fn guard_ignores_products_of_other_tenants() {
    let f = setup().await;
    let other = setup_product_elsewhere(&f).await;

    let plan = f.plan(
        vec![order(OrderType::Booked, vec![line(other.id, 1)])],
        vec![StockDemand {
            product_id: other.id,
            quantity: 1,
        }],
    );
    assert!(f.orders.commit_batch(&plan).await.is_err());
    assert_eq!(f.stock(other.id).await, 5);
}

async fn setup_product_elsewhere(f: &Fixture) -> Product {
    f.products
        .create(
            CreateProduct {
                tenant_id: Uuid::new_v4(),
                code: "X".into(),
                name: "X".into(),
                description: None,
                quantity: 5,
                mrp: Decimal::ONE,
                discount_type: None,
                discount_amount: None,
                tax_type: None,
                tax_amount: None,
                image_link: None,
                image_path: None,
                additional_data: None,
            },
            f.actor_id,
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn status_update_is_compare_and_set() {
    let f = setup().await;
    let a = f.product("A", 1).await;
    let requested = order(OrderType::Requested, vec![line(a.id, 1)]);
    f.orders
        .commit_batch(&f.plan(vec![requested.clone()], Vec::new()))
        .await
        .unwrap();

    let moved = f
        .orders
        .update_status(requested.id, OrderStatus::New, OrderStatus::InProgress, f.actor_id)
        .await
        .unwrap();
    assert_eq!(moved.status, OrderStatus::InProgress);

    // A second writer still believing the order is New loses.
    let err = f
        .orders
        .update_status(requested.id, OrderStatus::New, OrderStatus::Cancelled, f.actor_id)
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::Conflict { .. }), "{err:?}");

    let err = f
        .orders
        .update_status(Uuid::new_v4(), OrderStatus::New, OrderStatus::Done, f.actor_id)
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::NotFound { .. }));
}

#[tokio::test]
async fn update_and_soft_delete_order() {
    let f = setup().await;
    let a = f.product("A", 1).await;
    let requested = order(OrderType::Requested, vec![line(a.id, 1)]);
    f.orders
        .commit_batch(&f.plan(vec![requested.clone()], Vec::new()))
        .await
        .unwrap();

    let updated = f
        .orders
        .update(
            requested.id,
            UpdateOrder {
                sub_type: Some("Express".into()),
                additional_data: None,
            },
            f.actor_id,
        )
        .await
        .unwrap();
    assert_eq!(updated.sub_type.as_deref(), Some("Express"));
    assert_eq!(updated.additional_data["note"], "test");

    f.orders.delete(requested.id, f.actor_id).await.unwrap();
    assert!(f.orders.get_by_id(requested.id).await.is_err());
    assert!(f.orders.delete(requested.id, f.actor_id).await.is_err());
    assert_eq!(f.orders.list(&all_orders()).await.unwrap().total, 0);
}

#[tokio::test]
async fn list_paginates_with_total_and_lines() {
    let f = setup().await;
    let a = f.product("A", 1).await;
    for _ in 0..3 {
        f.orders
            .commit_batch(&f.plan(
                vec![order(OrderType::Requested, vec![line(a.id, 1), line(a.id, 2)])],
                Vec::new(),
            ))
            .await
            .unwrap();
    }

    let mut query = all_orders();
    query.pagination = Pagination {
        offset: 0,
        limit: 2,
    };
    let first = f.orders.list(&query).await.unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.items.len(), 2);
    assert!(first.items.iter().all(|o| o.items.len() == 2));

    query.pagination.offset = 2;
    let second = f.orders.list(&query).await.unwrap();
    assert_eq!(second.items.len(), 1);
    assert!(first.items.iter().all(|o| o.id != second.items[0].id));
}
