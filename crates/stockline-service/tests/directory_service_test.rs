//! Integration tests for the directory service: tenant, business, user
//! and product management under the access policy.

mod common;

use common::{Fixture, business_input, setup};
use stockline_core::error::StocklineError;
use stockline_core::models::business::{BusinessType, UpdateBusiness};
use stockline_core::models::tenant::UpdateTenant;
use stockline_core::models::user::{CreateUser, Role, UpdateUser, User};
use stockline_core::query::ListFilters;
use uuid::Uuid;

fn user_input(f: &Fixture, username: &str, role: Role, business_id: Option<Uuid>) -> CreateUser {
    CreateUser {
        tenant_id: f.tenant.id,
        business_id,
        role,
        username: username.into(),
        email: format!("{username}@example.com"),
        password: "correct horse battery staple".into(),
        name: username.into(),
        phone_number: None,
        address_line1: None,
        address_line2: None,
        description: None,
    }
}

async fn user(f: &Fixture, username: &str, role: Role, business_id: Option<Uuid>) -> User {
    f.directory
        .create_user(&f.admin, user_input(f, username, role, business_id))
        .await
        .unwrap()
}

#[tokio::test]
async fn wholesaler_admin_cannot_create_dealer_in_foreign_business() {
    let f = setup().await;
    let elsewhere = common::create_tenant(&f.directory, &f.admin, "Elsewhere").await;
    let foreign =
        common::create_business(&f.directory, &f.admin, elsewhere.id, BusinessType::Dealer, "Far")
            .await;

    let mut input = user_input(&f, "intruder", Role::Dealer, Some(foreign.id));
    let err = f
        .directory
        .create_user(&f.wholesaler_admin(), input.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::AuthorizationDenied { .. }), "{err:?}");

    input.tenant_id = elsewhere.id;
    let err = f
        .directory
        .create_user(&f.wholesaler_admin(), input)
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::AuthorizationDenied { .. }), "{err:?}");
}

#[tokio::test]
async fn wholesaler_admin_creates_dealers_in_own_tenant() {
    let f = setup().await;
    let created = f
        .directory
        .create_user(
            &f.wholesaler_admin(),
            user_input(&f, "north.dealer", Role::Dealer, Some(f.dealer.id)),
        )
        .await
        .unwrap();
    assert_eq!(created.tenant_id, f.tenant.id);
    assert_eq!(created.business_id, Some(f.dealer.id));

    let err = f
        .directory
        .create_user(
            &f.wholesaler_admin(),
            user_input(&f, "boss", Role::TechAdmin, None),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn role_and_business_must_pair() {
    let f = setup().await;
    for input in [
        user_input(&f, "floating", Role::Dealer, None),
        user_input(&f, "attached", Role::SalesAdmin, Some(f.dealer.id)),
    ] {
        let err = f.directory.create_user(&f.admin, input).await.unwrap_err();
        assert!(matches!(err, StocklineError::Validation { .. }), "{err:?}");
    }
}

#[tokio::test]
async fn admin_gets_validation_for_mismatched_business_tenant() {
    let f = setup().await;
    let elsewhere = common::create_tenant(&f.directory, &f.admin, "Elsewhere").await;
    let mut input = user_input(&f, "mismatch", Role::Dealer, Some(f.dealer.id));
    input.tenant_id = elsewhere.id;

    let err = f.directory.create_user(&f.admin, input).await.unwrap_err();
    assert!(matches!(err, StocklineError::Validation { .. }));
}

#[tokio::test]
async fn dealer_admin_manages_own_dealers_only() {
    let f = setup().await;
    let dealer_admin = f.actor(Role::DealerAdmin, Some(&f.dealer));

    let created = f
        .directory
        .create_user(
            &dealer_admin,
            user_input(&f, "clerk", Role::Dealer, Some(f.dealer.id)),
        )
        .await
        .unwrap();

    let err = f
        .directory
        .create_user(
            &dealer_admin,
            user_input(&f, "stranger", Role::Dealer, Some(f.other_dealer.id)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::AuthorizationDenied { .. }));

    let err = f
        .directory
        .update_user(
            &dealer_admin,
            created.id,
            UpdateUser {
                role: Some(Role::DealerAdmin),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::AuthorizationDenied { .. }));

    f.directory.delete_user(&dealer_admin, created.id).await.unwrap();
    let err = f.directory.get_user(&f.admin, created.id).await.unwrap_err();
    assert!(matches!(err, StocklineError::NotFound { .. }));
}

#[tokio::test]
async fn nobody_deletes_their_own_account() {
    let f = setup().await;
    let me = user(&f, "me", Role::WholesalerAdmin, Some(f.wholesaler.id)).await;
    let actor = stockline_core::actor::Actor::from(&me);

    let err = f.directory.delete_user(&actor, me.id).await.unwrap_err();
    assert!(matches!(err, StocklineError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn wholesalers_see_only_trading_users() {
    let f = setup().await;
    let staff = user(&f, "tech", Role::TechAdmin, None).await;
    let dealer = user(&f, "dealer", Role::Dealer, Some(f.dealer.id)).await;
    let colleague = user(&f, "colleague", Role::Wholesaler, Some(f.wholesaler.id)).await;

    let wholesaler = f.actor(Role::Wholesaler, Some(&f.wholesaler));
    let listed = f
        .directory
        .list_users(&wholesaler, &ListFilters::default())
        .await
        .unwrap();
    let mut ids: Vec<Uuid> = listed.items.iter().map(|u| u.id).collect();
    ids.sort();
    let mut expected = vec![dealer.id, colleague.id];
    expected.sort();
    assert_eq!(ids, expected);

    let err = f.directory.get_user(&wholesaler, staff.id).await.unwrap_err();
    assert!(matches!(err, StocklineError::NotFound { .. }));
    assert_eq!(
        f.directory.get_user(&wholesaler, dealer.id).await.unwrap().id,
        dealer.id
    );
}

#[tokio::test]
async fn dealers_see_users_of_their_business() {
    let f = setup().await;
    let mine = user(&f, "mine", Role::Dealer, Some(f.dealer.id)).await;
    user(&f, "theirs", Role::Dealer, Some(f.other_dealer.id)).await;

    let listed = f
        .directory
        .list_users(&f.dealer_actor(), &ListFilters::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].id, mine.id);
}

#[tokio::test]
async fn second_wholesaler_in_a_tenant_conflicts() {
    let f = setup().await;
    let err = f
        .directory
        .create_business(
            &f.admin,
            business_input(f.tenant.id, BusinessType::Wholesaler, "Rival"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::Conflict { .. }));

    let err = f
        .directory
        .update_business(
            &f.admin,
            f.dealer.id,
            UpdateBusiness {
                business_type: Some(BusinessType::Wholesaler),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::Conflict { .. }));
}

#[tokio::test]
async fn wholesaler_admin_manages_businesses_of_own_tenant() {
    let f = setup().await;
    let admin = f.wholesaler_admin();

    let created = f
        .directory
        .create_business(&admin, business_input(f.tenant.id, BusinessType::Dealer, "East"))
        .await
        .unwrap();
    let renamed = f
        .directory
        .update_business(
            &admin,
            created.id,
            UpdateBusiness {
                name: Some("East Side".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "East Side");

    let elsewhere = common::create_tenant(&f.directory, &f.admin, "Elsewhere").await;
    let err = f
        .directory
        .create_business(&admin, business_input(elsewhere.id, BusinessType::Dealer, "West"))
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::AuthorizationDenied { .. }));

    f.directory.delete_business(&admin, created.id).await.unwrap();
    let listed = f
        .directory
        .list_businesses(
            &admin,
            &ListFilters {
                kind: Some("DEALER".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listed.total, 2);
    assert!(listed.items.iter().all(|b| b.business_type == BusinessType::Dealer));
}

#[tokio::test]
async fn tenant_management_is_admin_only() {
    let f = setup().await;
    let err = f
        .directory
        .update_tenant(
            &f.wholesaler_admin(),
            f.tenant.id,
            UpdateTenant {
                name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::AuthorizationDenied { .. }));

    let tech = stockline_core::actor::Actor::new(Uuid::new_v4(), Role::TechAdmin, Uuid::new_v4(), None);
    let renamed = f
        .directory
        .update_tenant(
            &tech,
            f.tenant.id,
            UpdateTenant {
                name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Renamed");

    let dealer = f.dealer_actor();
    let own = f.directory.list_tenants(&dealer, &ListFilters::default()).await.unwrap();
    assert_eq!(own.total, 1);
    assert_eq!(own.items[0].id, f.tenant.id);
}

#[tokio::test]
async fn tenant_detail_lists_visible_businesses() {
    let f = setup().await;
    let other = common::create_tenant(&f.directory, &f.admin, "Globex").await;
    common::create_business(&f.directory, &f.admin, other.id, BusinessType::Dealer, "Elsewhere")
        .await;

    let detail = f.directory.get_tenant_detail(&f.admin, f.tenant.id).await.unwrap();
    assert_eq!(detail.tenant.id, f.tenant.id);
    assert_eq!(detail.wholesaler.map(|b| b.id), Some(f.wholesaler.id));
    let dealers: Vec<_> = detail.dealers.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(dealers, vec!["North", "South"]);

    let detail = f
        .directory
        .get_tenant_detail(&f.wholesaler_admin(), f.tenant.id)
        .await
        .unwrap();
    assert!(detail.wholesaler.is_some());
    assert_eq!(detail.dealers.len(), 2);

    let detail = f
        .directory
        .get_tenant_detail(&f.dealer_actor(), f.tenant.id)
        .await
        .unwrap();
    assert!(detail.wholesaler.is_none());
    let dealers: Vec<_> = detail.dealers.iter().map(|b| b.id).collect();
    assert_eq!(dealers, vec![f.dealer.id]);

    let err = f
        .directory
        .get_tenant_detail(&f.dealer_actor(), other.id)
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::NotFound { .. }));
}

#[tokio::test]
async fn products_are_managed_by_wholesalers_and_read_by_dealers() {
    let f = setup().await;
    let p = f.product("CAT-1", 3).await;
    let dealer = f.dealer_actor();

    assert_eq!(f.directory.get_product(&dealer, p.id).await.unwrap().id, p.id);
    let err = f.directory.adjust_stock(&dealer, p.id, 5).await.unwrap_err();
    assert!(matches!(err, StocklineError::AuthorizationDenied { .. }));

    let wholesaler = f.actor(Role::Wholesaler, Some(&f.wholesaler));
    let err = f
        .directory
        .adjust_stock(&wholesaler, p.id, -4)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StocklineError::InsufficientStock {
            requested: 4,
            available: 3,
            ..
        }
    ));
    let err = f.directory.adjust_stock(&wholesaler, p.id, 0).await.unwrap_err();
    assert!(matches!(err, StocklineError::Validation { .. }));

    assert_eq!(
        f.directory.adjust_stock(&wholesaler, p.id, -3).await.unwrap().quantity,
        0
    );

    let elsewhere = common::create_tenant(&f.directory, &f.admin, "Elsewhere").await;
    let foreign = f.product_in(elsewhere.id, "CAT-2", 9).await;
    let err = f.directory.get_product(&dealer, foreign.id).await.unwrap_err();
    assert!(matches!(err, StocklineError::NotFound { .. }));
    let err = f
        .directory
        .adjust_stock(&wholesaler, foreign.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::NotFound { .. }));
    assert_eq!(f.stock(foreign.id).await, 9);
}

#[tokio::test]
async fn product_search_and_paging() {
    let f = setup().await;
    for n in 0..5 {
        f.product(&format!("BOLT-{n}"), 1).await;
    }
    f.product("NUT-1", 1).await;

    let page = f
        .directory
        .list_products(
            &f.dealer_actor(),
            &ListFilters {
                search: Some("bolt".into()),
                sort_by: Some("code".into()),
                order: Some("asc".into()),
                page: Some(2),
                size: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.offset, 2);
    let codes: Vec<&str> = page.items.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(codes, vec!["BOLT-2", "BOLT-3"]);

    let err = f
        .directory
        .list_products(
            &f.dealer_actor(),
            &ListFilters {
                size: Some(500),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StocklineError::Validation { .. }));
}
