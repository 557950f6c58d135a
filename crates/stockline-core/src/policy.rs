//! Access policy: the single decision table mapping an actor and a
//! resource/action pair to the rows the actor may touch.
//!
//! Every read and write path asks this module. Anything the table does
//! not grant explicitly is [`Scope::Denied`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Actor;
use crate::error::{StocklineError, StocklineResult};
use crate::models::business::BusinessType;
use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Tenant,
    Business,
    User,
    Product,
    Order,
}

impl ResourceKind {
    pub const fn entity(self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::Business => "business",
            Self::User => "user",
            Self::Product => "product",
            Self::Order => "order",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    ChangeStatus,
}

/// Breadth of rows an actor may touch, narrowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scope {
    Denied,
    OwnBusinessOnly,
    OwnTenantOnly,
    AllTenants,
}

/// Tenant/business coordinates of a concrete row.
///
/// For a tenant row `tenant_id` is its own id; for a business row
/// `business_id` is its own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub tenant_id: Uuid,
    pub business_id: Option<Uuid>,
}

impl Target {
    pub const fn tenant(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            business_id: None,
        }
    }

    pub const fn business(tenant_id: Uuid, business_id: Uuid) -> Self {
        Self {
            tenant_id,
            business_id: Some(business_id),
        }
    }
}

/// Concrete row restriction derived from a [`Scope`] and an actor.
/// `None` fields are unrestricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordScope {
    pub tenant_id: Option<Uuid>,
    pub business_id: Option<Uuid>,
}

impl RecordScope {
    pub const fn unrestricted() -> Self {
        Self {
            tenant_id: None,
            business_id: None,
        }
    }

    pub const fn tenant(tenant_id: Uuid) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            business_id: None,
        }
    }

    pub fn covers(&self, target: Target) -> bool {
        let tenant_ok = self.tenant_id.is_none_or(|t| t == target.tenant_id);
        let business_ok = self
            .business_id
            .is_none_or(|b| target.business_id == Some(b));
        tenant_ok && business_ok
    }
}

impl Scope {
    pub fn covers(self, actor: &Actor, target: Target) -> bool {
        match self {
            Self::Denied => false,
            Self::AllTenants => true,
            Self::OwnTenantOnly => target.tenant_id == actor.tenant_id,
            Self::OwnBusinessOnly => {
                target.tenant_id == actor.tenant_id
                    && actor.business_id.is_some()
                    && target.business_id == actor.business_id
            }
        }
    }

    /// Turn the scope into the row restriction the store applies.
    pub fn restrict(self, actor: &Actor) -> StocklineResult<RecordScope> {
        match self {
            Self::Denied => Err(StocklineError::denied("operation not permitted for role")),
            Self::AllTenants => Ok(RecordScope::unrestricted()),
            Self::OwnTenantOnly => Ok(RecordScope::tenant(actor.tenant_id)),
            Self::OwnBusinessOnly => match actor.business_id {
                Some(business_id) => Ok(RecordScope {
                    tenant_id: Some(actor.tenant_id),
                    business_id: Some(business_id),
                }),
                None => Err(StocklineError::denied("actor has no business")),
            },
        }
    }
}

/// Target of a user create/update/delete.
#[derive(Debug, Clone, Copy)]
pub struct UserTarget {
    /// Existing user id; `None` when creating.
    pub id: Option<Uuid>,
    pub tenant_id: Uuid,
    pub business_id: Option<Uuid>,
    pub role: Role,
}

const WHOLESALER_VISIBLE: &[BusinessType] = &[BusinessType::Wholesaler, BusinessType::Dealer];

/// The decision table.
pub struct AccessPolicy;

impl AccessPolicy {
    /// Scope granted to `actor` for `action` on `resource`, before any
    /// concrete row is considered.
    pub fn scope(actor: &Actor, resource: ResourceKind, action: Action) -> Scope {
        use Action::{ChangeStatus, Create, Delete, Read, Update};
        use ResourceKind as R;

        let role = actor.role;
        match (resource, action) {
            (_, Read) => Self::read_scope(role, resource),

            (R::Tenant, Create | Update | Delete) => match role {
                Role::SuperAdmin | Role::TechAdmin => Scope::AllTenants,
                _ => Scope::Denied,
            },

            (R::Business, Create | Update | Delete) => match role {
                Role::SuperAdmin | Role::TechAdmin => Scope::AllTenants,
                Role::WholesalerAdmin => Scope::OwnTenantOnly,
                _ => Scope::Denied,
            },

            (R::User, Create | Update | Delete) => match role {
                r if r.is_cross_tenant() => Scope::AllTenants,
                Role::WholesalerAdmin => Scope::OwnTenantOnly,
                Role::DealerAdmin => Scope::OwnBusinessOnly,
                _ => Scope::Denied,
            },

            (R::Product, Create | Update | Delete) => match role {
                r if r.is_cross_tenant() => Scope::AllTenants,
                r if r.is_wholesaler() => Scope::OwnTenantOnly,
                _ => Scope::Denied,
            },

            (R::Order, Create) => match role {
                r if r.is_cross_tenant() => Scope::AllTenants,
                r if r.is_wholesaler() => Scope::OwnTenantOnly,
                _ => Scope::OwnBusinessOnly,
            },

            (R::Order, Update | Delete | ChangeStatus) => match role {
                r if r.is_cross_tenant() => Scope::AllTenants,
                r if r.is_wholesaler() => Scope::OwnTenantOnly,
                _ => Scope::Denied,
            },

            (_, ChangeStatus) => Scope::Denied,
        }
    }

    fn read_scope(role: Role, resource: ResourceKind) -> Scope {
        if role.is_cross_tenant() {
            return Scope::AllTenants;
        }
        match resource {
            ResourceKind::Tenant | ResourceKind::Product => Scope::OwnTenantOnly,
            ResourceKind::Business | ResourceKind::User | ResourceKind::Order => {
                if role.is_wholesaler() {
                    Scope::OwnTenantOnly
                } else {
                    Scope::OwnBusinessOnly
                }
            }
        }
    }

    /// Scope for a concrete row: [`Scope::Denied`] when the row falls
    /// outside what [`AccessPolicy::scope`] grants.
    pub fn decide(
        actor: &Actor,
        resource: ResourceKind,
        action: Action,
        target: Option<Target>,
    ) -> Scope {
        let scope = Self::scope(actor, resource, action);
        match target {
            Some(target) if !scope.covers(actor, target) => Scope::Denied,
            _ => scope,
        }
    }

    pub fn authorize(
        actor: &Actor,
        resource: ResourceKind,
        action: Action,
        target: Option<Target>,
    ) -> StocklineResult<Scope> {
        match Self::decide(actor, resource, action, target) {
            Scope::Denied => Err(StocklineError::denied(format!(
                "{:?} {:?} not permitted for {}",
                action,
                resource,
                actor.role
            ))),
            scope => Ok(scope),
        }
    }

    /// Authorize and resolve the row restriction in one step.
    pub fn record_scope(
        actor: &Actor,
        resource: ResourceKind,
        action: Action,
    ) -> StocklineResult<RecordScope> {
        Self::authorize(actor, resource, action, None)?.restrict(actor)
    }

    /// Business types whose users `actor` may see; `None` means no
    /// restriction beyond the scope.
    pub fn visible_business_types(
        actor: &Actor,
        resource: ResourceKind,
    ) -> Option<&'static [BusinessType]> {
        (resource == ResourceKind::User && actor.role.is_wholesaler()).then_some(WHOLESALER_VISIBLE)
    }

    pub fn may_assign_role(actor: &Actor, role: Role) -> bool {
        match actor.role {
            r if r.is_cross_tenant() => true,
            Role::WholesalerAdmin => !role.is_cross_tenant(),
            Role::DealerAdmin => role == Role::Dealer,
            _ => false,
        }
    }

    /// Tenant a new order is booked into. Only cross-tenant roles may
    /// pick one; everybody else is pinned to their own.
    pub fn order_tenant(actor: &Actor, requested: Option<Uuid>) -> Uuid {
        match requested {
            Some(tenant_id) if actor.role.is_cross_tenant() => tenant_id,
            _ => actor.tenant_id,
        }
    }

    /// Full check for creating, updating or deleting a user.
    pub fn authorize_user_write(
        actor: &Actor,
        action: Action,
        target: UserTarget,
    ) -> StocklineResult<()> {
        if action == Action::Delete && target.id == Some(actor.id) {
            return Err(StocklineError::denied("users cannot delete their own account"));
        }
        let row = Target {
            tenant_id: target.tenant_id,
            business_id: target.business_id,
        };
        Self::authorize(actor, ResourceKind::User, action, Some(row))?;
        if !Self::may_assign_role(actor, target.role) {
            return Err(StocklineError::denied(format!(
                "{} may not manage {} users",
                actor.role, target.role
            )));
        }
        Ok(())
    }
}
