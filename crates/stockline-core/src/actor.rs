//! The authenticated caller every core operation runs on behalf of.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{Role, User};

/// Authenticated actor, resolved before any core operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub tenant_id: Uuid,
    /// `None` for cross-tenant roles.
    pub business_id: Option<Uuid>,
}

impl Actor {
    pub const fn new(id: Uuid, role: Role, tenant_id: Uuid, business_id: Option<Uuid>) -> Self {
        Self {
            id,
            role,
            tenant_id,
            business_id,
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role, user.tenant_id, user.business_id)
    }
}
