//! Query scoping: turns an access decision plus raw, user-supplied list
//! filters into a validated [`QueryDescriptor`] the store can execute.
//!
//! Sort keys are checked against a per-resource allow-list; an unknown
//! key falls back to `created_at` instead of reaching the store.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Actor;
use crate::error::{StocklineError, StocklineResult};
use crate::models::business::BusinessType;
use crate::models::order::{OrderStatus, OrderType};
use crate::models::user::UserStatus;
use crate::policy::{AccessPolicy, Action, RecordScope, ResourceKind};
use crate::repository::Pagination;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;
pub const DEFAULT_SORT_COLUMN: &str = "created_at";

/// Status value meaning "do not filter by status".
pub const STATUS_ANY: &str = "all";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw list filters as they arrive from a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListFilters {
    /// Only honored for actors whose scope spans all tenants.
    pub tenant_id: Option<Uuid>,
    /// Business type for businesses, order type for orders.
    pub kind: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`, inclusive of the whole day.
    pub end_date: Option<String>,
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub order: Option<String>,
    /// 1-based.
    pub page: Option<u64>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A sort column proven to be on the resource's allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub column: &'static str,
    pub direction: SortDirection,
}

/// Bounded, validated description of one list query.
///
/// Executing it must return only non-deleted rows inside `scope`,
/// ordered by `sort` with ties broken by primary key, plus the total
/// row count for the same filter without pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub resource: ResourceKind,
    pub scope: RecordScope,
    /// Users only: restrict to users attached to businesses of these types.
    pub visible_business_types: Option<&'static [BusinessType]>,
    pub business_type: Option<BusinessType>,
    pub order_type: Option<OrderType>,
    pub status: Option<String>,
    /// Lower-cased search term.
    pub search: Option<String>,
    /// Inclusive lower bound on the resource's date column.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the resource's date column.
    pub before: Option<DateTime<Utc>>,
    pub sort: Sort,
    pub pagination: Pagination,
}

impl ResourceKind {
    /// Column the date range applies to.
    pub const fn date_column(self) -> &'static str {
        match self {
            Self::Order => "order_date_time",
            _ => "created_at",
        }
    }

    /// Columns matched by the free-text search.
    pub const fn search_columns(self) -> &'static [&'static str] {
        match self {
            Self::Tenant => &["name"],
            Self::Business => &["name", "email"],
            Self::User => &["name", "username", "email"],
            Self::Product => &["code", "name"],
            Self::Order => &[],
        }
    }

    /// Column holding the owning tenant; `None` when the row is the tenant.
    pub const fn tenant_column(self) -> Option<&'static str> {
        match self {
            Self::Tenant => None,
            _ => Some("tenant_id"),
        }
    }

    /// Column holding the owning business; `None` when the row is the
    /// business itself or has no business.
    pub const fn business_column(self) -> Option<&'static str> {
        match self {
            Self::User | Self::Order => Some("business_id"),
            _ => None,
        }
    }

    /// Column holding the free-text status, if the resource has one.
    pub const fn status_column(self) -> Option<&'static str> {
        match self {
            Self::Tenant | Self::Business | Self::User => Some("status"),
            Self::Order => Some("order_status"),
            Self::Product => None,
        }
    }

    /// Sortable columns, keyed by normalised name (lower case, no `_`).
    const fn sortable_columns(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Tenant => &[
                ("name", "name"),
                ("tenantname", "name"),
                ("status", "status"),
                ("tenantstatus", "status"),
                ("tenanttype", "tenant_type"),
                ("createdat", "created_at"),
                ("updatedat", "updated_at"),
                ("modifiedat", "updated_at"),
            ],
            Self::Business => &[
                ("name", "name"),
                ("type", "business_type"),
                ("businesstype", "business_type"),
                ("status", "status"),
                ("createdat", "created_at"),
                ("updatedat", "updated_at"),
                ("modifiedat", "updated_at"),
            ],
            Self::User => &[
                ("name", "name"),
                ("username", "username"),
                ("email", "email"),
                ("role", "role"),
                ("status", "status"),
                ("userstatus", "status"),
                ("createdat", "created_at"),
                ("updatedat", "updated_at"),
                ("modifiedat", "updated_at"),
            ],
            Self::Product => &[
                ("code", "code"),
                ("productid", "code"),
                ("name", "name"),
                ("quantity", "quantity"),
                ("createdat", "created_at"),
                ("updatedat", "updated_at"),
                ("modifiedat", "updated_at"),
            ],
            Self::Order => &[
                ("orderdatetime", "order_date_time"),
                ("status", "order_status"),
                ("orderstatus", "order_status"),
                ("type", "order_type"),
                ("ordertype", "order_type"),
                ("businessid", "business_id"),
                ("createdat", "created_at"),
                ("updatedat", "updated_at"),
                ("modifiedat", "updated_at"),
            ],
        }
    }

    /// Resolve a caller-supplied sort key; unknown keys fall back to
    /// [`DEFAULT_SORT_COLUMN`].
    pub fn sort_column(self, key: Option<&str>) -> &'static str {
        let Some(key) = key else {
            return DEFAULT_SORT_COLUMN;
        };
        let normalised: String = key
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        self.sortable_columns()
            .iter()
            .find(|(name, _)| *name == normalised)
            .map_or(DEFAULT_SORT_COLUMN, |(_, column)| column)
    }
}

/// Builder entry point.
pub struct QueryScope;

impl QueryScope {
    /// Authorize a read of `resource` for `actor` and build the scoped
    /// descriptor for `filters`.
    pub fn build(
        actor: &Actor,
        resource: ResourceKind,
        filters: &ListFilters,
    ) -> StocklineResult<QueryDescriptor> {
        let mut scope = AccessPolicy::record_scope(actor, resource, Action::Read)?;

        // A tenant filter can only narrow an unrestricted scope.
        if scope.tenant_id.is_none() {
            scope.tenant_id = filters.tenant_id;
        }

        let (business_type, order_type) = match (resource, non_empty(filters.kind.as_deref())) {
            (ResourceKind::Business, Some(kind)) => (Some(kind.parse()?), None),
            (ResourceKind::Order, Some(kind)) => (None, Some(kind.parse()?)),
            _ => (None, None),
        };

        let (from, before) = date_range(filters.start_date.as_deref(), filters.end_date.as_deref())?;

        Ok(QueryDescriptor {
            resource,
            scope,
            visible_business_types: AccessPolicy::visible_business_types(actor, resource),
            business_type,
            order_type,
            status: status_filter(resource, filters.status.as_deref())?,
            search: non_empty(filters.search.as_deref())
                .filter(|_| !resource.search_columns().is_empty())
                .map(str::to_lowercase),
            from,
            before,
            sort: Sort {
                column: resource.sort_column(filters.sort_by.as_deref()),
                direction: sort_direction(filters.order.as_deref())?,
            },
            pagination: pagination(filters.page, filters.size)?,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn status_filter(resource: ResourceKind, raw: Option<&str>) -> StocklineResult<Option<String>> {
    let Some(raw) = non_empty(raw).filter(|s| !s.eq_ignore_ascii_case(STATUS_ANY)) else {
        return Ok(None);
    };
    let status = match resource {
        ResourceKind::Order => raw.parse::<OrderStatus>()?.as_str().to_string(),
        ResourceKind::User => raw.parse::<UserStatus>()?.as_str().to_string(),
        ResourceKind::Tenant | ResourceKind::Business => raw.to_string(),
        ResourceKind::Product => return Ok(None),
    };
    Ok(Some(status))
}

fn parse_date(raw: &str, field: &str) -> StocklineResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
        StocklineError::validation(format!("{field} must be YYYY-MM-DD, got {raw:?}: {e}"))
    })
}

/// Inclusive start at 00:00 of `start`, exclusive end at 00:00 of the
/// day after `end`.
fn date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> StocklineResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let start = non_empty(start)
        .map(|raw| parse_date(raw, "start_date"))
        .transpose()?;
    let end = non_empty(end)
        .map(|raw| parse_date(raw, "end_date"))
        .transpose()?;

    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(StocklineError::validation(format!(
                "start_date {s} is after end_date {e}"
            )));
        }
    }

    let from = start.map(|d| d.and_time(NaiveTime::MIN).and_utc());
    let before = end
        .map(|d| {
            d.succ_opt()
                .map(|next| next.and_time(NaiveTime::MIN).and_utc())
                .ok_or_else(|| StocklineError::validation(format!("end_date {d} out of range")))
        })
        .transpose()?;
    Ok((from, before))
}

fn sort_direction(raw: Option<&str>) -> StocklineResult<SortDirection> {
    match non_empty(raw) {
        None => Ok(SortDirection::Desc),
        Some(v) if v.eq_ignore_ascii_case("desc") => Ok(SortDirection::Desc),
        Some(v) if v.eq_ignore_ascii_case("asc") => Ok(SortDirection::Asc),
        Some(v) => Err(StocklineError::validation(format!(
            "order must be asc or desc, got {v:?}"
        ))),
    }
}

fn pagination(page: Option<u64>, size: Option<u64>) -> StocklineResult<Pagination> {
    let page = page.unwrap_or(1);
    let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page == 0 {
        return Err(StocklineError::validation("page starts at 1"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&size) {
        return Err(StocklineError::validation(format!(
            "size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    let offset = (page - 1)
        .checked_mul(size)
        .ok_or_else(|| StocklineError::validation("page out of range"))?;
    Ok(Pagination {
        offset,
        limit: size,
    })
}
