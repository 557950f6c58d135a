//! Row conversion helpers shared by the repositories.

use std::str::FromStr;

use rust_decimal::Decimal;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

pub(crate) fn parse_uuid(value: &str, field: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::InvalidRow(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn parse_opt_uuid(value: Option<&str>, field: &str) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(v, field)).transpose()
}

pub(crate) fn parse_decimal(value: &str, field: &str) -> Result<Decimal, DbError> {
    Decimal::from_str(value).map_err(|e| DbError::InvalidRow(format!("invalid {field}: {e}")))
}

pub(crate) fn parse_opt_decimal(
    value: Option<&str>,
    field: &str,
) -> Result<Option<Decimal>, DbError> {
    value.map(|v| parse_decimal(v, field)).transpose()
}

/// Parse one of the closed string enums stored in a row.
pub(crate) fn parse_enum<T: FromStr>(value: &str, field: &str) -> Result<T, DbError> {
    value
        .parse()
        .map_err(|_| DbError::InvalidRow(format!("unknown {field}: {value}")))
}

pub(crate) fn opt_string(value: Option<impl ToString>) -> Option<String> {
    value.map(|v| v.to_string())
}

/// Map a failed multi-statement query to a domain error.
///
/// `markers` pairs a `THROW` message prefix with the conflict reason to
/// report; anything else that aborted the transaction is reported as
/// `fallback`.
pub(crate) fn classify_failure(
    detail: String,
    markers: &[(&str, &str)],
    fallback: fn(String) -> DbError,
) -> DbError {
    for (marker, reason) in markers {
        if detail.contains(marker) {
            return DbError::conflict(*reason);
        }
    }
    fallback(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thrown_markers_become_conflicts() {
        let err = classify_failure(
            "An error occurred: username_taken".into(),
            &[("username_taken", "username already in use")],
            DbError::Query,
        );
        assert!(matches!(err, DbError::Conflict { reason } if reason == "username already in use"));

        let err = classify_failure("disk full".into(), &[("x", "y")], DbError::Transaction);
        assert!(matches!(err, DbError::Transaction(_)));
    }

    #[test]
    fn decimals_keep_their_scale() {
        assert_eq!(parse_decimal("10.50", "price").unwrap().to_string(), "10.50");
        assert!(parse_decimal("ten", "price").is_err());
    }
}
