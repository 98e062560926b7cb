//! Query parameter types for list endpoints.

use authapi_db::models::user::UserListFilter;
use serde::Deserialize;
use utoipa::IntoParams;

/// Page size when `limit` is omitted.
pub const DEFAULT_LIST_LIMIT: i64 = 50;
/// Largest accepted page size.
pub const MAX_LIST_LIMIT: i64 = 200;

/// Query parameters for `GET /admin/users`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminUserListParams {
    /// Case-insensitive substring of the email address.
    pub search: Option<String>,
    /// Only admins (`true`) or only regular users (`false`).
    pub is_admin: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AdminUserListParams {
    /// Repository filter with `limit` clamped to `1..=MAX_LIST_LIMIT` and a
    /// non-negative `offset`.
    pub fn to_filter(&self) -> UserListFilter {
        UserListFilter {
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            is_admin: self.is_admin,
            limit: self
                .limit
                .unwrap_or(DEFAULT_LIST_LIMIT)
                .clamp(1, MAX_LIST_LIMIT),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_params_are_absent() {
        let filter = AdminUserListParams::default().to_filter();
        assert_eq!(filter.limit, DEFAULT_LIST_LIMIT);
        assert_eq!(filter.offset, 0);
        assert!(filter.search.is_none());
    }

    #[test]
    fn limits_and_offsets_are_clamped() {
        let params = AdminUserListParams {
            limit: Some(10_000),
            offset: Some(-5),
            ..Default::default()
        };
        let filter = params.to_filter();
        assert_eq!(filter.limit, MAX_LIST_LIMIT);
        assert_eq!(filter.offset, 0);

        let zero = AdminUserListParams {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(zero.to_filter().limit, 1);
    }

    #[test]
    fn blank_search_is_ignored() {
        let params = AdminUserListParams {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(params.to_filter().search.is_none());
    }
}
