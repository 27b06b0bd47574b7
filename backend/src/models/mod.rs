//! Shared model primitives: pagination and money arithmetic

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Hard upper bound on page size
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationParams {
    /// Clamp raw parameters into a usable page request
    pub fn resolve(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), self.limit.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}

/// A clamped page request (1-based page)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> PaginatedResponse<T> {
    /// Slice an already filtered and ordered collection into a page
    pub fn from_vec(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len() as i64;
        let data = items
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit as usize)
            .collect();
        Self {
            data,
            total,
            page: request.page,
            limit: request.limit,
        }
    }
}

/// Round a monetary or score value to two decimals, half away from zero
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Reject amounts carrying sub-cent precision
pub fn ensure_cents(field: &str, amount: Decimal) -> ApiResult<()> {
    if amount.normalize().scale() > 2 {
        return Err(ApiError::BadRequest(format!(
            "{} must have at most 2 decimal places, got {}",
            field, amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_page_request_clamps() {
        let page = PageRequest::new(0, 500);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 0);

        let page = PageRequest::new(3, 10);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_from_vec_slices_and_counts() {
        let items: Vec<i32> = (1..=25).collect();
        let page = PaginatedResponse::from_vec(items, PageRequest::new(2, 10));
        assert_eq!(page.total, 25);
        assert_eq!(page.data, (11..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(Decimal::from_str("2.345").unwrap()), Decimal::from_str("2.35").unwrap());
        assert_eq!(round2(Decimal::from_str("2.344").unwrap()), Decimal::from_str("2.34").unwrap());
    }

    #[test]
    fn test_ensure_cents() {
        assert!(ensure_cents("amount", Decimal::from_str("950.00").unwrap()).is_ok());
        assert!(ensure_cents("amount", Decimal::from_str("950.1000").unwrap()).is_ok());
        let err = ensure_cents("amount", Decimal::from_str("950.005").unwrap()).unwrap_err();
        assert!(err.message().contains("950.005"));
    }
}
