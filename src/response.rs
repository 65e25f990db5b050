//! JSON envelope shared by every endpoint.

use serde::Serialize;
use utoipa::ToSchema;

/// Paging information for list endpoints. All fields are absent on
/// single-object responses and errors.
#[derive(Debug, Serialize, ToSchema, Clone, Default)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }

    /// Wraps a `(page, meta)` pair as returned by the list services.
    pub fn paged(message: impl Into<String>, (data, meta): (T, Meta)) -> Self {
        Self::success(message, data, Some(meta))
    }

    /// Error envelope; `meta` is always present and empty.
    pub fn failure(message: impl Into<String>, data: T) -> Self {
        Self::success(message, data, Some(Meta::empty()))
    }
}
