//! Page-number pagination for list endpoints.
//!
//! Lists are served in pages of `PAGE_SIZE` items selected with `?page=N` (1-based, `last`
//! accepted). Responses use the `{count, next, previous, results}` envelope where `next` and
//! `previous` are absolute URLs, or `null` at either end.

use axum::{
    extract::{FromRequestParts, Query},
    http::{Uri, header, request::Parts},
};
use serde::Serialize;
use std::convert::Infallible;
use utoipa::ToSchema;

use crate::error::ApiError;

/// Page size constant for all pagination
pub const PAGE_SIZE: i64 = 2;

const PAGE_PARAM: &str = "page";

/// Pagination metadata resolved for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Total number of pages, at least 1 so that an empty list still has a first page
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
    pub limit: i64,
}

/// Resolves a requested page against `total_results`.
///
/// Unlike clamping, an out-of-range or non-numeric page is an error: the client
/// asked for something that does not exist.
pub fn calculate_pagination(
    total_results: i64,
    requested_page: Option<&str>,
) -> Result<Pagination, ApiError> {
    let total_pages = ((total_results + PAGE_SIZE - 1) / PAGE_SIZE).max(1);

    let page = match requested_page {
        None | Some("") => 1,
        Some("last") => total_pages,
        Some(raw) => raw.parse::<i64>().map_err(|_| ApiError::InvalidPage)?,
    };

    if page < 1 || page > total_pages {
        return Err(ApiError::InvalidPage);
    }

    Ok(Pagination {
        page,
        total_pages,
        offset: (page - 1) * PAGE_SIZE,
        limit: PAGE_SIZE,
    })
}

/// Page
///
/// The envelope returned by every list endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// PageRequest
///
/// Extracts what pagination needs from a request: the `page` query parameter and enough of
/// the URL (host, path, other query parameters) to build absolute `next`/`previous` links.
#[derive(Debug, Clone)]
pub struct PageRequest {
    page: Option<String>,
    base_url: String,
    other_params: Vec<(String, String)>,
}

impl<S> FromRequestParts<S> for PageRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or("localhost");

        Ok(PageRequest::new(host, &parts.uri))
    }
}

impl PageRequest {
    pub fn new(host: &str, uri: &Uri) -> Self {
        let params = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map(|Query(params)| params)
            .unwrap_or_default();

        let mut page = None;
        let mut other_params = Vec::with_capacity(params.len());
        for (key, value) in params {
            if key == PAGE_PARAM {
                page = Some(value);
            } else {
                other_params.push((key, value));
            }
        }

        PageRequest {
            page,
            base_url: format!("http://{}{}", host, uri.path()),
            other_params,
        }
    }

    /// Validates the requested page against the number of available rows.
    pub fn resolve(&self, count: i64) -> Result<Pagination, ApiError> {
        calculate_pagination(count, self.page.as_deref())
    }

    /// Wraps one page of results in the envelope.
    pub fn page<T>(&self, count: i64, pagination: Pagination, results: Vec<T>) -> Page<T> {
        let next = (pagination.page < pagination.total_pages)
            .then(|| self.url_for(Some(pagination.page + 1)));

        // The link back to the first page drops the parameter entirely.
        let previous = match pagination.page {
            1 => None,
            2 => Some(self.url_for(None)),
            n => Some(self.url_for(Some(n - 1))),
        };

        Page {
            count,
            next,
            previous,
            results,
        }
    }

    fn url_for(&self, page: Option<i64>) -> String {
        let mut params = self.other_params.clone();
        if let Some(page) = page {
            params.push((PAGE_PARAM.to_string(), page.to_string()));
        }

        match serde_urlencoded::to_string(&params) {
            Ok(query) if !query.is_empty() => format!("{}?{}", self.base_url, query),
            _ => self.base_url.clone(),
        }
    }
}
