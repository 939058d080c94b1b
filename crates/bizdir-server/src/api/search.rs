use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use bizdir_core::{AttributeFilters, SearchRequest, DEFAULT_PAGE_SIZE};
use bizdir_search::SearchResult;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_search_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Upper bound on one search, on top of the per-call store timeout.
const SEARCH_DEADLINE: Duration = Duration::from_secs(30);

/// Flat query-string form of [`SearchRequest`].
#[derive(Debug, Default, Deserialize)]
pub(super) struct SearchParams {
    #[serde(alias = "q")]
    pub term: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub region: Option<String>,
    pub radius_km: Option<f64>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub verified: Option<bool>,
    pub premium: Option<bool>,
    pub has_coupons: Option<bool>,
    pub accepts_online_orders: Option<bool>,
    pub kid_friendly: Option<bool>,
    pub sponsored: Option<bool>,
}

impl From<SearchParams> for SearchRequest {
    fn from(params: SearchParams) -> Self {
        Self {
            term: params.term,
            category: params.category,
            location: params.location,
            region: params.region,
            radius_km: params.radius_km,
            attributes: AttributeFilters {
                verified: params.verified.unwrap_or(false),
                premium: params.premium.unwrap_or(false),
                has_coupons: params.has_coupons.unwrap_or(false),
                accepts_online_orders: params.accepts_online_orders.unwrap_or(false),
                kid_friendly: params.kid_friendly.unwrap_or(false),
                sponsored: params.sponsored.unwrap_or(false),
            },
            page: params.page.unwrap_or(1),
            page_size: params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

pub(super) async fn search_businesses(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<ApiResponse<SearchResult>>, ApiError> {
    let Query(params) =
        params.map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;
    let request = SearchRequest::from(params);

    let result = state
        .search
        .search_until(&request, tokio::time::sleep(SEARCH_DEADLINE))
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    tracing::info!(
        request_id = %req_id.0,
        items = result.items.len(),
        total = result.total.value,
        exact = result.total.exact,
        page = result.page,
        "search served"
    );

    Ok(Json(ApiResponse {
        data: result,
        meta: ResponseMeta::new(req_id.0),
    }))
}
