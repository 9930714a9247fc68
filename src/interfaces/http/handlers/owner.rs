use crate::application::reports::ReportQuery;
use crate::domain::sales::{SalesReport, SalesStat};
use crate::interfaces::http::extract::Owner;
use crate::interfaces::http::response::{ApiResponse, ApiResult};
use crate::interfaces::http::state::AppState;
use axum::extract::{Query, State};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct DailyQuery {
    pub date: Option<String>,
}

pub async fn sales_report(
    _: Owner,
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<SalesReport> {
    Ok(ApiResponse::ok(state.reports.sales_report(&query).await?))
}

pub async fn daily_stats(
    _: Owner,
    State(state): State<AppState>,
    Query(query): Query<DailyQuery>,
) -> ApiResult<SalesStat> {
    Ok(ApiResponse::ok(
        state.reports.daily_stat(query.date.as_deref()).await?,
    ))
}
