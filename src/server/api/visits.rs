// Read-only visit endpoints - listing, summary stats, trends, aggregates
//
// Query parameters use the camelCase names the dashboard sends. Time-window
// fields are repeated per struct rather than flattened: serde's flatten
// buffers values as strings, which breaks numeric fields in query strings.

use super::{blocking, ApiError, MAX_LIMIT};
use crate::query::{
    AggregateOptions, AggregateOrder, AggregateResult, BrowserStats, CountedReferrer, CountedUrl,
    DailyCount, DailyStats, DeviceStats, GroupBy, OsStats, SortField, SortOrder, TimeRange,
    TimezoneStats, TrendOptions, VisitFilters, VisitQueryOptions, VisitQueryResult, VisitStats,
};
use crate::server::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

// ============================================================================
// Default values
// ============================================================================

fn default_days() -> u32 {
    7
}

fn default_top_limit() -> u32 {
    10
}

fn time_range(
    days: Option<u32>,
    start_date: Option<String>,
    end_date: Option<String>,
) -> TimeRange {
    TimeRange {
        days,
        start_date,
        end_date,
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Query parameters for GET /api/visits
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
    pub url: Option<String>,
    pub ip: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub language: Option<String>,
    pub timezone: Option<String>,
}

impl ListParams {
    fn into_options(self) -> VisitQueryOptions {
        let defaults = VisitQueryOptions::default();
        VisitQueryOptions {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit).min(MAX_LIMIT),
            sort_by: self.sort_by.unwrap_or(defaults.sort_by),
            sort_order: self.sort_order.unwrap_or(defaults.sort_order),
            filters: VisitFilters {
                url: self.url,
                ip: self.ip,
                start_date: self.start_date,
                end_date: self.end_date,
                language: self.language,
                timezone: self.timezone,
            },
        }
    }
}

/// GET /api/visits - Paginated, filtered visit listing
///
/// Query params:
///   - page, limit: pagination (defaults 1 / 20, limit max 1000)
///   - sortBy: timestamp|url|ip|created_at (default timestamp)
///   - sortOrder: asc|desc (default desc)
///   - url (substring), ip, startDate, endDate, language, timezone
pub async fn list_visits(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<VisitQueryResult>, ApiError> {
    let query = state.query()?.clone();
    let options = params.into_options();
    let result = blocking(move || query.get_visits(&options)).await?;
    Ok(Json(result))
}

// ============================================================================
// Summary
// ============================================================================

/// GET /api/visits/stats - Headline numbers, top pages, referrers, devices
pub async fn stats(State(state): State<AppState>) -> Result<Json<VisitStats>, ApiError> {
    let query = state.query()?.clone();
    let stats = blocking(move || query.get_stats()).await?;
    Ok(Json(stats))
}

/// Query parameters for the per-day endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaysParams {
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default)]
    pub include_unique_visitors: bool,
    #[serde(default)]
    pub include_bot_stats: bool,
}

/// GET /api/visits/recent - Visits per day over the last `days` (default 7)
pub async fn recent_stats(
    State(state): State<AppState>,
    Query(params): Query<DaysParams>,
) -> Result<Json<Vec<DailyCount>>, ApiError> {
    let query = state.query()?.clone();
    let days = params.days;
    let recent = blocking(move || query.get_recent_stats(days)).await?;
    Ok(Json(recent))
}

/// GET /api/visits/trend - Per-day trend
///
/// Query params:
///   - days: window (default 7)
///   - includeUniqueVisitors, includeBotStats: add the optional columns
pub async fn trend_stats(
    State(state): State<AppState>,
    Query(params): Query<DaysParams>,
) -> Result<Json<Vec<DailyStats>>, ApiError> {
    let query = state.query()?.clone();
    let days = params.days;
    let options = TrendOptions {
        include_unique_visitors: params.include_unique_visitors,
        include_bot_stats: params.include_bot_stats,
    };
    let trend = blocking(move || query.get_trend_stats(days, options)).await?;
    Ok(Json(trend))
}

/// Query parameters for ranked lists
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopParams {
    #[serde(default = "default_top_limit")]
    pub limit: u32,
    pub days: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GET /api/visits/top-pages - Most visited URLs
pub async fn top_pages(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> Result<Json<Vec<CountedUrl>>, ApiError> {
    let query = state.query()?.clone();
    let limit = params.limit.min(MAX_LIMIT);
    let range = time_range(params.days, params.start_date, params.end_date);
    let pages = blocking(move || query.get_top_pages(limit, &range)).await?;
    Ok(Json(pages))
}

/// GET /api/visits/referrers - Most common referrers
pub async fn referrer_stats(
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> Result<Json<Vec<CountedReferrer>>, ApiError> {
    let query = state.query()?.clone();
    let limit = params.limit.min(MAX_LIMIT);
    let referrers = blocking(move || query.get_referrer_stats(limit)).await?;
    Ok(Json(referrers))
}

// ============================================================================
// Aggregates
// ============================================================================

/// Query parameters for GET /api/visits/aggregate
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateParams {
    pub group_by: GroupBy,
    pub days: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub order_by: AggregateOrder,
    #[serde(default)]
    pub order_direction: SortOrder,
}

/// GET /api/visits/aggregate - Generic group-by
///
/// Query params:
///   - groupBy: url|timezone|date|device|os|browser (required)
///   - days, startDate, endDate: time window
///   - limit (default 100), orderBy: count|date, orderDirection: asc|desc
pub async fn aggregate(
    State(state): State<AppState>,
    Query(params): Query<AggregateParams>,
) -> Result<Json<Vec<AggregateResult>>, ApiError> {
    let query = state.query()?.clone();
    let defaults = AggregateOptions::new(params.group_by);
    let options = AggregateOptions {
        range: time_range(params.days, params.start_date, params.end_date),
        limit: params.limit.unwrap_or(defaults.limit).min(MAX_LIMIT),
        order_by: params.order_by,
        order_direction: params.order_direction,
        ..defaults
    };
    let results = blocking(move || query.aggregate(&options)).await?;
    Ok(Json(results))
}

/// Query parameters for the breakdown endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeParams {
    pub days: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
}

impl RangeParams {
    fn range(&self) -> TimeRange {
        time_range(self.days, self.start_date.clone(), self.end_date.clone())
    }
}

/// GET /api/visits/devices - Visits per device class
pub async fn device_stats(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<DeviceStats>>, ApiError> {
    let query = state.query()?.clone();
    let range = params.range();
    let devices = blocking(move || query.get_device_stats(&range)).await?;
    Ok(Json(devices))
}

/// GET /api/visits/os - Visits per operating system
pub async fn os_stats(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<OsStats>>, ApiError> {
    let query = state.query()?.clone();
    let range = params.range();
    let os = blocking(move || query.get_os_stats(&range)).await?;
    Ok(Json(os))
}

/// GET /api/visits/browsers - Visits per browser
pub async fn browser_stats(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<BrowserStats>>, ApiError> {
    let query = state.query()?.clone();
    let range = params.range();
    let browsers = blocking(move || query.get_browser_stats(&range)).await?;
    Ok(Json(browsers))
}

/// GET /api/visits/timezones - Visits per timezone (limit default 50)
pub async fn timezone_stats(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<TimezoneStats>>, ApiError> {
    let query = state.query()?.clone();
    let range = params.range();
    let limit = params.limit.map(|l| l.min(MAX_LIMIT));
    let timezones = blocking(move || query.get_timezone_stats(&range, limit)).await?;
    Ok(Json(timezones))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_defaults_and_cap() {
        let options = ListParams {
            limit: Some(50_000),
            ..Default::default()
        }
        .into_options();
        assert_eq!(options.page, 1);
        assert_eq!(options.limit, MAX_LIMIT);
        assert_eq!(options.sort_by, SortField::Timestamp);
        assert_eq!(options.sort_order, SortOrder::Desc);
    }
}
