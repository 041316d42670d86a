//! Data types for visit queries
//!
//! Request options and result DTOs. Results serialize to camelCase JSON for
//! the HTTP API.

use serde::{Deserialize, Serialize};

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

// ============================================================================
// Listing
// ============================================================================

/// One stored visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: i64,
    pub timestamp: String,
    pub url: String,
    pub referrer: String,
    pub user_agent: String,
    pub language: String,
    pub cookies: String,
    pub screen_width: i64,
    pub screen_height: i64,
    pub color_depth: i64,
    pub timezone: String,
    pub ip: String,
    pub created_at: String,
}

/// Column a listing can be ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Timestamp,
    Url,
    Ip,
    CreatedAt,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Timestamp => "timestamp",
            SortField::Url => "url",
            SortField::Ip => "ip",
            SortField::CreatedAt => "created_at",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Optional listing filters, combined with AND
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitFilters {
    /// URL contains this substring
    pub url: Option<String>,
    /// Exact IP address
    pub ip: Option<String>,
    /// Inclusive lower bound on timestamp
    pub start_date: Option<String>,
    /// Inclusive upper bound on timestamp
    pub end_date: Option<String>,
    pub language: Option<String>,
    pub timezone: Option<String>,
}

/// Options for [`super::VisitsQuery::get_visits`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitQueryOptions {
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: u32,
    /// Page size
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub filters: VisitFilters,
}

impl Default for VisitQueryOptions {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            filters: VisitFilters::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitQueryResult {
    pub data: Vec<VisitRecord>,
    pub pagination: Pagination,
}

// ============================================================================
// Summary statistics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountedUrl {
    pub url: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountedReferrer {
    pub referrer: String,
    pub count: i64,
}

/// Visits grouped by User-Agent prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountedUserAgent {
    pub user_agent: String,
    pub count: i64,
}

/// Headline numbers for a dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitStats {
    pub total_visits: i64,
    /// Distinct IP addresses
    pub unique_visitors: i64,
    /// Visits whose timestamp falls on the current UTC date
    pub today_visits: i64,
    pub top_pages: Vec<CountedUrl>,
    pub referrers: Vec<CountedReferrer>,
    pub devices: Vec<CountedUserAgent>,
}

// ============================================================================
// Trends
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

/// One day of the trend line. Optional fields are present only when requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: String,
    pub count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_visitors: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_count: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendOptions {
    #[serde(default)]
    pub include_unique_visitors: bool,
    #[serde(default)]
    pub include_bot_stats: bool,
}

// ============================================================================
// Aggregation
// ============================================================================

/// Time window shared by the aggregate queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    /// Only visits from the last N days
    pub days: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Dimension to aggregate over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Url,
    Timezone,
    Date,
    /// Derived from the User-Agent
    Device,
    /// Derived from the User-Agent
    Os,
    /// Derived from the User-Agent
    Browser,
}

/// Dimensions computed by the User-Agent classifier instead of SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UaDimension {
    Device,
    Os,
    Browser,
}

impl GroupBy {
    /// The classifier dimension, or `None` for plain SQL columns
    pub fn ua_dimension(&self) -> Option<UaDimension> {
        match self {
            GroupBy::Device => Some(UaDimension::Device),
            GroupBy::Os => Some(UaDimension::Os),
            GroupBy::Browser => Some(UaDimension::Browser),
            GroupBy::Url | GroupBy::Timezone | GroupBy::Date => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOrder {
    #[default]
    Count,
    /// Only honoured when grouping by date
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOptions {
    pub group_by: GroupBy,
    #[serde(default, flatten)]
    pub range: TimeRange,
    #[serde(default = "default_aggregate_limit")]
    pub limit: u32,
    #[serde(default)]
    pub order_by: AggregateOrder,
    #[serde(default)]
    pub order_direction: SortOrder,
}

fn default_aggregate_limit() -> u32 {
    100
}

impl AggregateOptions {
    pub fn new(group_by: GroupBy) -> Self {
        Self {
            group_by,
            range: TimeRange::default(),
            limit: default_aggregate_limit(),
            order_by: AggregateOrder::default(),
            order_direction: SortOrder::default(),
        }
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub device: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsStats {
    pub os: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserStats {
    pub browser: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneStats {
    pub timezone: String,
    pub count: i64,
}
