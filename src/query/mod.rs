//! Query interface for the visits database
//!
//! Read-side analytics over the `visits` table: paginated listings, summary
//! statistics, daily trends and group-by aggregates.
//!
//! # Module Organization
//!
//! - `types` - Options and result DTOs
//! - `filters` - WHERE clause assembly with bound parameters
//! - `listing` - Paginated, filtered, sorted visit listings
//! - `stats` - Summary statistics, top pages, referrers
//! - `trends` - Per-day counts with optional unique-visitor and bot splits
//! - `aggregate` - Generic GROUP BY, including User-Agent derived dimensions

mod aggregate;
mod filters;
mod listing;
mod stats;
mod trends;
mod types;

pub use types::{
    AggregateOptions, AggregateOrder, AggregateResult, BrowserStats, CountedReferrer, CountedUrl,
    CountedUserAgent, DailyCount, DailyStats, DeviceStats, GroupBy, OsStats, Pagination,
    SortField, SortOrder, TimeRange, TimezoneStats, TrendOptions, VisitFilters,
    VisitQueryOptions, VisitQueryResult, VisitRecord, VisitStats,
};

use crate::storage::VisitStore;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Row;

/// Columns selected for [`VisitRecord`], nullable ones coalesced to defaults
const VISIT_COLUMNS: &str = r#"
    id,
    timestamp,
    url,
    COALESCE(referrer, ''),
    COALESCE(user_agent, ''),
    COALESCE(language, ''),
    COALESCE(cookies, ''),
    COALESCE(screen_width, 0),
    COALESCE(screen_height, 0),
    COALESCE(color_depth, 0),
    COALESCE(timezone, ''),
    COALESCE(ip, ''),
    created_at
"#;

/// Query interface for the visits database
///
/// Shares the store's connection pool; cheap to clone.
///
/// # Example
///
/// ```rust,no_run
/// # fn main() -> anyhow::Result<()> {
/// let store = VisitStore::open("./data/visits.db")?;
/// let query = VisitsQuery::from_store(&store);
///
/// let page = query.get_visits(&VisitQueryOptions::default())?;
/// for visit in page.data {
///     println!("[{}] {}", visit.timestamp, visit.url);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct VisitsQuery {
    pool: Pool<SqliteConnectionManager>,
}

impl VisitsQuery {
    pub fn from_store(store: &VisitStore) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    /// Get a connection from the pool
    fn conn(&self) -> anyhow::Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }
}

fn visit_from_row(row: &Row<'_>) -> rusqlite::Result<VisitRecord> {
    Ok(VisitRecord {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        url: row.get(2)?,
        referrer: row.get(3)?,
        user_agent: row.get(4)?,
        language: row.get(5)?,
        cookies: row.get(6)?,
        screen_width: row.get(7)?,
        screen_height: row.get(8)?,
        color_depth: row.get(9)?,
        timezone: row.get(10)?,
        ip: row.get(11)?,
        created_at: row.get(12)?,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::storage::{NewVisit, VisitStore};
    use chrono::{Duration, SecondsFormat, Utc};

    pub(crate) const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    pub(crate) const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1_2 like \
        Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    pub(crate) const GOOGLEBOT: &str =
        "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

    pub(crate) fn open_temp() -> (tempfile::TempDir, VisitStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = VisitStore::open(dir.path().join("visits.db")).unwrap();
        (dir, store)
    }

    /// Visit `days_ago` days before now
    pub(crate) fn visit(url: &str, ip: &str, user_agent: &str, days_ago: i64) -> NewVisit {
        NewVisit {
            timestamp: (Utc::now() - Duration::days(days_ago))
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            url: url.to_string(),
            user_agent: user_agent.to_string(),
            ip: ip.to_string(),
            language: "en-US".to_string(),
            timezone: "UTC".to_string(),
            ..Default::default()
        }
    }
}
