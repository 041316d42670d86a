//! Group-by aggregation
//!
//! `url`, `timezone` and `date` are grouped in SQL. Device, OS and browser are
//! not stored columns: rows are grouped by raw User-Agent, each distinct UA is
//! classified once, and the counts are re-bucketed here.

use super::filters::WhereClause;
use super::types::{
    AggregateOptions, AggregateOrder, AggregateResult, BrowserStats, DeviceStats, GroupBy,
    OsStats, SortOrder, TimeRange, TimezoneStats, UaDimension,
};
use super::VisitsQuery;
use crate::user_agent::parse_user_agent;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use std::collections::HashMap;

/// Default row cap for [`VisitsQuery::get_timezone_stats`]
pub const DEFAULT_TIMEZONE_LIMIT: u32 = 50;

impl GroupBy {
    /// SQL expression for the grouping key
    fn sql_key(&self) -> &'static str {
        match self {
            GroupBy::Url => "COALESCE(url, '')",
            GroupBy::Timezone => "COALESCE(timezone, '')",
            GroupBy::Date => "COALESCE(DATE(timestamp), '')",
            GroupBy::Device | GroupBy::Os | GroupBy::Browser => "COALESCE(user_agent, '')",
        }
    }
}

impl VisitsQuery {
    /// Count visits per `options.group_by` key
    ///
    /// Ordering by date is only meaningful for `GroupBy::Date`; any other
    /// dimension falls back to ordering by count.
    pub fn aggregate(&self, options: &AggregateOptions) -> anyhow::Result<Vec<AggregateResult>> {
        if let Some(dimension) = options.group_by.ua_dimension() {
            return self.aggregate_user_agents(dimension, options);
        }

        let clause = WhereClause::from_range(&options.range);
        let direction = options.order_direction.sql();
        let order = match (options.order_by, options.group_by) {
            (AggregateOrder::Date, GroupBy::Date) => format!("group_key {}", direction),
            _ => format!("count {}, group_key ASC", direction),
        };

        let sql = format!(
            r#"
            SELECT {key} AS group_key, COUNT(*) AS count
            FROM visits
            {where_sql}
            GROUP BY group_key
            ORDER BY {order}
            LIMIT ?
            "#,
            key = options.group_by.sql_key(),
            where_sql = clause.sql(),
            order = order,
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(clause.values_with([Value::Integer(i64::from(options.limit))])),
            |row| {
                Ok(AggregateResult {
                    key: row.get(0)?,
                    count: row.get(1)?,
                })
            },
        )?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn aggregate_user_agents(
        &self,
        dimension: UaDimension,
        options: &AggregateOptions,
    ) -> anyhow::Result<Vec<AggregateResult>> {
        let clause = WhereClause::from_range(&options.range);
        let sql = format!(
            r#"
            SELECT {key} AS ua, COUNT(*) AS count
            FROM visits
            {where_sql}
            GROUP BY ua
            "#,
            key = options.group_by.sql_key(),
            where_sql = clause.sql(),
        );

        let mut buckets: HashMap<String, i64> = HashMap::new();
        {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(clause.values()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;

            for row in rows {
                let (ua, count) = row?;
                let parsed = parse_user_agent(&ua);
                let key = match dimension {
                    UaDimension::Device => parsed.device.as_str().to_string(),
                    UaDimension::Os => parsed.os,
                    UaDimension::Browser => parsed.browser,
                };
                *buckets.entry(key).or_insert(0) += count;
            }
        }

        let mut results: Vec<AggregateResult> = buckets
            .into_iter()
            .map(|(key, count)| AggregateResult { key, count })
            .collect();

        results.sort_by(|a, b| {
            let by_count = match options.order_direction {
                SortOrder::Desc => b.count.cmp(&a.count),
                SortOrder::Asc => a.count.cmp(&b.count),
            };
            by_count.then_with(|| a.key.cmp(&b.key))
        });
        results.truncate(options.limit as usize);

        Ok(results)
    }

    /// Visits per device class (mobile / tablet / desktop / unknown)
    pub fn get_device_stats(&self, range: &TimeRange) -> anyhow::Result<Vec<DeviceStats>> {
        let results =
            self.aggregate(&AggregateOptions::new(GroupBy::Device).with_range(range.clone()))?;
        Ok(results
            .into_iter()
            .map(|r| DeviceStats {
                device: r.key,
                count: r.count,
            })
            .collect())
    }

    /// Visits per operating system
    pub fn get_os_stats(&self, range: &TimeRange) -> anyhow::Result<Vec<OsStats>> {
        let results = self.aggregate(&AggregateOptions::new(GroupBy::Os).with_range(range.clone()))?;
        Ok(results
            .into_iter()
            .map(|r| OsStats {
                os: r.key,
                count: r.count,
            })
            .collect())
    }

    /// Visits per browser
    pub fn get_browser_stats(&self, range: &TimeRange) -> anyhow::Result<Vec<BrowserStats>> {
        let results =
            self.aggregate(&AggregateOptions::new(GroupBy::Browser).with_range(range.clone()))?;
        Ok(results
            .into_iter()
            .map(|r| BrowserStats {
                browser: r.key,
                count: r.count,
            })
            .collect())
    }

    /// Visits per reported IANA timezone
    pub fn get_timezone_stats(
        &self,
        range: &TimeRange,
        limit: Option<u32>,
    ) -> anyhow::Result<Vec<TimezoneStats>> {
        let options = AggregateOptions::new(GroupBy::Timezone)
            .with_range(range.clone())
            .with_limit(limit.unwrap_or(DEFAULT_TIMEZONE_LIMIT));
        let results = self.aggregate(&options)?;
        Ok(results
            .into_iter()
            .map(|r| TimezoneStats {
                timezone: r.key,
                count: r.count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{open_temp, visit, CHROME_WINDOWS, GOOGLEBOT, SAFARI_IPHONE};
    use super::*;
    use crate::storage::VisitStore;

    fn seed(store: &VisitStore) {
        for _ in 0..3 {
            store
                .insert_visit(&visit("https://example.com/", "1.1.1.1", CHROME_WINDOWS, 0))
                .unwrap();
        }
        for _ in 0..2 {
            store
                .insert_visit(&visit("https://example.com/a", "2.2.2.2", SAFARI_IPHONE, 1))
                .unwrap();
        }
        store
            .insert_visit(&visit("https://example.com/a", "3.3.3.3", GOOGLEBOT, 10))
            .unwrap();
    }

    fn total(results: &[AggregateResult]) -> i64 {
        results.iter().map(|r| r.count).sum()
    }

    #[test]
    fn test_only_classifier_dimensions_bypass_sql() {
        assert_eq!(GroupBy::Device.ua_dimension(), Some(UaDimension::Device));
        assert_eq!(GroupBy::Os.ua_dimension(), Some(UaDimension::Os));
        assert_eq!(GroupBy::Browser.ua_dimension(), Some(UaDimension::Browser));
        for sql_column in [GroupBy::Url, GroupBy::Timezone, GroupBy::Date] {
            assert_eq!(sql_column.ua_dimension(), None);
        }
    }

    #[test]
    fn test_group_by_url() {
        let (_dir, store) = open_temp();
        seed(&store);
        let results = VisitsQuery::from_store(&store)
            .aggregate(&AggregateOptions::new(GroupBy::Url))
            .unwrap();

        assert_eq!(
            results,
            vec![
                AggregateResult {
                    key: "https://example.com/".to_string(),
                    count: 3
                },
                AggregateResult {
                    key: "https://example.com/a".to_string(),
                    count: 3
                },
            ]
        );
    }

    #[test]
    fn test_group_by_date_ordered_by_date() {
        let (_dir, store) = open_temp();
        seed(&store);
        let options = AggregateOptions {
            order_by: AggregateOrder::Date,
            order_direction: SortOrder::Asc,
            ..AggregateOptions::new(GroupBy::Date)
        };
        let results = VisitsQuery::from_store(&store).aggregate(&options).unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].key < w[1].key));
        assert_eq!(results[2].count, 3);
    }

    #[test]
    fn test_date_order_ignored_for_other_dimensions() {
        let (_dir, store) = open_temp();
        seed(&store);
        let mut other = visit("https://example.com/", "4.4.4.4", CHROME_WINDOWS, 0);
        other.timezone = "Asia/Tokyo".to_string();
        store.insert_visit(&other).unwrap();

        let options = AggregateOptions {
            order_by: AggregateOrder::Date,
            ..AggregateOptions::new(GroupBy::Timezone)
        };
        let results = VisitsQuery::from_store(&store).aggregate(&options).unwrap();
        assert_eq!(results[0].key, "UTC");
        assert_eq!(results[0].count, 6);
    }

    #[test]
    fn test_user_agent_dimensions_preserve_totals() {
        let (_dir, store) = open_temp();
        seed(&store);
        let query = VisitsQuery::from_store(&store);

        let devices = query.get_device_stats(&TimeRange::default()).unwrap();
        assert_eq!(devices[0].device, "desktop");
        assert_eq!(devices[0].count, 3);
        assert!(devices.iter().any(|d| d.device == "mobile" && d.count == 2));
        assert_eq!(devices.iter().map(|d| d.count).sum::<i64>(), 6);

        let os = query.get_os_stats(&TimeRange::default()).unwrap();
        assert_eq!(os[0].os, "Windows 10/11");
        assert_eq!(os.iter().map(|o| o.count).sum::<i64>(), 6);

        let browsers = query.get_browser_stats(&TimeRange::default()).unwrap();
        assert_eq!(browsers[0].browser, "Chrome");
        assert_eq!(browsers.iter().map(|b| b.count).sum::<i64>(), 6);
    }

    #[test]
    fn test_user_agent_limit_and_range() {
        let (_dir, store) = open_temp();
        seed(&store);
        let query = VisitsQuery::from_store(&store);

        let recent = query
            .aggregate(
                &AggregateOptions::new(GroupBy::Browser)
                    .with_range(TimeRange {
                        days: Some(7),
                        ..Default::default()
                    })
                    .with_limit(1),
            )
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].key, "Chrome");

        let all = query.aggregate(&AggregateOptions::new(GroupBy::Device)).unwrap();
        assert_eq!(total(&all), 6);
    }

    #[test]
    fn test_timezone_stats_default_limit() {
        let (_dir, store) = open_temp();
        for i in 0..60 {
            let mut v = visit("https://example.com/", "1.1.1.1", CHROME_WINDOWS, 0);
            v.timezone = format!("Zone/{:02}", i);
            store.insert_visit(&v).unwrap();
        }
        let query = VisitsQuery::from_store(&store);

        let default = query.get_timezone_stats(&TimeRange::default(), None).unwrap();
        assert_eq!(default.len(), DEFAULT_TIMEZONE_LIMIT as usize);

        let capped = query.get_timezone_stats(&TimeRange::default(), Some(5)).unwrap();
        assert_eq!(capped.len(), 5);
        assert_eq!(capped[0].timezone, "Zone/00");
    }

    #[test]
    fn test_empty_table_aggregates() {
        let (_dir, store) = open_temp();
        let query = VisitsQuery::from_store(&store);
        for group_by in [GroupBy::Url, GroupBy::Date, GroupBy::Os] {
            assert!(query.aggregate(&AggregateOptions::new(group_by)).unwrap().is_empty());
        }
    }
}
