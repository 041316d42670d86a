//! Summary statistics queries
//!
//! Dashboard headline numbers plus the top pages and referrer rankings.

use super::filters::WhereClause;
use super::types::{CountedReferrer, CountedUrl, CountedUserAgent, TimeRange, VisitStats};
use super::VisitsQuery;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};

/// Rows per ranking in [`VisitsQuery::get_stats`]
const STATS_TOP_N: u32 = 10;

/// User-Agent prefix length used to bucket devices in the summary
const DEVICE_PREFIX_CHARS: i64 = 50;

impl VisitsQuery {
    /// Headline statistics across all stored visits
    pub fn get_stats(&self) -> anyhow::Result<VisitStats> {
        let conn = self.conn()?;

        let total_visits: i64 =
            conn.query_row("SELECT COUNT(*) FROM visits", [], |row| row.get(0))?;

        let unique_visitors: i64 =
            conn.query_row("SELECT COUNT(DISTINCT ip) FROM visits", [], |row| row.get(0))?;

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let today_visits: i64 = conn.query_row(
            "SELECT COUNT(*) FROM visits WHERE DATE(timestamp) = ?1",
            params![today],
            |row| row.get(0),
        )?;

        // Devices: coarse bucket on the raw UA prefix (see aggregate() for parsed breakdowns)
        let mut devices = Vec::new();
        {
            let mut stmt = conn.prepare(
                r#"
                SELECT SUBSTR(COALESCE(user_agent, ''), 1, ?1) AS ua_prefix, COUNT(*) AS count
                FROM visits
                GROUP BY ua_prefix
                ORDER BY count DESC, ua_prefix ASC
                LIMIT ?2
                "#,
            )?;
            let rows = stmt.query_map(
                params![DEVICE_PREFIX_CHARS, i64::from(STATS_TOP_N)],
                |row| {
                    Ok(CountedUserAgent {
                        user_agent: row.get(0)?,
                        count: row.get(1)?,
                    })
                },
            )?;
            for row in rows {
                devices.push(row?);
            }
        }
        drop(conn);

        Ok(VisitStats {
            total_visits,
            unique_visitors,
            today_visits,
            top_pages: self.get_top_pages(STATS_TOP_N, &TimeRange::default())?,
            referrers: self.get_referrer_stats(STATS_TOP_N)?,
            devices,
        })
    }

    /// Most visited URLs, optionally restricted to a time window
    pub fn get_top_pages(&self, limit: u32, range: &TimeRange) -> anyhow::Result<Vec<CountedUrl>> {
        let conn = self.conn()?;
        let clause = WhereClause::from_range(range);

        let sql = format!(
            r#"
            SELECT url, COUNT(*) AS count
            FROM visits
            {}
            GROUP BY url
            ORDER BY count DESC, url ASC
            LIMIT ?
            "#,
            clause.sql()
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(clause.values_with([Value::Integer(i64::from(limit))])),
            |row| {
                Ok(CountedUrl {
                    url: row.get(0)?,
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

    /// Most common non-empty referrers
    pub fn get_referrer_stats(&self, limit: u32) -> anyhow::Result<Vec<CountedReferrer>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT referrer, COUNT(*) AS count
            FROM visits
            WHERE referrer IS NOT NULL AND referrer != ''
            GROUP BY referrer
            ORDER BY count DESC, referrer ASC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map(params![i64::from(limit)], |row| {
            Ok(CountedReferrer {
                referrer: row.get(0)?,
                count: row.get(1)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{open_temp, visit, CHROME_WINDOWS, GOOGLEBOT};
    use super::*;

    #[test]
    fn test_stats_on_empty_table() {
        let (_dir, store) = open_temp();
        let stats = VisitsQuery::from_store(&store).get_stats().unwrap();
        assert_eq!(stats.total_visits, 0);
        assert_eq!(stats.unique_visitors, 0);
        assert_eq!(stats.today_visits, 0);
        assert!(stats.top_pages.is_empty());
        assert!(stats.referrers.is_empty());
        assert!(stats.devices.is_empty());
    }

    #[test]
    fn test_stats_counts() {
        let (_dir, store) = open_temp();
        let mut with_ref = visit("https://example.com/", "10.0.0.1", CHROME_WINDOWS, 0);
        with_ref.referrer = "https://news.example/".to_string();
        store.insert_visit(&with_ref).unwrap();
        store.insert_visit(&with_ref).unwrap();
        store
            .insert_visit(&visit("https://example.com/about", "10.0.0.2", GOOGLEBOT, 0))
            .unwrap();
        store
            .insert_visit(&visit("https://example.com/", "10.0.0.3", CHROME_WINDOWS, 3))
            .unwrap();

        let stats = VisitsQuery::from_store(&store).get_stats().unwrap();
        assert_eq!(stats.total_visits, 4);
        assert_eq!(stats.unique_visitors, 3);
        assert_eq!(stats.today_visits, 3);
        assert_eq!(
            stats.top_pages[0],
            CountedUrl {
                url: "https://example.com/".to_string(),
                count: 3
            }
        );
        assert_eq!(stats.referrers.len(), 1);
        assert_eq!(stats.referrers[0].count, 2);
        assert_eq!(stats.devices[0].count, 3);
        assert_eq!(stats.devices[0].user_agent.chars().count(), 50);
    }

    #[test]
    fn test_top_pages_respects_days_and_limit() {
        let (_dir, store) = open_temp();
        for _ in 0..3 {
            store
                .insert_visit(&visit("https://example.com/old", "1.1.1.1", CHROME_WINDOWS, 30))
                .unwrap();
        }
        store
            .insert_visit(&visit("https://example.com/new", "1.1.1.1", CHROME_WINDOWS, 1))
            .unwrap();
        store
            .insert_visit(&visit("https://example.com/other", "1.1.1.1", CHROME_WINDOWS, 1))
            .unwrap();
        let query = VisitsQuery::from_store(&store);

        let all = query.get_top_pages(10, &TimeRange::default()).unwrap();
        assert_eq!(all[0].url, "https://example.com/old");

        let recent = query
            .get_top_pages(
                1,
                &TimeRange {
                    days: Some(7),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_ne!(recent[0].url, "https://example.com/old");
    }
}
