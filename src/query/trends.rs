//! Daily trend queries
//!
//! Per-day visit counts for the last N days. Rows whose timestamp SQLite
//! cannot read as a date are left out. The bot/human split is computed
//! in the application layer by classifying each distinct User-Agent once per
//! day and weighting it by its visit count, so the split always sums to the
//! day's total.

use super::types::{DailyCount, DailyStats, TrendOptions};
use super::VisitsQuery;
use crate::user_agent;
use rusqlite::params;
use std::collections::BTreeMap;

/// Default trend window in days
pub const DEFAULT_TREND_DAYS: u32 = 7;

impl VisitsQuery {
    /// `(date, count)` per day over the last `days` days, newest first
    pub fn get_recent_stats(&self, days: u32) -> anyhow::Result<Vec<DailyCount>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT DATE(timestamp) AS date, COUNT(*) AS count
            FROM visits
            WHERE timestamp >= datetime('now', '-' || ?1 || ' days')
              AND DATE(timestamp) IS NOT NULL
            GROUP BY DATE(timestamp)
            ORDER BY date DESC
            "#,
        )?;
        let rows = stmt.query_map(params![i64::from(days)], |row| {
            Ok(DailyCount {
                date: row.get(0)?,
                count: row.get(1)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Per-day trend over the last `days` days, newest first
    ///
    /// `unique_visitors`, `bot_count` and `human_count` are populated only
    /// when requested through `options`.
    pub fn get_trend_stats(
        &self,
        days: u32,
        options: TrendOptions,
    ) -> anyhow::Result<Vec<DailyStats>> {
        let conn = self.conn()?;

        let mut trend = Vec::new();
        {
            let mut stmt = conn.prepare(
                r#"
                SELECT DATE(timestamp) AS date, COUNT(*) AS count, COUNT(DISTINCT ip) AS uniques
                FROM visits
                WHERE timestamp >= datetime('now', '-' || ?1 || ' days')
                  AND DATE(timestamp) IS NOT NULL
                GROUP BY DATE(timestamp)
                ORDER BY date DESC
                "#,
            )?;
            let rows = stmt.query_map(params![i64::from(days)], |row| {
                let uniques: i64 = row.get(2)?;
                Ok(DailyStats {
                    date: row.get(0)?,
                    count: row.get(1)?,
                    unique_visitors: options.include_unique_visitors.then_some(uniques),
                    bot_count: None,
                    human_count: None,
                })
            })?;
            for row in rows {
                trend.push(row?);
            }
        }

        if !options.include_bot_stats {
            return Ok(trend);
        }

        // date -> (bots, humans)
        let mut split: BTreeMap<String, (i64, i64)> = BTreeMap::new();
        {
            let mut stmt = conn.prepare(
                r#"
                SELECT DATE(timestamp) AS date, COALESCE(user_agent, '') AS ua, COUNT(*) AS count
                FROM visits
                WHERE timestamp >= datetime('now', '-' || ?1 || ' days')
                  AND DATE(timestamp) IS NOT NULL
                GROUP BY date, ua
                "#,
            )?;
            let rows = stmt.query_map(params![i64::from(days)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;
            for row in rows {
                let (date, ua, count) = row?;
                let entry = split.entry(date).or_default();
                if user_agent::is_bot(&ua) {
                    entry.0 += count;
                } else {
                    entry.1 += count;
                }
            }
        }

        for day in &mut trend {
            let (bots, humans) = split.get(&day.date).copied().unwrap_or((0, day.count));
            day.bot_count = Some(bots);
            day.human_count = Some(humans);
        }

        Ok(trend)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{open_temp, visit, CHROME_WINDOWS, GOOGLEBOT};
    use super::*;

    fn seed(store: &crate::storage::VisitStore) {
        // Today: 2 humans from the same IP, 1 bot
        store.insert_visit(&visit("https://example.com/", "1.1.1.1", CHROME_WINDOWS, 0)).unwrap();
        store.insert_visit(&visit("https://example.com/a", "1.1.1.1", CHROME_WINDOWS, 0)).unwrap();
        store.insert_visit(&visit("https://example.com/", "66.249.0.1", GOOGLEBOT, 0)).unwrap();
        // Two days ago: 1 visit with no User-Agent
        store.insert_visit(&visit("https://example.com/", "2.2.2.2", "", 2)).unwrap();
        // Outside the window
        store.insert_visit(&visit("https://example.com/", "3.3.3.3", CHROME_WINDOWS, 30)).unwrap();
    }

    #[test]
    fn test_recent_stats_newest_first() {
        let (_dir, store) = open_temp();
        seed(&store);
        let recent = VisitsQuery::from_store(&store)
            .get_recent_stats(DEFAULT_TREND_DAYS)
            .unwrap();

        assert_eq!(recent.len(), 2);
        assert!(recent[0].date > recent[1].date);
        assert_eq!(recent[0].count, 3);
        assert_eq!(recent[1].count, 1);
    }

    #[test]
    fn test_trend_without_options_omits_extras() {
        let (_dir, store) = open_temp();
        seed(&store);
        let trend = VisitsQuery::from_store(&store)
            .get_trend_stats(DEFAULT_TREND_DAYS, TrendOptions::default())
            .unwrap();

        assert!(trend.iter().all(|d| d.unique_visitors.is_none()));
        assert!(trend.iter().all(|d| d.bot_count.is_none() && d.human_count.is_none()));

        let json = serde_json::to_value(&trend[0]).unwrap();
        assert!(json.get("botCount").is_none());
    }

    #[test]
    fn test_trend_bot_split_sums_to_count() {
        let (_dir, store) = open_temp();
        seed(&store);
        let trend = VisitsQuery::from_store(&store)
            .get_trend_stats(
                DEFAULT_TREND_DAYS,
                TrendOptions {
                    include_unique_visitors: true,
                    include_bot_stats: true,
                },
            )
            .unwrap();

        for day in &trend {
            assert_eq!(
                day.bot_count.unwrap() + day.human_count.unwrap(),
                day.count,
                "split mismatch on {}",
                day.date
            );
        }

        let today = &trend[0];
        assert_eq!(today.count, 3);
        assert_eq!(today.unique_visitors, Some(2));
        assert_eq!(today.bot_count, Some(1));
        assert_eq!(today.human_count, Some(2));

        // Empty User-Agent counts as human
        assert_eq!(trend[1].human_count, Some(1));
        assert_eq!(trend[1].bot_count, Some(0));
    }

    #[test]
    fn test_unparseable_timestamps_are_skipped() {
        let (_dir, store) = open_temp();
        seed(&store);
        let mut garbage = visit("https://example.com/", "9.9.9.9", CHROME_WINDOWS, 0);
        garbage.timestamp = "not-a-date".to_string();
        store.insert_visit(&garbage).unwrap();

        let query = VisitsQuery::from_store(&store);
        let recent = query.get_recent_stats(DEFAULT_TREND_DAYS).unwrap();
        assert_eq!(recent.iter().map(|d| d.count).sum::<i64>(), 4);

        let trend = query
            .get_trend_stats(
                DEFAULT_TREND_DAYS,
                TrendOptions {
                    include_unique_visitors: true,
                    include_bot_stats: true,
                },
            )
            .unwrap();
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].count, 3);
        assert_eq!(trend[0].bot_count.unwrap() + trend[0].human_count.unwrap(), 3);
    }
}
