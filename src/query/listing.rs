//! Paginated visit listings
//!
//! Filtered, sorted, paginated reads over the raw visits table, plus the
//! single-filter convenience wrappers.

use super::filters::WhereClause;
use super::types::{Pagination, VisitFilters, VisitQueryOptions, VisitQueryResult};
use super::{visit_from_row, VisitsQuery, VISIT_COLUMNS};
use rusqlite::params_from_iter;
use rusqlite::types::Value;

impl VisitsQuery {
    /// List visits matching `options`
    ///
    /// Runs a `COUNT(*)` with the same WHERE clause first so the pagination
    /// block reflects the full filtered result, not just the returned page.
    pub fn get_visits(&self, options: &VisitQueryOptions) -> anyhow::Result<VisitQueryResult> {
        let page = options.page.max(1);
        let limit = options.limit.max(1);

        let clause = WhereClause::from_filters(&options.filters);
        let where_sql = clause.sql();
        let conn = self.conn()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM visits {}", where_sql),
            params_from_iter(clause.values()),
            |row| row.get(0),
        )?;

        let offset = i64::from(page - 1) * i64::from(limit);
        let total_pages = (total + i64::from(limit) - 1) / i64::from(limit);

        // Sort column and direction come from closed enums
        let sql = format!(
            "SELECT {} FROM visits {} ORDER BY {} {}, id {} LIMIT ? OFFSET ?",
            VISIT_COLUMNS,
            where_sql,
            options.sort_by.column(),
            options.sort_order.sql(),
            options.sort_order.sql(),
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(clause.values_with([
                Value::Integer(i64::from(limit)),
                Value::Integer(offset),
            ])),
            visit_from_row,
        )?;

        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }

        Ok(VisitQueryResult {
            data,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages,
            },
        })
    }

    /// Visits with `start_date <= timestamp <= end_date`
    pub fn get_visits_by_date_range(
        &self,
        start_date: &str,
        end_date: &str,
        options: &VisitQueryOptions,
    ) -> anyhow::Result<VisitQueryResult> {
        self.get_visits(&VisitQueryOptions {
            filters: VisitFilters {
                start_date: Some(start_date.to_string()),
                end_date: Some(end_date.to_string()),
                ..Default::default()
            },
            ..options.clone()
        })
    }

    /// Visits whose URL contains `url`
    pub fn get_visits_by_url(
        &self,
        url: &str,
        options: &VisitQueryOptions,
    ) -> anyhow::Result<VisitQueryResult> {
        self.get_visits(&VisitQueryOptions {
            filters: VisitFilters {
                url: Some(url.to_string()),
                ..Default::default()
            },
            ..options.clone()
        })
    }

    /// Visits from exactly `ip`
    pub fn get_visits_by_ip(
        &self,
        ip: &str,
        options: &VisitQueryOptions,
    ) -> anyhow::Result<VisitQueryResult> {
        self.get_visits(&VisitQueryOptions {
            filters: VisitFilters {
                ip: Some(ip.to_string()),
                ..Default::default()
            },
            ..options.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{open_temp, visit, CHROME_WINDOWS};
    use super::super::types::{SortField, SortOrder};
    use super::*;
    use crate::storage::NewVisit;

    #[test]
    fn test_inserted_visit_is_returned() {
        let (_dir, store) = open_temp();
        let mut new = visit("https://example.com/hello", "1.2.3.4", CHROME_WINDOWS, 0);
        new.referrer = "https://search.example/".to_string();
        new.screen_width = 1920;
        new.screen_height = 1080;
        new.color_depth = 24;
        let id = store.insert_visit(&new).unwrap();

        let query = VisitsQuery::from_store(&store);
        let result = query.get_visits(&VisitQueryOptions::default()).unwrap();

        assert_eq!(result.data.len(), 1);
        let record = &result.data[0];
        assert_eq!(record.id, id);
        assert_eq!(record.url, new.url);
        assert_eq!(record.referrer, new.referrer);
        assert_eq!(record.user_agent, CHROME_WINDOWS);
        assert_eq!(record.screen_width, 1920);
        assert_eq!(record.ip, "1.2.3.4");
        assert!(!record.created_at.is_empty());
    }

    #[test]
    fn test_pagination_totals_match_row_count() {
        let (_dir, store) = open_temp();
        for i in 0..45 {
            store
                .insert_visit(&NewVisit::now(format!("https://example.com/{}", i)))
                .unwrap();
        }
        let query = VisitsQuery::from_store(&store);

        let first = query.get_visits(&VisitQueryOptions::default()).unwrap();
        assert_eq!(first.pagination.total, 45);
        assert_eq!(first.pagination.total_pages, 3);
        assert_eq!(first.data.len(), 20);

        let last = query
            .get_visits(&VisitQueryOptions {
                page: 3,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(last.data.len(), 5);

        let beyond = query
            .get_visits(&VisitQueryOptions {
                page: 4,
                ..Default::default()
            })
            .unwrap();
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.pagination.total, 45);
    }

    #[test]
    fn test_empty_table() {
        let (_dir, store) = open_temp();
        let result = VisitsQuery::from_store(&store)
            .get_visits(&VisitQueryOptions::default())
            .unwrap();
        assert!(result.data.is_empty());
        assert_eq!(result.pagination.total, 0);
        assert_eq!(result.pagination.total_pages, 0);
    }

    #[test]
    fn test_zero_page_and_limit_are_clamped() {
        let (_dir, store) = open_temp();
        store.insert_visit(&NewVisit::now("https://example.com/")).unwrap();
        let result = VisitsQuery::from_store(&store)
            .get_visits(&VisitQueryOptions {
                page: 0,
                limit: 0,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(result.pagination.page, 1);
        assert_eq!(result.pagination.limit, 1);
        assert_eq!(result.data.len(), 1);
    }

    #[test]
    fn test_sort_by_url_ascending() {
        let (_dir, store) = open_temp();
        for url in ["https://c.example/", "https://a.example/", "https://b.example/"] {
            store.insert_visit(&NewVisit::now(url)).unwrap();
        }
        let result = VisitsQuery::from_store(&store)
            .get_visits(&VisitQueryOptions {
                sort_by: SortField::Url,
                sort_order: SortOrder::Asc,
                ..Default::default()
            })
            .unwrap();
        let urls: Vec<_> = result.data.iter().map(|v| v.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.example/", "https://b.example/", "https://c.example/"]
        );
    }

    #[test]
    fn test_filter_helpers() {
        let (_dir, store) = open_temp();
        store
            .insert_visit(&visit("https://example.com/blog/1", "10.0.0.1", CHROME_WINDOWS, 0))
            .unwrap();
        store
            .insert_visit(&visit("https://example.com/blog/2", "10.0.0.2", CHROME_WINDOWS, 0))
            .unwrap();
        store
            .insert_visit(&visit("https://example.com/about", "10.0.0.1", CHROME_WINDOWS, 0))
            .unwrap();
        let query = VisitsQuery::from_store(&store);
        let opts = VisitQueryOptions::default();

        assert_eq!(query.get_visits_by_url("/blog/", &opts).unwrap().pagination.total, 2);
        assert_eq!(query.get_visits_by_ip("10.0.0.1", &opts).unwrap().pagination.total, 2);
        assert_eq!(
            query
                .get_visits_by_date_range("2000-01-01", "2999-12-31", &opts)
                .unwrap()
                .pagination
                .total,
            3
        );
        assert_eq!(
            query
                .get_visits_by_date_range("2999-01-01", "2999-12-31", &opts)
                .unwrap()
                .pagination
                .total,
            0
        );
    }

    #[test]
    fn test_filter_values_are_not_spliced() {
        let (_dir, store) = open_temp();
        store.insert_visit(&NewVisit::now("https://example.com/")).unwrap();
        let result = VisitsQuery::from_store(&store)
            .get_visits(&VisitQueryOptions {
                filters: VisitFilters {
                    ip: Some("' OR '1'='1".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();
        assert_eq!(result.pagination.total, 0);
    }
}
