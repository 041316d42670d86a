//! WHERE clause assembly
//!
//! Conditions are pushed with `?` placeholders and their values collected in
//! the same order, so user input is always bound, never spliced into SQL.

use super::types::{TimeRange, VisitFilters};
use rusqlite::types::Value;

/// Accumulates `AND`-joined conditions and their bound values
#[derive(Debug, Default)]
pub(crate) struct WhereClause {
    conditions: Vec<&'static str>,
    values: Vec<Value>,
}

impl WhereClause {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a condition with exactly one `?` placeholder
    pub(crate) fn push(&mut self, condition: &'static str, value: impl Into<Value>) {
        self.conditions.push(condition);
        self.values.push(value.into());
    }

    /// Listing filters: substring on url, equality on the rest, inclusive date bounds
    pub(crate) fn from_filters(filters: &VisitFilters) -> Self {
        let mut clause = Self::new();

        if let Some(url) = non_empty(&filters.url) {
            clause.push("url LIKE ?", format!("%{}%", url));
        }
        if let Some(ip) = non_empty(&filters.ip) {
            clause.push("ip = ?", ip.to_string());
        }
        if let Some(start) = non_empty(&filters.start_date) {
            clause.push("timestamp >= ?", start.to_string());
        }
        if let Some(end) = non_empty(&filters.end_date) {
            clause.push("timestamp <= ?", end.to_string());
        }
        if let Some(language) = non_empty(&filters.language) {
            clause.push("language = ?", language.to_string());
        }
        if let Some(timezone) = non_empty(&filters.timezone) {
            clause.push("timezone = ?", timezone.to_string());
        }

        clause
    }

    /// Time window used by the aggregate queries
    pub(crate) fn from_range(range: &TimeRange) -> Self {
        let mut clause = Self::new();

        if let Some(days) = range.days.filter(|d| *d > 0) {
            clause.push(
                "timestamp >= datetime('now', '-' || ? || ' days')",
                i64::from(days),
            );
        }
        if let Some(start) = non_empty(&range.start_date) {
            clause.push("timestamp >= ?", start.to_string());
        }
        if let Some(end) = non_empty(&range.end_date) {
            clause.push("timestamp <= ?", end.to_string());
        }

        clause
    }

    /// `WHERE a AND b`, or an empty string when there are no conditions
    pub(crate) fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// Bound values followed by `extra` (e.g. LIMIT/OFFSET)
    pub(crate) fn values_with(&self, extra: impl IntoIterator<Item = Value>) -> Vec<Value> {
        self.values.iter().cloned().chain(extra).collect()
    }

    pub(crate) fn values(&self) -> &[Value] {
        &self.values
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filters_yields_empty_clause() {
        let clause = WhereClause::from_filters(&VisitFilters::default());
        assert_eq!(clause.sql(), "");
        assert!(clause.values().is_empty());
    }

    #[test]
    fn test_filters_are_bound_in_order() {
        let filters = VisitFilters {
            url: Some("blog".to_string()),
            ip: Some("10.0.0.1".to_string()),
            timezone: Some("Europe/Berlin".to_string()),
            ..Default::default()
        };
        let clause = WhereClause::from_filters(&filters);

        assert_eq!(clause.sql(), "WHERE url LIKE ? AND ip = ? AND timezone = ?");
        assert_eq!(
            clause.values(),
            &[
                Value::Text("%blog%".to_string()),
                Value::Text("10.0.0.1".to_string()),
                Value::Text("Europe/Berlin".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_strings_are_ignored() {
        let filters = VisitFilters {
            url: Some(String::new()),
            language: Some("en-US".to_string()),
            ..Default::default()
        };
        assert_eq!(WhereClause::from_filters(&filters).sql(), "WHERE language = ?");
    }

    #[test]
    fn test_range_with_days_and_bounds() {
        let range = TimeRange {
            days: Some(7),
            start_date: Some("2024-01-01".to_string()),
            end_date: None,
        };
        let clause = WhereClause::from_range(&range);
        assert_eq!(
            clause.sql(),
            "WHERE timestamp >= datetime('now', '-' || ? || ' days') AND timestamp >= ?"
        );
        assert_eq!(
            clause.values_with([Value::Integer(10)]),
            vec![
                Value::Integer(7),
                Value::Text("2024-01-01".to_string()),
                Value::Integer(10),
            ]
        );
    }
}
