use chrono::{DateTime, SecondsFormat, Utc};

use crate::routes::TOKEN_PARAM;

/// Query parameters for list endpoints: filters, page size, ordering,
/// date ranges, and the one-time QR token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    params: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-match filter, e.g. `tracker=9`
    pub fn filter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn page_size(self, size: u32) -> Self {
        self.filter("page_size", size)
    }

    /// Sort field; prefix with `-` for descending
    pub fn ordering(self, field: impl Into<String>) -> Self {
        self.filter("ordering", field.into())
    }

    /// `field__gte=start`
    pub fn since(self, field: &str, start: DateTime<Utc>) -> Self {
        self.filter(format!("{}__gte", field), format_timestamp(start))
    }

    /// `field__lte=end`
    pub fn until(self, field: &str, end: DateTime<Utc>) -> Self {
        self.filter(format!("{}__lte", field), format_timestamp(end))
    }

    /// Inclusive date range; either bound may be open
    pub fn between(self, field: &str, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        let query = match start {
            Some(start) => self.since(field, start),
            None => self,
        };
        match end {
            Some(end) => query.until(field, end),
            None => query,
        }
    }

    /// Attach a one-time token, if any
    pub fn one_time_token(self, token: Option<&str>) -> Self {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => self.filter(TOKEN_PARAM, token),
            None => self,
        }
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
