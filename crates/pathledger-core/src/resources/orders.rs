use chrono::{DateTime, Utc};
use tracing::warn;

use super::query::format_timestamp;
use super::{ListQuery, OrderSummary, ProductOrder, ResourceStore};

const SUMMARY_PATH: &str = "/api/productorders/summary/";

impl ResourceStore<ProductOrder> {
    /// Orders placed within `[start, end]`, at most `limit` of them
    pub async fn fetch_window(
        &mut self,
        limit: Option<u32>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) {
        let mut query = ListQuery::new();
        if let Some(limit) = limit.filter(|l| *l > 0) {
            query = query.page_size(limit);
        }
        let query = query.between("order_timestamp", start, end);
        self.fetch_list(&query).await;
    }

    /// Order counts for the window and their deltas against the previous
    /// window. A failure is recorded in `list_error` and yields `None`.
    pub async fn fetch_summary(
        &mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Option<OrderSummary> {
        let mut params = Vec::new();
        if let Some(start) = start {
            params.push(("start".to_string(), format_timestamp(start)));
        }
        if let Some(end) = end {
            params.push(("end".to_string(), format_timestamp(end)));
        }

        self.list_loading = true;
        self.list_error = None;
        let result = self.api().get_json_with::<OrderSummary>(SUMMARY_PATH, &params).await;
        self.list_loading = false;

        match result {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(error = %e, "Order summary fetch failed");
                self.list_error = Some(e.user_message());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::api_for;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_window_sends_limit_and_bounds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/productorders/"))
            .and(query_param("page_size", "10"))
            .and(query_param("order_timestamp__gte", "2024-05-01T00:00:00Z"))
            .and(query_param("order_timestamp__lte", "2024-05-31T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let (api, _tokens) = api_for(&server);
        let mut store = ResourceStore::<ProductOrder>::new(api);
        store
            .fetch_window(
                Some(10),
                Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
                Some(Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap()),
            )
            .await;

        assert!(store.list_error.is_none());
        assert!(store.items.is_empty());
    }

    #[tokio::test]
    async fn test_summary_parses_counts_and_deltas() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SUMMARY_PATH))
            .and(query_param("start", "2024-05-01T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "start": "2024-05-01T00:00:00Z",
                "end": "2024-05-31T00:00:00Z",
                "total_orders": 42,
                "total_orders_delta": 5,
                "delivered_orders": 30,
                "delivered_orders_delta": -2,
                "in_transit_orders": 12,
                "in_transit_orders_delta": 7,
                "compliance_alerts": 3,
                "compliance_alerts_delta": 0
            })))
            .mount(&server)
            .await;

        let (api, _tokens) = api_for(&server);
        let mut store = ResourceStore::<ProductOrder>::new(api);
        let summary = store
            .fetch_summary(Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()), None)
            .await
            .unwrap();

        assert_eq!(summary.total_orders, 42);
        assert_eq!(summary.delivered_orders_delta, -2);
        assert!(!store.list_loading);
    }

    #[tokio::test]
    async fn test_summary_failure_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SUMMARY_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (api, _tokens) = api_for(&server);
        let mut store = ResourceStore::<ProductOrder>::new(api);

        assert!(store.fetch_summary(None, None).await.is_none());
        assert!(store.list_error.is_some());
    }
}
