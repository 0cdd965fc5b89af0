use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::{ListQuery, ProductNotification, Resource, ResourceStore};
use crate::api::ApiError;

impl ResourceStore<ProductNotification> {
    /// Only alert-type notifications
    pub async fn fetch_alerts(&mut self) {
        let path = format!("{}alerts/", ProductNotification::PATH);
        self.load_list(&path, &ListQuery::new()).await;
    }

    /// Mark a notification as acknowledged. The updated record replaces the
    /// stale copy in `items` and becomes the current `item`.
    pub async fn acknowledge(&mut self, id: i64) -> Result<ProductNotification, ApiError> {
        let path = format!("{}{}/acknowledge/", ProductNotification::PATH, id);
        match self.api().post_empty::<ProductNotification>(&path).await {
            Ok(updated) => {
                info!(notification_id = id, "Notification acknowledged");
                self.replace(&updated);
                self.item = Some(updated.clone());
                Ok(updated)
            }
            Err(e) => {
                warn!(notification_id = id, error = %e, "Acknowledge failed");
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }
}

/// Notifications timestamped within `[start, end]`. Without both bounds
/// everything is returned.
pub fn in_window(
    items: &[ProductNotification],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<&ProductNotification> {
    match (start, end) {
        (Some(start), Some(end)) => items
            .iter()
            .filter(|n| n.timestamp >= start && n.timestamp <= end)
            .collect(),
        _ => items.iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::api_for;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification(id: i64, timestamp: &str, acknowledged: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "notication_type": "alert",
            "productevent": 31,
            "requirement": "Max temperature",
            "order": 12,
            "timestamp": timestamp,
            "created_timestamp": timestamp,
            "message": "Temperature above limit",
            "acknowledged_timestamp": acknowledged,
            "acknowledged_by": acknowledged.map(|_| 7)
        })
    }

    #[tokio::test]
    async fn test_fetch_alerts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/productevent/alerts/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([notification(1, "2024-05-03T08:00:00Z", None)])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (api, _tokens) = api_for(&server);
        let mut store = ResourceStore::<ProductNotification>::new(api);
        store.fetch_alerts().await;

        assert_eq!(store.items.len(), 1);
    }

    #[tokio::test]
    async fn test_acknowledge_replaces_list_entry_and_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/productevent/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                notification(1, "2024-05-03T08:00:00Z", None),
                notification(2, "2024-05-04T08:00:00Z", None)
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/productevent/2/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(notification(2, "2024-05-04T08:00:00Z", None)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/notifications/productevent/2/acknowledge/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(notification(
                2,
                "2024-05-04T08:00:00Z",
                Some("2024-05-04T09:00:00Z"),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let (api, _tokens) = api_for(&server);
        let mut store = ResourceStore::<ProductNotification>::new(api);
        store.fetch_list(&ListQuery::new()).await;
        store.fetch_one(2).await;

        let updated = store.acknowledge(2).await.unwrap();

        assert!(updated.is_acknowledged());
        assert!(!store.items[0].is_acknowledged());
        assert!(store.items[1].is_acknowledged());
        assert!(store.item.as_ref().unwrap().is_acknowledged());
    }

    #[tokio::test]
    async fn test_acknowledge_from_list_sets_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/productevent/alerts/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([notification(4, "2024-05-03T08:00:00Z", None)])),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/notifications/productevent/4/acknowledge/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(notification(
                4,
                "2024-05-03T08:00:00Z",
                Some("2024-05-03T09:00:00Z"),
            )))
            .mount(&server)
            .await;

        let (api, _tokens) = api_for(&server);
        let mut store = ResourceStore::<ProductNotification>::new(api);
        store.fetch_alerts().await;
        assert!(store.item.is_none());

        store.acknowledge(4).await.unwrap();

        assert!(store.items[0].is_acknowledged());
        let item = store.item.as_ref().unwrap();
        assert_eq!(item.id, 4);
        assert!(item.is_acknowledged());
    }

    #[tokio::test]
    async fn test_acknowledge_failure_leaves_items() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notifications/productevent/8/acknowledge/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
            .mount(&server)
            .await;

        let (api, _tokens) = api_for(&server);
        let mut store = ResourceStore::<ProductNotification>::new(api);

        assert!(matches!(store.acknowledge(8).await, Err(ApiError::NotFound(_))));
        assert_eq!(store.error.as_deref(), Some("Not found."));
    }

    #[test]
    fn test_in_window_filters_inclusive_bounds() {
        let items: Vec<ProductNotification> = [
            "2024-05-01T00:00:00Z",
            "2024-05-15T12:00:00Z",
            "2024-06-01T00:00:00Z",
        ]
        .iter()
        .enumerate()
        .map(|(i, ts)| serde_json::from_value(notification(i as i64, ts, None)).unwrap())
        .collect();

        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap();

        let ids: Vec<i64> = in_window(&items, Some(start), Some(end)).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 1]);

        assert_eq!(in_window(&items, Some(start), None).len(), 3);
        assert_eq!(in_window(&items, None, None).len(), 3);
    }
}
