//! Wire models for the dashboard API.
//!
//! Field names follow the API's snake_case JSON. Server-generated
//! timestamps are RFC 3339 and parse straight into `DateTime<Utc>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Resource;

// ============================================================================
// Accounts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Company {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserCompany {
    pub company: Company,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserRole {
    pub role_name: String,
    #[serde(default)]
    pub company: Option<Company>,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
}

/// The logged-in user as returned by `/api/user_self/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub companies: Vec<UserCompany>,
    #[serde(default)]
    pub roles: Vec<UserRole>,
}

impl User {
    /// "First Last", falling back to the username
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// First company the user is actively assigned to
    pub fn active_company(&self) -> Option<&Company> {
        self.companies
            .iter()
            .find(|c| c.is_active)
            .map(|c| &c.company)
    }
}

// ============================================================================
// Catalog and products
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProductType {
    pub id: i64,
    pub product_number: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub owner: Option<i64>,
    #[serde(default)]
    pub recorded_by: Option<i64>,
}

/// A product as embedded in another product's component list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NestedProduct {
    pub id: i64,
    pub product_key: String,
    #[serde(default)]
    pub product_type: Option<i64>,
    #[serde(default)]
    pub batch: String,
    #[serde(default)]
    pub owner: Option<i64>,
    pub created_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProductComponent {
    pub component: NestedProduct,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Product {
    pub id: i64,
    pub product_key: String,
    #[serde(default)]
    pub product_type: Option<i64>,
    #[serde(default)]
    pub batch: String,
    #[serde(default)]
    pub owner: Option<i64>,
    #[serde(default)]
    pub owner_name: Option<String>,
    pub created_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub components: Vec<ProductComponent>,
    #[serde(default)]
    pub recorded_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProductEvent {
    pub message_id: String,
    pub product: i64,
    #[serde(default)]
    pub trackerevent: Option<String>,
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data_hash: Option<String>,
    #[serde(default)]
    pub data_uri: Option<String>,
    #[serde(default)]
    pub recorded_by: Option<i64>,
    pub created_timestamp: DateTime<Utc>,
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProductOrderItem {
    pub product: i64,
    pub product_key: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProductOrderRequirement {
    pub requirement: i64,
    pub requirement_name: String,
    pub unit: String,
    pub assigned_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProductOrderTracker {
    pub tracker: i64,
    pub tracker_identifier: String,
    #[serde(default)]
    pub assigned_timestamp: Option<DateTime<Utc>>,
    pub created_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProductOrderStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProductOrder {
    pub id: i64,
    pub order_number: String,
    pub supplier: i64,
    #[serde(default)]
    pub supplier_name: String,
    pub receiver: i64,
    #[serde(default)]
    pub receiver_name: String,
    pub order_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub delivery_location: String,
    #[serde(default)]
    pub items: Vec<ProductOrderItem>,
    #[serde(default)]
    pub order_requirements: Vec<ProductOrderRequirement>,
    #[serde(default)]
    pub order_trackers: Vec<ProductOrderTracker>,
    #[serde(default)]
    pub status_history: Vec<ProductOrderStatus>,
    #[serde(default)]
    pub current_status: Option<String>,
    pub created_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<i64>,
}

/// Order counts for a time window plus their change against the
/// preceding window of the same length
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct OrderSummary {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    pub total_orders: i64,
    pub total_orders_delta: i64,
    pub delivered_orders: i64,
    pub delivered_orders_delta: i64,
    pub in_transit_orders: i64,
    pub in_transit_orders_delta: i64,
    pub compliance_alerts: i64,
    pub compliance_alerts_delta: i64,
}

// ============================================================================
// Trackers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Tracker {
    pub id: i64,
    pub tracker_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TrackerEvent {
    pub message_id: String,
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data_hash: Option<String>,
    #[serde(default)]
    pub block_id: Option<String>,
    pub created_timestamp: DateTime<Utc>,
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Alert,
    Notification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProductNotification {
    pub id: i64,
    /// The API spells this field `notication_type`
    #[serde(rename = "notication_type")]
    pub kind: NotificationKind,
    pub productevent: i64,
    #[serde(default)]
    pub requirement: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub created_timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(default)]
    pub acknowledged_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub acknowledged_by: Option<i64>,
}

impl ProductNotification {
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_timestamp.is_some()
    }
}

// ============================================================================
// Resource bindings
// ============================================================================

impl Resource for ProductType {
    const PATH: &'static str = "/api/producttypes/";
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Resource for Product {
    const PATH: &'static str = "/api/products/";
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Resource for ProductEvent {
    const PATH: &'static str = "/api/productevents/";
    fn key(&self) -> String {
        self.message_id.clone()
    }
}

impl Resource for ProductOrder {
    const PATH: &'static str = "/api/productorders/";
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Resource for Tracker {
    const PATH: &'static str = "/api/trackers/";
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Resource for TrackerEvent {
    const PATH: &'static str = "/api/trackerevents/";
    fn key(&self) -> String {
        self.message_id.clone()
    }
}

impl Resource for ProductNotification {
    const PATH: &'static str = "/api/notifications/productevent/";
    fn key(&self) -> String {
        self.id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_self() {
        let json = r#"{"id": 7, "username": "ops", "first_name": "Ana", "last_name": "Silva", "email": "ana@example.com",
            "companies": [{"company": {"id": 1, "name": "Acme Logistics", "type": "supplier"}, "assigned_at": "2024-03-01T09:00:00Z", "is_active": true}],
            "roles": [{"role_name": "Operator", "company": {"id": 1, "name": "Acme Logistics", "type": "supplier"}, "assigned_at": "2024-03-01T09:00:00Z"}]}"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.display_name(), "Ana Silva");
        assert_eq!(user.active_company().map(|c| c.name.as_str()), Some("Acme Logistics"));
        assert_eq!(user.roles[0].role_name, "Operator");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let user: User = serde_json::from_str(r#"{"id": 1, "username": "scanner"}"#).unwrap();
        assert_eq!(user.display_name(), "scanner");
        assert!(user.active_company().is_none());
    }

    #[test]
    fn test_parse_product_order() {
        let json = r#"{"id": 12, "order_number": "PO-0012", "supplier": 1, "supplier_name": "Acme", "receiver": 2,
            "receiver_name": "Retail Co", "order_timestamp": "2024-05-02T10:15:00.123456+00:00", "delivery_location": "Porto",
            "items": [{"product": 5, "product_key": "PK-5", "quantity": 10}],
            "order_requirements": [{"requirement": 3, "requirement_name": "Max temperature", "unit": "C", "assigned_timestamp": "2024-05-02T10:15:00Z"}],
            "order_trackers": [{"tracker": 9, "tracker_identifier": "TRK-9", "assigned_timestamp": null, "created_timestamp": "2024-05-02T10:15:00Z"}],
            "status_history": [{"status": "in_transit", "timestamp": "2024-05-03T08:00:00Z", "created_by": null}],
            "current_status": "in_transit", "created_timestamp": "2024-05-02T10:15:00Z", "created_by": 7}"#;

        let order: ProductOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.key(), "12");
        assert_eq!(order.items[0].quantity, 10);
        assert!(order.order_trackers[0].assigned_timestamp.is_none());
        assert_eq!(order.current_status.as_deref(), Some("in_transit"));
    }

    #[test]
    fn test_parse_notification_kind() {
        let json = r#"{"id": 4, "notication_type": "alert", "productevent": 31, "requirement": "Max temperature",
            "order": 12, "timestamp": "2024-05-03T08:00:00Z", "created_timestamp": "2024-05-03T08:00:01Z",
            "message": "Temperature above limit", "acknowledged_timestamp": null, "acknowledged_by": null}"#;

        let notification: ProductNotification = serde_json::from_str(json).unwrap();
        assert_eq!(notification.kind, NotificationKind::Alert);
        assert!(!notification.is_acknowledged());
    }
}
