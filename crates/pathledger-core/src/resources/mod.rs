//! Per-resource stores on top of `ApiClient`.
//!
//! Each resource type binds to its collection path through `Resource`, and
//! `ResourceStore<T>` keeps the list, the selected item, and their loading
//! and error state. Endpoints specific to one resource are inherent methods
//! on its store (`catalog`, `orders`, `notifications`).

mod catalog;
mod models;
mod notifications;
mod orders;
mod query;
mod store;

pub use models::*;
pub use notifications::in_window;
pub use query::ListQuery;
pub use store::{Resource, ResourceStore};

pub type ProductTypeStore = ResourceStore<ProductType>;
pub type ProductStore = ResourceStore<Product>;
pub type ProductEventStore = ResourceStore<ProductEvent>;
pub type OrderStore = ResourceStore<ProductOrder>;
pub type TrackerStore = ResourceStore<Tracker>;
pub type TrackerEventStore = ResourceStore<TrackerEvent>;
pub type NotificationStore = ResourceStore<ProductNotification>;
