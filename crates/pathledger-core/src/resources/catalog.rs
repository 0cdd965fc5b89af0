use std::fmt;

use super::{ListQuery, Product, ProductEvent, Resource, ResourceStore, TrackerEvent};

/// Page size used when a product's full event history is wanted in one go
const EVENT_HISTORY_PAGE_SIZE: u32 = 1000;

impl ResourceStore<Product> {
    /// Products shipped under one order
    pub async fn fetch_by_order(&mut self, order_id: impl fmt::Display) {
        let path = format!("{}order/{}/", Product::PATH, order_id);
        let query = ListQuery::new().one_time_token(self.one_time_token());
        self.load_list(&path, &query).await;
    }
}

impl ResourceStore<ProductEvent> {
    /// Event history of one product, through the product's own endpoint
    pub async fn fetch_for_product(&mut self, product_id: impl fmt::Display) {
        let path = format!("/api/products/{}/events/", product_id);
        let query = ListQuery::new().one_time_token(self.one_time_token());
        self.load_list(&path, &query).await;
    }

    /// Events of every product in an order, newest first
    pub async fn fetch_for_order(&mut self, order_id: impl fmt::Display) {
        let query = ListQuery::new()
            .filter("productorder", order_id)
            .ordering("-timestamp")
            .page_size(EVENT_HISTORY_PAGE_SIZE);
        self.fetch_list(&query).await;
    }
}

impl ResourceStore<TrackerEvent> {
    pub async fn fetch_for_tracker(&mut self, tracker_id: impl fmt::Display) {
        self.fetch_list(&ListQuery::new().filter("tracker", tracker_id))
            .await;
    }
}
