use std::fmt;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::ListQuery;
use crate::api::{ApiClient, ApiError};

/// A REST collection under `PATH`, with items addressed as `PATH<key>/`.
pub trait Resource: DeserializeOwned + Clone + Send + Sync + 'static {
    const PATH: &'static str;

    /// Identifier used in detail URLs and to match updated items
    fn key(&self) -> String;
}

/// List and detail state for one resource type.
///
/// Every fetch records its outcome in the store: data on success, a
/// readable message in `list_error` / `error` on failure. Fetches never
/// return errors to the caller.
pub struct ResourceStore<T: Resource> {
    api: ApiClient,
    one_time_token: Option<String>,

    pub items: Vec<T>,
    pub list_loading: bool,
    pub list_error: Option<String>,

    pub item: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T: Resource> ResourceStore<T> {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            one_time_token: None,
            items: Vec::new(),
            list_loading: false,
            list_error: None,
            item: None,
            loading: false,
            error: None,
        }
    }

    /// Token from a QR link, sent as `?token=` on reads
    pub fn set_one_time_token(&mut self, token: Option<String>) {
        self.one_time_token = token.filter(|t| !t.is_empty());
    }

    pub fn one_time_token(&self) -> Option<&str> {
        self.one_time_token.as_deref()
    }

    pub(crate) fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Fetch the collection
    pub async fn fetch_list(&mut self, query: &ListQuery) {
        let query = query.clone().one_time_token(self.one_time_token.as_deref());
        self.load_list(T::PATH, &query).await;
    }

    /// Fetch a single item by key
    pub async fn fetch_one(&mut self, key: impl fmt::Display) {
        let path = format!("{}{}/", T::PATH, key);
        let query = ListQuery::new().one_time_token(self.one_time_token.as_deref());

        self.loading = true;
        self.error = None;

        match self.api.get_json_with::<T>(&path, query.params()).await {
            Ok(item) => self.item = Some(item),
            Err(e) => {
                warn!(path = %path, error = %e, "Fetch failed");
                self.error = Some(e.user_message());
            }
        }

        self.loading = false;
    }

    /// Create an item; on success it is prepended to `items`. Unlike the
    /// fetches, the error is also returned so a form can react to it.
    pub async fn create<B: Serialize + ?Sized>(&mut self, payload: &B) -> Result<T, ApiError> {
        self.loading = true;
        self.error = None;

        let result = self.api.post_json::<T, B>(T::PATH, payload).await;
        self.loading = false;

        match result {
            Ok(created) => {
                debug!(path = T::PATH, key = %created.key(), "Created");
                self.items.insert(0, created.clone());
                Ok(created)
            }
            Err(e) => {
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    pub fn clear_item(&mut self) {
        self.item = None;
        self.error = None;
    }

    pub fn clear_list(&mut self) {
        self.items.clear();
        self.list_error = None;
    }

    /// Reset list and detail state
    pub fn clear(&mut self) {
        self.clear_item();
        self.clear_list();
    }

    pub(crate) async fn load_list(&mut self, path: &str, query: &ListQuery) {
        self.list_loading = true;
        self.list_error = None;

        match self.api.get_json_with::<Vec<T>>(path, query.params()).await {
            Ok(items) => {
                debug!(path = path, count = items.len(), "List loaded");
                self.items = items;
            }
            Err(e) => {
                warn!(path = path, error = %e, "List fetch failed");
                self.list_error = Some(e.user_message());
            }
        }

        self.list_loading = false;
    }

    /// Swap in an updated copy wherever the item is held
    pub(crate) fn replace(&mut self, updated: &T) {
        let key = updated.key();
        if let Some(slot) = self.items.iter_mut().find(|i| i.key() == key) {
            *slot = updated.clone();
        }
        if self.item.as_ref().map(|i| i.key() == key).unwrap_or(false) {
            self.item = Some(updated.clone());
        }
    }
}
