//! Static route table for the dashboard.
//!
//! Each route declares a title and exactly one `AccessPolicy`. The guard in
//! `router` consults this table as plain data; nothing here knows about
//! tokens or sessions.

use std::fmt;

use url::form_urlencoded;

/// Who may enter a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessPolicy {
    /// Reachable without credentials
    Public,
    /// Requires a stored access token
    RequiresSession,
    /// Requires a stored access token, or a one-time `token` query value
    /// (QR code links to products, orders and trackers)
    RequiresSessionOrToken,
}

impl AccessPolicy {
    /// Map route metadata flags to a policy. `requires_auth` defaults to true
    /// and `has_qr_auth` to false; a route marked public stays public.
    pub fn from_flags(requires_auth: bool, has_qr_auth: bool) -> Self {
        if !requires_auth {
            AccessPolicy::Public
        } else if has_qr_auth {
            AccessPolicy::RequiresSessionOrToken
        } else {
            AccessPolicy::RequiresSession
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    Landing,
    Login,
    Dashboard,
    Home,
    Products,
    Product,
    ProductTypes,
    ProductType,
    ProductOrders,
    ProductOrder,
    Tracker,
    User,
    Settings,
    NotFound,
}

impl RouteName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteName::Landing => "landing",
            RouteName::Login => "login",
            RouteName::Dashboard => "dashboard",
            RouteName::Home => "home",
            RouteName::Products => "products_index",
            RouteName::Product => "product_index",
            RouteName::ProductTypes => "product_types_index",
            RouteName::ProductType => "product_type_index",
            RouteName::ProductOrders => "product_orders_index",
            RouteName::ProductOrder => "product_order_index",
            RouteName::Tracker => "tracker_index",
            RouteName::User => "user_index",
            RouteName::Settings => "settings_index",
            RouteName::NotFound => "not-found",
        }
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct Route {
    pub name: RouteName,
    /// Path pattern; `:name` segments capture a parameter
    pub path: &'static str,
    pub title: &'static str,
    pub policy: AccessPolicy,
    /// Route-level redirect applied before the guard runs
    pub redirect: Option<&'static str>,
}

impl Route {
    const fn new(name: RouteName, path: &'static str, title: &'static str, policy: AccessPolicy) -> Self {
        Self {
            name,
            path,
            title,
            policy,
            redirect: None,
        }
    }

    fn matches(&self, path: &str) -> Option<Vec<(&'static str, String)>> {
        let pattern: Vec<&'static str> = segments(self.path).collect();
        let actual: Vec<&str> = segments(path).collect();
        if pattern.len() != actual.len() {
            return None;
        }

        let mut params = Vec::new();
        for (expected, got) in pattern.into_iter().zip(actual) {
            if let Some(name) = expected.strip_prefix(':') {
                params.push((name, got.to_string()));
            } else if expected != got {
                return None;
            }
        }
        Some(params)
    }
}

use AccessPolicy::{Public, RequiresSession, RequiresSessionOrToken};

pub const HOME_PATH: &str = "/dashboard/home";
pub const LOGIN_PATH: &str = "/login";

/// Query parameter carrying a one-time QR token
pub const TOKEN_PARAM: &str = "token";

/// Query parameter on the login page naming where to go after login
pub const REDIRECT_PARAM: &str = "redirect";

pub static ROUTES: &[Route] = &[
    Route::new(RouteName::Landing, "/", "Path Ledger", Public),
    Route::new(RouteName::Login, LOGIN_PATH, "Login", Public),
    Route {
        redirect: Some(HOME_PATH),
        ..Route::new(RouteName::Dashboard, "/dashboard", "Dashboard", RequiresSession)
    },
    Route::new(RouteName::Home, HOME_PATH, "Home", RequiresSession),
    Route::new(RouteName::Products, "/dashboard/products", "Products", RequiresSession),
    Route::new(RouteName::Product, "/dashboard/products/:id", "Product", RequiresSessionOrToken),
    Route::new(RouteName::ProductTypes, "/dashboard/product_types", "Catalog", RequiresSession),
    Route::new(RouteName::ProductType, "/dashboard/product_types/:id", "Type", RequiresSessionOrToken),
    Route::new(RouteName::ProductOrders, "/dashboard/product_orders", "Orders", RequiresSession),
    Route::new(RouteName::ProductOrder, "/dashboard/product_orders/:id", "Order", RequiresSessionOrToken),
    Route::new(RouteName::Tracker, "/dashboard/tracker/:id", "Tracker", RequiresSessionOrToken),
    Route::new(RouteName::User, "/dashboard/user", "User", RequiresSession),
    Route::new(RouteName::Settings, "/dashboard/settings", "Settings", RequiresSession),
];

/// Catch-all for paths no route matches
pub static NOT_FOUND: Route = Route::new(RouteName::NotFound, "/:pathMatch", "Page Not Found", RequiresSession);

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Look up a route by name
pub fn route(name: RouteName) -> &'static Route {
    ROUTES
        .iter()
        .find(|r| r.name == name)
        .unwrap_or(&NOT_FOUND)
}

/// A route table hit plus the captured path parameters
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: &'static Route,
    pub params: Vec<(&'static str, String)>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Resolve a path against the route table, falling back to `NOT_FOUND`
pub fn resolve(path: &str) -> RouteMatch {
    ROUTES
        .iter()
        .find_map(|route| route.matches(path).map(|params| RouteMatch { route, params }))
        .unwrap_or_else(|| RouteMatch {
            route: &NOT_FOUND,
            params: Vec::new(),
        })
}

/// A navigation target: path plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    path: String,
    query: Vec<(String, String)>,
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: normalize(&path.into()),
            query: Vec::new(),
        }
    }

    /// Parse `"/path?a=1&b=2"` into a location
    pub fn parse(full_path: &str) -> Self {
        let (path, query) = match full_path.split_once('?') {
            Some((path, query)) => (path, query),
            None => (full_path, ""),
        };
        Self {
            path: normalize(path),
            query: form_urlencoded::parse(query.as_bytes()).into_owned().collect(),
        }
    }

    pub fn login() -> Self {
        Self::new(LOGIN_PATH)
    }

    pub fn home() -> Self {
        Self::new(HOME_PATH)
    }

    /// Login page that resumes `target` after a successful login
    pub fn login_redirect(target: &Location) -> Self {
        Self::login().with_query(REDIRECT_PARAM, target.full_path())
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// First value of a query parameter
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Non-empty one-time QR token carried in the query
    pub fn one_time_token(&self) -> Option<&str> {
        self.query_value(TOKEN_PARAM).filter(|t| !t.is_empty())
    }

    /// Path plus encoded query string
    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{}", self.path, query)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    let joined = segments(trimmed).collect::<Vec<_>>().join("/");
    format!("/{}", joined)
}
