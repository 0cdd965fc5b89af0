//! Command implementations. Each one prints its result to stdout; errors
//! bubble up to `main` through anyhow.

use std::io::{self, Write};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::Serialize;
use tracing::{debug, warn};

use pathledger_core::resources::{
    in_window, ListQuery, NotificationStore, OrderStore, Product, ProductEvent,
    ProductNotification, ProductOrder, ProductType, Resource, ResourceStore, Tracker,
    TrackerEvent,
};
use pathledger_core::{App, Config, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceKind {
    ProductTypes,
    Products,
    ProductEvents,
    Orders,
    Trackers,
    TrackerEvents,
    Notifications,
}

impl ResourceKind {
    /// Field that `--since` / `--until` filter on
    pub fn date_field(&self) -> &'static str {
        match self {
            ResourceKind::Orders => "order_timestamp",
            ResourceKind::ProductEvents | ResourceKind::TrackerEvents | ResourceKind::Notifications => {
                "timestamp"
            }
            _ => "created_timestamp",
        }
    }

    /// Dashboard page showing one item, for kinds that have one. Fetches
    /// with a one-time token are made from that page so a rejected token is
    /// not mistaken for an expired session.
    fn detail_page(&self, id: &str) -> Option<String> {
        match self {
            ResourceKind::ProductTypes => Some(format!("/dashboard/product_types/{}", id)),
            ResourceKind::Products => Some(format!("/dashboard/products/{}", id)),
            ResourceKind::Orders => Some(format!("/dashboard/product_orders/{}", id)),
            ResourceKind::Trackers => Some(format!("/dashboard/tracker/{}", id)),
            _ => None,
        }
    }

    /// QR page whose one-time token covers a filtered listing, such as the
    /// tracker page for that tracker's events
    fn scope_page(&self, query: &ListQuery) -> Option<String> {
        let filter = |key: &str| {
            query
                .params()
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        match self {
            ResourceKind::TrackerEvents => {
                filter("tracker").and_then(|id| ResourceKind::Trackers.detail_page(id))
            }
            ResourceKind::ProductEvents => {
                filter("productorder").and_then(|id| ResourceKind::Orders.detail_page(id))
            }
            _ => None,
        }
    }
}

/// `key=value` from `--filter`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterArg {
    pub key: String,
    pub value: String,
}

impl FromStr for FilterArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(Self {
                key: key.to_string(),
                value: value.to_string(),
            }),
            _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
        }
    }
}

/// A point in time given as RFC 3339 or as a plain date (midnight UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateArg(DateTime<Utc>);

impl FromStr for DateArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(ts.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Self(dt.and_utc()))
            .ok_or_else(|| format!("expected RFC 3339 timestamp or YYYY-MM-DD, got '{}'", s))
    }
}

impl From<DateArg> for DateTime<Utc> {
    fn from(arg: DateArg) -> Self {
        arg.0
    }
}

// ============================================================================
// Session commands
// ============================================================================

pub async fn login(app: &App, username: Option<String>, redirect: Option<String>) -> Result<()> {
    let username = match username.or_else(|| app.config().last_username.clone()) {
        Some(name) if !name.is_empty() => name,
        _ => prompt("Username: ")?,
    };
    let password = match std::env::var("PATHLEDGER_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ")?,
    };

    if let Some(redirect) = redirect {
        let login_page = Location::login_redirect(&Location::parse(&redirect));
        app.navigate(&login_page.full_path()).await?;
    }

    let location = app.login(&username, &password).await?;

    // Remember the username without persisting environment overrides
    let mut stored = Config::load_stored().unwrap_or_default();
    stored.last_username = Some(username);
    if let Err(e) = stored.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Logged in. Now at {} ({})", location, app.title());
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    app.logout()?;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(app: &App) -> Result<()> {
    if !app.is_authenticated() {
        bail!("Not logged in");
    }
    let user = app
        .current_user()
        .await
        .context("Could not load the current user")?;

    println!("{} ({})", user.display_name(), user.username);
    if !user.email.is_empty() {
        println!("Email:   {}", user.email);
    }
    if let Some(company) = user.active_company() {
        println!("Company: {}", company.name);
    }
    for role in &user.roles {
        match &role.company {
            Some(company) => println!("Role:    {} at {}", role.role_name, company.name),
            None => println!("Role:    {}", role.role_name),
        }
    }
    Ok(())
}

pub async fn refresh(app: &App) -> Result<()> {
    app.refresh().await?;
    println!("Access token refreshed.");
    Ok(())
}

pub async fn open(app: &App, path: &str) -> Result<()> {
    let location = app.navigate(path).await?;
    if location.full_path() != Location::parse(path).full_path() {
        println!("Redirected.");
    }
    println!("{}", location);
    println!("{}", app.title());
    Ok(())
}

// ============================================================================
// Resource commands
// ============================================================================

pub fn build_query(
    page_size: Option<u32>,
    ordering: Option<String>,
    filters: Vec<FilterArg>,
    since: Option<DateArg>,
    until: Option<DateArg>,
    date_field: &str,
) -> ListQuery {
    let mut query = ListQuery::new();
    if let Some(size) = page_size {
        query = query.page_size(size);
    }
    if let Some(ordering) = ordering {
        query = query.ordering(ordering);
    }
    for filter in filters {
        query = query.filter(filter.key, filter.value);
    }
    query.between(date_field, since.map(Into::into), until.map(Into::into))
}

pub async fn list(app: &App, kind: ResourceKind, query: &ListQuery, token: Option<String>) -> Result<()> {
    if let Some(token) = token.as_deref() {
        let page = kind.scope_page(query).with_context(|| {
            format!(
                "--token on {:?} needs a filter naming the linked item (tracker=ID or productorder=ID)",
                kind
            )
        })?;
        let page = Location::parse(&page).with_query("token", token);
        app.navigate(&page.full_path()).await?;
    }

    match kind {
        ResourceKind::ProductTypes => list_as::<ProductType>(app, query, token).await,
        ResourceKind::Products => list_as::<Product>(app, query, token).await,
        ResourceKind::ProductEvents => list_as::<ProductEvent>(app, query, token).await,
        ResourceKind::Orders => list_as::<ProductOrder>(app, query, token).await,
        ResourceKind::Trackers => list_as::<Tracker>(app, query, token).await,
        ResourceKind::TrackerEvents => list_as::<TrackerEvent>(app, query, token).await,
        ResourceKind::Notifications => list_as::<ProductNotification>(app, query, token).await,
    }
}

async fn list_as<T: Resource + Serialize>(app: &App, query: &ListQuery, token: Option<String>) -> Result<()> {
    let mut store = ResourceStore::<T>::new(app.api().clone());
    store.set_one_time_token(token);
    store.fetch_list(query).await;

    if let Some(error) = store.list_error.take() {
        bail!(error);
    }
    debug!(count = store.items.len(), "Listed {}", T::PATH);
    print_json(&store.items)
}

pub async fn get(app: &App, kind: ResourceKind, id: &str, token: Option<String>) -> Result<()> {
    if let (Some(token), Some(page)) = (token.as_deref(), kind.detail_page(id)) {
        let page = Location::parse(&page).with_query("token", token);
        app.navigate(&page.full_path()).await?;
    }

    match kind {
        ResourceKind::ProductTypes => get_as::<ProductType>(app, id, token).await,
        ResourceKind::Products => get_as::<Product>(app, id, token).await,
        ResourceKind::ProductEvents => get_as::<ProductEvent>(app, id, token).await,
        ResourceKind::Orders => get_as::<ProductOrder>(app, id, token).await,
        ResourceKind::Trackers => get_as::<Tracker>(app, id, token).await,
        ResourceKind::TrackerEvents => get_as::<TrackerEvent>(app, id, token).await,
        ResourceKind::Notifications => get_as::<ProductNotification>(app, id, token).await,
    }
}

async fn get_as<T: Resource + Serialize>(app: &App, id: &str, token: Option<String>) -> Result<()> {
    let mut store = ResourceStore::<T>::new(app.api().clone());
    store.set_one_time_token(token);
    store.fetch_one(id).await;

    if let Some(error) = store.error.take() {
        bail!(error);
    }
    match &store.item {
        Some(item) => print_json(item),
        None => bail!("Nothing returned for {}{}/", T::PATH, id),
    }
}

pub async fn summary(app: &App, since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Result<()> {
    let mut orders = OrderStore::new(app.api().clone());
    let mut notifications = NotificationStore::new(app.api().clone());

    let (summary, ()) = futures::join!(
        orders.fetch_summary(since, until),
        notifications.fetch_alerts()
    );

    let summary = match summary {
        Some(summary) => summary,
        None => bail!(orders.list_error.take().unwrap_or_else(|| "Summary unavailable".into())),
    };

    println!("Total orders:      {:>6} ({:+})", summary.total_orders, summary.total_orders_delta);
    println!("Delivered:         {:>6} ({:+})", summary.delivered_orders, summary.delivered_orders_delta);
    println!("In transit:        {:>6} ({:+})", summary.in_transit_orders, summary.in_transit_orders_delta);
    println!("Compliance alerts: {:>6} ({:+})", summary.compliance_alerts, summary.compliance_alerts_delta);

    match notifications.list_error {
        Some(error) => println!("\nAlerts unavailable: {}", error),
        None => {
            let open: Vec<_> = in_window(&notifications.items, since, until)
                .into_iter()
                .filter(|n| !n.is_acknowledged())
                .collect();
            println!("\nOpen alerts in window: {}", open.len());
            for alert in open {
                print_notification(alert);
            }
        }
    }
    Ok(())
}

pub async fn alerts(app: &App) -> Result<()> {
    let mut store = NotificationStore::new(app.api().clone());
    store.fetch_alerts().await;

    if let Some(error) = store.list_error.take() {
        bail!(error);
    }
    if store.items.is_empty() {
        println!("No alerts.");
    }
    for alert in &store.items {
        print_notification(alert);
    }
    Ok(())
}

pub async fn ack(app: &App, id: i64) -> Result<()> {
    let mut store = NotificationStore::new(app.api().clone());
    let updated = store
        .acknowledge(id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    print_notification(&updated);
    Ok(())
}

// ============================================================================
// Output helpers
// ============================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_notification(n: &ProductNotification) {
    let state = if n.is_acknowledged() { "ack" } else { "open" };
    println!(
        "#{:<5} {:<5} {}  {}",
        n.id,
        state,
        n.timestamp.format("%Y-%m-%d %H:%M"),
        n.message
    );
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_string();
    if input.is_empty() {
        bail!("Username required");
    }
    Ok(input)
}
