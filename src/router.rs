//! Route Table
//!
//! An ordered list of path patterns, first match wins, with the catch-all
//! placed last. Patterns are made of literal segments, `:param` segments and
//! an optional trailing `*rest` wildcard. Trailing slashes, query strings and
//! fragments are ignored when matching.
//!
//! [`Router`] resolves a path, follows redirects, then runs the
//! before-each hooks. The built-in hook sets the document title to
//! `"<route title> - CMMS Pro"`; hooks cannot cancel a navigation.

use std::collections::BTreeMap;
use std::fmt;

/// Application name appended to every document title
pub const APP_TITLE: &str = "CMMS Pro";

const MAX_REDIRECTS: usize = 8;

/// Screen a route renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Login,
    Dashboard,
    WorkOrders,
    Assets,
    AssetDetail,
    Tickets,
    Inventory,
    PartDetail,
    PreventiveMaintenance,
    Reports,
    Users,
    Locations,
    TechnicianPortal,
    NotFound,
}

impl View {
    /// Route name
    pub fn name(&self) -> &'static str {
        match self {
            View::Login => "login",
            View::Dashboard => "dashboard",
            View::WorkOrders => "work-orders",
            View::Assets => "assets",
            View::AssetDetail => "asset-detail",
            View::Tickets => "tickets",
            View::Inventory => "inventory",
            View::PartDetail => "part-detail",
            View::PreventiveMaintenance => "preventive-maintenance",
            View::Reports => "reports",
            View::Users => "users",
            View::Locations => "locations",
            View::TechnicianPortal => "technician-portal",
            View::NotFound => "not-found",
        }
    }

    /// Whether the view renders inside the main layout (navigation shell)
    pub fn uses_main_layout(&self) -> bool {
        !matches!(self, View::Login | View::NotFound)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a matched route does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    View(View),
    Redirect(&'static str),
}

/// One entry of the table
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub pattern: &'static str,
    pub target: Target,
    pub title: Option<&'static str>,
}

impl Route {
    pub const fn view(pattern: &'static str, view: View, title: &'static str) -> Self {
        Self {
            pattern,
            target: Target::View(view),
            title: Some(title),
        }
    }

    pub const fn redirect(pattern: &'static str, to: &'static str) -> Self {
        Self {
            pattern,
            target: Target::Redirect(to),
            title: None,
        }
    }

    /// Match a normalized path, capturing parameters
    fn matches(&self, segments: &[&str]) -> Option<BTreeMap<String, String>> {
        let pattern: Vec<&str> = split(self.pattern);
        let mut params = BTreeMap::new();

        for (i, part) in pattern.iter().enumerate() {
            if let Some(name) = part.strip_prefix('*') {
                params.insert(name.to_string(), segments.get(i..)?.join("/"));
                return Some(params);
            }

            let segment = segments.get(i)?;
            if let Some(name) = part.strip_prefix(':') {
                params.insert(name.to_string(), decode(segment));
            } else if !part.eq_ignore_ascii_case(segment) {
                return None;
            }
        }

        (segments.len() == pattern.len()).then_some(params)
    }
}

/// Result of matching a path
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: BTreeMap<String, String>,
}

/// Ordered route table
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The application's routes
    pub fn standard() -> Self {
        Self::new(vec![
            Route::view("/login", View::Login, "Login"),
            Route::view("/dashboard", View::Dashboard, "Dashboard"),
            Route::view("/work-orders", View::WorkOrders, "Work Orders"),
            Route::view("/assets", View::Assets, "Assets"),
            Route::view("/assets/:id", View::AssetDetail, "Asset Details"),
            Route::view("/tickets", View::Tickets, "Tickets"),
            Route::view("/inventory", View::Inventory, "Inventory"),
            Route::view("/inventory/part/:id", View::PartDetail, "Part Details"),
            Route::view(
                "/preventive-maintenance",
                View::PreventiveMaintenance,
                "Preventive Maintenance",
            ),
            Route::view("/reports", View::Reports, "Reports"),
            Route::view("/users", View::Users, "User Management"),
            Route::view("/locations", View::Locations, "Location Management"),
            Route::view("/technician-portal", View::TechnicianPortal, "Technician Portal"),
            Route::redirect("/", "/dashboard"),
            Route::view("/*path", View::NotFound, "404 - Not Found"),
        ])
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route matching `path`
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        let segments = split(strip_query(path));
        self.routes.iter().find_map(|route| {
            route
                .matches(&segments)
                .map(|params| RouteMatch { route, params })
        })
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// A completed navigation
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    /// Path after redirects
    pub path: String,
    pub view: View,
    pub params: BTreeMap<String, String>,
    pub title: Option<&'static str>,
}

/// State hooks may touch
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            title: APP_TITLE.to_string(),
        }
    }
}

/// Runs before a navigation completes
pub type BeforeEach = Box<dyn Fn(&Navigation, &mut Document) + Send + Sync>;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RouterError {
    #[error("No route matches {0}")]
    NoMatch(String),

    #[error("Too many redirects at {0}")]
    RedirectLoop(String),
}

/// Navigator over a route table
pub struct Router {
    table: RouteTable,
    hooks: Vec<BeforeEach>,
    document: Document,
    current: Option<Navigation>,
}

impl Router {
    /// Router with the title hook installed
    pub fn new(table: RouteTable) -> Self {
        let mut router = Self {
            table,
            hooks: Vec::new(),
            document: Document::default(),
            current: None,
        };
        router.before_each(Box::new(set_title));
        router
    }

    /// Register a hook; hooks run in registration order
    pub fn before_each(&mut self, hook: BeforeEach) {
        self.hooks.push(hook);
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn current(&self) -> Option<&Navigation> {
        self.current.as_ref()
    }

    /// Resolve `path` without navigating, following redirects
    pub fn resolve(&self, path: &str) -> Result<Navigation, RouterError> {
        let mut path = path.to_string();

        for _ in 0..=MAX_REDIRECTS {
            let found = self
                .table
                .resolve(&path)
                .ok_or_else(|| RouterError::NoMatch(path.clone()))?;

            match found.route.target {
                Target::Redirect(to) => {
                    tracing::debug!(from = %path, to, "Redirecting");
                    path = to.to_string();
                }
                Target::View(view) => {
                    return Ok(Navigation {
                        path,
                        view,
                        params: found.params,
                        title: found.route.title,
                    });
                }
            }
        }

        Err(RouterError::RedirectLoop(path))
    }

    /// Navigate to `path`, running every hook before completing
    pub fn navigate(&mut self, path: &str) -> Result<&Navigation, RouterError> {
        let navigation = self.resolve(path)?;
        for hook in &self.hooks {
            hook(&navigation, &mut self.document);
        }
        tracing::debug!(path = %navigation.path, view = %navigation.view, "Navigated");
        Ok(&*self.current.insert(navigation))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouteTable::standard())
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.table.routes.len())
            .field("hooks", &self.hooks.len())
            .field("document", &self.document)
            .field("current", &self.current)
            .finish()
    }
}

/// Display title for a route title
pub fn document_title(title: Option<&str>) -> String {
    match title {
        Some(title) => format!("{} - {}", title, APP_TITLE),
        None => APP_TITLE.to_string(),
    }
}

fn set_title(navigation: &Navigation, document: &mut Document) {
    document.title = document_title(navigation.title);
}

fn strip_query(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}
