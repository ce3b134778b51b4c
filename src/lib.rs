//! # CMMS Client
//!
//! Data layer for a maintenance management (CMMS) frontend: it talks to the
//! REST backend, keeps the login session and knows the application's routes.
//!
//! ## Modules
//!
//! - [`session`]: Token store with pluggable persistence and lifecycle events
//! - [`client`]: Authenticated HTTP client with request/response hooks
//! - [`services`]: Auth, tickets, work orders, locations and site maps
//! - [`models`]: Backend record types
//! - [`dashboard`]: Dashboard data source and mapper
//! - [`router`]: Route table and title hook
//! - [`proxy`]: Development proxy forwarding `/api/*` to the backend
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cmms::client::ApiClient;
//! use cmms::config::Config;
//! use cmms::models::Credentials;
//! use cmms::services::{AuthService, ListParams, TicketService};
//! use cmms::session::SessionStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let session = Arc::new(SessionStore::open_file(&config.session.file)?);
//!     let api = ApiClient::new(&config.api, session.clone())?;
//!
//!     let auth = AuthService::new(api.clone(), session);
//!     auth.login(&Credentials::new("ana@example.com", "secret")).await?;
//!
//!     let tickets = TicketService::new(api);
//!     let page = tickets.list(&ListParams::new().search("leak")).await?;
//!     println!("{} tickets", page.count);
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod dashboard;
pub mod models;
pub mod proxy;
pub mod router;
pub mod services;
pub mod session;

pub use client::{ApiClient, ClientError, ClientResult};
pub use config::Config;
pub use router::{RouteTable, Router, View};
pub use session::{SessionAccessor, SessionEvent, SessionStore};
