//! Session State
//!
//! The token store: access token, refresh token and the cached user profile,
//! kept in a persistent key-value backend under three fixed keys.
//!
//! - **store**: `KeyValueStore` backends (memory, JSON file)
//! - **error**: Error types
//!
//! The HTTP client never reads the store directly. It is handed the
//! [`SessionAccessor`] capability, and the hosting application learns about
//! logins, logouts and invalidations through [`SessionStore::subscribe`].
//!
//! # Example
//!
//! ```rust
//! use cmms::session::SessionStore;
//!
//! let session = SessionStore::in_memory();
//!
//! session.save("access", Some("refresh")).unwrap();
//! assert_eq!(session.load().as_deref(), Some("access"));
//!
//! session.clear();
//! assert!(session.load().is_none());
//! ```

pub mod error;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use store::{FileStore, KeyValueStore, MemoryStore};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Storage key of the access token
pub const TOKEN_KEY: &str = "authToken";
/// Storage key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key of the JSON-encoded user profile
pub const PROFILE_KEY: &str = "user";

const EVENT_CAPACITY: usize = 16;

/// Permission level of a user
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Manager,
    Technician,
    #[default]
    Requester,
    /// A role this client does not know about yet
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Technician => "technician",
            Role::Requester => "requester",
            Role::Other(s) => s,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "admin" => Role::Admin,
            "manager" => Role::Manager,
            "technician" => Role::Technician,
            "requester" => Role::Requester,
            _ => Role::Other(s),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile of the authenticated user, as returned by `/users/me/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
}

/// Snapshot of everything the store holds
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user_profile: Option<UserProfile>,
}

/// Session lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Tokens were stored after a successful login
    LoggedIn,
    /// The user logged out
    LoggedOut,
    /// The backend rejected the stored token; the store has been cleared
    Invalidated,
}

/// Capability handed to the HTTP client
///
/// Reads the current token for the outbound hook and invalidates the session
/// for the inbound hook.
pub trait SessionAccessor: Send + Sync {
    /// Current access token, if any
    fn access_token(&self) -> Option<String>;

    /// Clear the session after the backend rejected `rejected`.
    ///
    /// Returns `true` only for the call that actually cleared a session.
    fn invalidate(&self, rejected: Option<&str>) -> bool;
}

/// The token store
pub struct SessionStore {
    backend: Box<dyn KeyValueStore>,
    /// Serializes compound read-modify-write operations
    guard: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Create a store over any backend
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend: Box::new(backend),
            guard: Mutex::new(()),
            events,
        }
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Store persisted to a JSON file
    pub fn open_file(path: impl Into<PathBuf>) -> SessionResult<Self> {
        Ok(Self::new(FileStore::open(path)?))
    }

    /// Persist the token pair. The refresh token is only written when given.
    pub fn save(&self, access_token: &str, refresh_token: Option<&str>) -> SessionResult<()> {
        let _lock = self.lock();
        self.backend.set(TOKEN_KEY, access_token)?;
        if let Some(refresh) = refresh_token {
            self.backend.set(REFRESH_TOKEN_KEY, refresh)?;
        }
        Ok(())
    }

    /// Persist only the refresh token
    pub fn save_refresh(&self, refresh_token: &str) -> SessionResult<()> {
        let _lock = self.lock();
        self.backend.set(REFRESH_TOKEN_KEY, refresh_token)
    }

    /// Current access token
    pub fn load(&self) -> Option<String> {
        self.read_key(TOKEN_KEY)
    }

    /// Current refresh token
    pub fn load_refresh(&self) -> Option<String> {
        self.read_key(REFRESH_TOKEN_KEY)
    }

    /// Remove the tokens and the cached profile. Never fails.
    pub fn clear(&self) {
        let _lock = self.lock();
        self.clear_locked();
    }

    /// Cache the user profile
    pub fn save_profile(&self, profile: &UserProfile) -> SessionResult<()> {
        let encoded = serde_json::to_string(profile)?;
        let _lock = self.lock();
        self.backend.set(PROFILE_KEY, &encoded)
    }

    /// Cached user profile; an undecodable entry reads as absent
    pub fn load_profile(&self) -> Option<UserProfile> {
        let raw = self.read_key(PROFILE_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed cached user profile");
                None
            }
        }
    }

    /// Full session, present when an access token is stored
    pub fn session(&self) -> Option<Session> {
        let access_token = self.load()?;
        Some(Session {
            access_token,
            refresh_token: self.load_refresh(),
            user_profile: self.load_profile(),
        })
    }

    /// Subscribe to session lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Publish an event to every subscriber
    pub fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read session key");
                None
            }
        }
    }

    fn clear_locked(&self) {
        for key in [TOKEN_KEY, REFRESH_TOKEN_KEY, PROFILE_KEY] {
            if let Err(e) = self.backend.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove session key");
            }
        }
    }
}

impl SessionAccessor for SessionStore {
    fn access_token(&self) -> Option<String> {
        self.load()
    }

    fn invalidate(&self, rejected: Option<&str>) -> bool {
        let _lock = self.lock();

        match (self.read_key(TOKEN_KEY), rejected) {
            (Some(current), Some(rejected)) if current == rejected => {
                self.clear_locked();
                tracing::warn!("Session invalidated by backend, credentials cleared");
                self.notify(SessionEvent::Invalidated);
                true
            }
            (Some(_), _) => {
                // A newer session was established after the request was sent
                tracing::debug!("Ignoring authentication failure for a superseded token");
                false
            }
            (None, _) => {
                self.clear_locked();
                false
            }
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.load().is_some())
            .finish()
    }
}
