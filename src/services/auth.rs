//! Authentication service
//!
//! Obtains the token pair, caches the user profile and tears the session
//! down again. The [`SessionStore`] is shared with the [`ApiClient`], which
//! only sees it through its accessor capability.

use serde::de::IgnoredAny;
use serde_json::json;
use std::sync::Arc;

use crate::client::{ApiClient, ClientResult};
use crate::models::{Credentials, TokenPair};
use crate::session::{SessionEvent, SessionStore, UserProfile};

const TOKEN_PATH: &str = "/auth/token/";
const PROFILE_PATH: &str = "/users/me/";
const LOGOUT_PATH: &str = "/auth/logout/";

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    session: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(api: ApiClient, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Exchange credentials for a token pair.
    ///
    /// Tokens are persisted only when the response carries an access token;
    /// failing to persist the refresh token is logged and ignored. Wrong
    /// credentials fail with [`ClientError::InvalidCredentials`] and leave
    /// any stored session in place.
    ///
    /// [`ClientError::InvalidCredentials`]: crate::client::ClientError::InvalidCredentials
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<TokenPair> {
        let tokens: TokenPair = match self.api.post_anonymous(TOKEN_PATH, credentials).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::error!(resource = "auth", operation = "login", error = %e, "Login failed");
                return Err(e);
            }
        };

        match tokens.access.as_deref().filter(|t| !t.is_empty()) {
            Some(access) => {
                self.session.save(access, None)?;
                if let Some(refresh) = tokens.refresh.as_deref() {
                    if let Err(e) = self.session.save_refresh(refresh) {
                        tracing::warn!(error = %e, "Could not persist refresh token");
                    }
                }
                tracing::info!(email = %credentials.email, "Logged in");
                self.session.notify(SessionEvent::LoggedIn);
            }
            None => {
                tracing::warn!("Token response carried no access token, nothing stored");
            }
        }

        Ok(tokens)
    }

    /// Fetch the authenticated user's profile and cache it
    pub async fn fetch_user_profile(&self) -> ClientResult<UserProfile> {
        let profile: UserProfile = match self.api.get(PROFILE_PATH).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!(resource = "auth", operation = "profile", error = %e, "Fetching user profile failed");
                return Err(e);
            }
        };

        self.session.save_profile(&profile)?;
        Ok(profile)
    }

    /// Cached profile from the last successful fetch
    pub fn current_user(&self) -> Option<UserProfile> {
        self.session.load_profile()
    }

    /// Forget the session locally. Never fails.
    pub fn logout(&self) {
        tracing::info!("Logging out");
        self.session.clear();
        self.session.notify(SessionEvent::LoggedOut);
    }

    /// Log out locally, then ask the backend to blacklist the former
    /// refresh token. Backend failures are only logged.
    pub async fn logout_remote(&self) {
        let refresh = self.session.load_refresh();
        self.logout();

        let Some(refresh) = refresh else {
            return;
        };

        let body = json!({ "refresh": refresh });
        if let Err(e) = self.api.post::<IgnoredAny, _>(LOGOUT_PATH, &body).await {
            tracing::warn!(error = %e, "Failed to invalidate refresh token on the backend");
        }
    }
}
