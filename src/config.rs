//! Session configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every value has a typed default so a client with no environment at all
//! still gets a working guard (`login` / `dashboard`) and profile lookup
//! (`users` collection). Blank values count as unset.

use crate::guard::NavigationGuard;

pub const DEFAULT_LOGIN_ROUTE: &str = "login";
pub const DEFAULT_LANDING_ROUTE: &str = "dashboard";
pub const DEFAULT_PROFILE_COLLECTION: &str = "users";

pub const ENV_LOGIN_ROUTE: &str = "AUTH_LOGIN_ROUTE";
pub const ENV_LANDING_ROUTE: &str = "AUTH_LANDING_ROUTE";
pub const ENV_PROFILE_COLLECTION: &str = "AUTH_PROFILE_COLLECTION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Route name unauthenticated navigations are redirected to.
    pub login_route: String,
    /// Route name an authenticated visit to the login route is sent to.
    pub landing_route: String,
    /// Document store collection holding profile documents keyed by identity id.
    pub profile_collection: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_route: DEFAULT_LOGIN_ROUTE.to_owned(),
            landing_route: DEFAULT_LANDING_ROUTE.to_owned(),
            profile_collection: DEFAULT_PROFILE_COLLECTION.to_owned(),
        }
    }
}

impl SessionConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `AUTH_LOGIN_ROUTE`: default `login`
    /// - `AUTH_LANDING_ROUTE`: default `dashboard`
    /// - `AUTH_PROFILE_COLLECTION`: default `users`
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (environment, test map, ...).
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        Self {
            login_route: read(ENV_LOGIN_ROUTE, DEFAULT_LOGIN_ROUTE),
            landing_route: read(ENV_LANDING_ROUTE, DEFAULT_LANDING_ROUTE),
            profile_collection: read(ENV_PROFILE_COLLECTION, DEFAULT_PROFILE_COLLECTION),
        }
    }

    /// Navigation guard bound to the configured login and landing routes.
    #[must_use]
    pub fn guard(&self) -> NavigationGuard {
        NavigationGuard::new(&self.login_route, &self.landing_route)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
