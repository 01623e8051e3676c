//! Navigation guard and route table.
//!
//! DESIGN
//! ======
//! [`NavigationGuard::decide`] is a pure function of the target route and a
//! session snapshot. It reads only the published status, never local
//! storage, so a stale `isAuthenticated` flag cannot open a protected view.
//! Sessions that are still `Unknown` or `Loading` count as signed out;
//! the routing layer re-runs the guard once the snapshot settles.
//!
//! TRADE-OFFS
//! ==========
//! This is a UX convenience. Protected data must still be enforced by the
//! backend; the guard only decides which view to show.

use crate::state::session::Session;

/// A navigable view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub path: String,
    pub requires_auth: bool,
}

impl Route {
    pub fn public(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self { name: name.into(), path: path.into(), requires_auth: false }
    }

    pub fn protected(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self { name: name.into(), path: path.into(), requires_auth: true }
    }
}

/// Declared routes plus path aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
    /// Path -> route name.
    aliases: Vec<(String, String)>,
}

impl Default for RouteTable {
    /// `/` aliases the login view; the app views require authentication.
    fn default() -> Self {
        Self::new()
            .with_route(Route::public("login", "/login"))
            .with_route(Route::protected("dashboard", "/dashboard"))
            .with_route(Route::protected("branches", "/branches"))
            .with_route(Route::protected("services", "/services"))
            .with_alias("/", "login")
    }
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self { routes: Vec::new(), aliases: Vec::new() }
    }

    #[must_use]
    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.retain(|r| r.name != route.name);
        self.routes.push(route);
        self
    }

    #[must_use]
    pub fn with_alias(mut self, path: impl Into<String>, route_name: impl Into<String>) -> Self {
        self.aliases.push((path.into(), route_name.into()));
        self
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Route for a request path. Trailing slashes are ignored and aliases
    /// are followed once.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let trimmed = path.trim_end_matches('/');
        let path = if trimmed.is_empty() { "/" } else { trimmed };
        if let Some(route) = self.routes.iter().find(|r| r.path == path) {
            return Some(route);
        }
        self.aliases
            .iter()
            .find(|(alias, _)| alias == path)
            .and_then(|(_, name)| self.by_name(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}

/// Outcome of a navigation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Navigate to the named route instead.
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationGuard {
    login_route: String,
    landing_route: String,
}

impl NavigationGuard {
    pub fn new(login_route: impl Into<String>, landing_route: impl Into<String>) -> Self {
        Self { login_route: login_route.into(), landing_route: landing_route.into() }
    }

    #[must_use]
    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    #[must_use]
    pub fn landing_route(&self) -> &str {
        &self.landing_route
    }

    #[must_use]
    pub fn decide(&self, target: &Route, session: &Session) -> Decision {
        let authenticated = session.is_authenticated();
        if target.requires_auth && !authenticated {
            return Decision::Redirect(self.login_route.clone());
        }
        if target.name == self.login_route && authenticated {
            return Decision::Redirect(self.landing_route.clone());
        }
        Decision::Allow
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
