use std::error::Error;
use std::sync::Arc;

use auth_session::{
    Decision, MemoryDocumentStore, MemoryIdentityProvider, MemoryStore, Preferences, RouteTable, SessionConfig,
    SessionManager, Theme,
};
use serde_json::json;
use tracing::info;

const DEMO_EMAIL: &str = "admin@example.com";
const DEMO_PASSWORD: &str = "demo-password";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let config = SessionConfig::from_env();
    let provider = MemoryIdentityProvider::new();
    let documents = MemoryDocumentStore::new();

    let claims = json!({ "admin": true }).as_object().cloned().unwrap_or_default();
    let admin = provider.add_account(DEMO_EMAIL, DEMO_PASSWORD, claims);
    let profile = json!({ "name": "Demo Admin", "branch": "head-office" })
        .as_object()
        .cloned()
        .unwrap_or_default();
    documents.insert(&config.profile_collection, &admin.id, profile);

    let manager = SessionManager::new(config, Arc::new(provider), Arc::new(documents), Arc::new(MemoryStore::new()));
    manager.initialize();

    let routes = RouteTable::default();
    navigate(&manager, &routes, "/dashboard");

    let result = manager.login(DEMO_EMAIL, DEMO_PASSWORD).await?;
    let session = manager.session();
    info!(
        identity = %result.identity.id,
        user = %session.user_name(),
        role = session.role().label(),
        "logged in"
    );
    navigate(&manager, &routes, "/");
    navigate(&manager, &routes, "/services");

    manager.save_preferences(Preferences { theme: Theme::Dark, ..Preferences::default() })?;
    manager.logout().await?;
    navigate(&manager, &routes, "/branches");

    manager.shutdown();
    Ok(())
}

fn navigate(manager: &SessionManager, routes: &RouteTable, path: &str) {
    let Some(route) = routes.resolve(path) else {
        info!(%path, "no such route");
        return;
    };
    match manager.decide(route) {
        Decision::Allow => info!(%path, route = %route.name, "navigation allowed"),
        Decision::Redirect(to) => info!(%path, route = %route.name, %to, "navigation redirected"),
    }
}
