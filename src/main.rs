mod calendar;
mod config;
mod dashboard;
mod errors;
mod fields;
mod gateway;
mod models;
mod phone;
mod render;
mod session;
mod shell;
mod store;
mod users;

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::calendar::{CalendarController, LeadAppointmentProvider};
use crate::config::Config;
use crate::dashboard::DashboardController;
use crate::fields::FieldsController;
use crate::gateway::Gateway;
use crate::models::EntityKind;
use crate::render::StdoutRenderer;
use crate::session::StoredProfile;
use crate::shell::NavigationShell;
use crate::store::EntityStore;
use crate::users::UsersController;

/// Main entry point for the headless client.
///
/// Initializes tracing and configuration, restores the session, assembles
/// the gateway and page controllers by explicit dependency injection, and
/// hands the set to the navigation shell.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_client_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Restore the session: explicit token first, stored profile second
    let token = match (&config.auth_token, &config.session_file) {
        (Some(token), _) => token.clone(),
        (None, Some(path)) => StoredProfile::load(path)
            .map(|profile| profile.token)
            .ok_or_else(|| anyhow::anyhow!("no stored session in {}", path.display()))?,
        (None, None) => anyhow::bail!("no session source configured"),
    };

    let session = session::decode_token(&token)
        .map_err(|e| anyhow::anyhow!("cannot restore session: {}", e))?;
    if !session.is_valid(chrono::Utc::now()) {
        anyhow::bail!("session for {} has expired, please log in again", session.name);
    }
    tracing::info!("✓ Session restored for {} ({:?})", session.name, session.role);

    // Assemble the gateway and controllers; the shell gets the full set
    // explicitly, no ambient lookup
    let gateway = Arc::new(Gateway::new(
        config.api_base_url.clone(),
        Some(token),
        Duration::from_secs(config.request_timeout_secs),
    )?);
    let renderer = Arc::new(StdoutRenderer);
    tracing::info!("✓ Gateway initialized: {}", config.api_base_url);

    let mut calendar = CalendarController::new(gateway.clone(), renderer.clone());
    calendar.add_provider(Box::new(LeadAppointmentProvider::new(gateway.clone())));

    let mut shell = NavigationShell::new(session, renderer.clone());
    shell.register(Box::new(DashboardController::new(
        gateway.clone(),
        renderer.clone(),
    )));
    for kind in [EntityKind::Lead, EntityKind::Customer, EntityKind::Depositor] {
        shell.register(Box::new(EntityStore::new(
            kind,
            gateway.clone(),
            renderer.clone(),
        )));
    }
    shell.register(Box::new(calendar));
    shell.register(Box::new(UsersController::new(
        gateway.clone(),
        renderer.clone(),
    )));
    shell.register(Box::new(FieldsController::new(gateway, renderer)));

    shell.start().await;

    Ok(())
}
