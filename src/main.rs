#![allow(clippy::result_large_err)]

use borrow_tracker::{
    config::{app, database, notifications},
    core::{borrow::BorrowService, inventory, report},
    errors::Result,
    notify::{NoopNotifier, Notifier, whatsapp::WhatsAppNotifier},
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = app::load_default_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    info!(
        "Loan policy: {:?} max days, {} default days",
        app_config.loan_policy.max_loan_days, app_config.loan_policy.default_loan_days
    );

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed inventory listed in the configuration
    inventory::seed_inventory(&db, &app_config.inventory)
        .await
        .inspect_err(|e| error!("Failed to seed inventory: {}", e))?;

    // 6. Pick the notification transport
    let notifier: Arc<dyn Notifier> = match notifications::whatsapp_settings_from_env() {
        Some(settings) => {
            info!("WhatsApp notifications enabled via {}", settings.gateway_url);
            Arc::new(WhatsAppNotifier::new(settings)?)
        }
        None => {
            info!("WhatsApp notifications disabled");
            Arc::new(NoopNotifier)
        }
    };

    let service = BorrowService::new(db.clone(), notifier, app_config.loan_policy);

    let summary = report::generate_dashboard(service.db(), 5).await?;
    info!(
        "Borrow tracker ready: {} active, {} pending, {} returned, {} rejected line(s)",
        summary.counts.borrowed,
        summary.counts.pending,
        summary.counts.returned,
        summary.counts.rejected
    );

    drop(service);
    database::close_connection(db).await
}
