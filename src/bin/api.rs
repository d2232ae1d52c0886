use student_retroplanner::{
    api::start_server,
    audit::AuditLog,
    config::ServerConfig,
    coordinator::RetroplanCoordinator,
    planner::RetroplanGenerator,
    state::InMemoryRetroplanStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server_config = ServerConfig::from_env()?;

    info!("Student Retroplanner - API Server");
    info!(address = %server_config.socket_address(), "Configuration loaded");

    // Create components
    let generator = RetroplanGenerator::default();
    let store = Box::new(InMemoryRetroplanStore::new());
    let audit_log = AuditLog::new();

    let coordinator = Arc::new(RetroplanCoordinator::new(generator, store, audit_log));

    info!("Coordinator initialized, starting API server");

    start_server(coordinator, &server_config).await?;

    Ok(())
}
