use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use medportal_core::{CoreConfig, PortalServices};

/// Main entry point for the MedPortal application
///
/// Resolves configuration once, wires the providers and serves the REST API (with Swagger UI
/// at `/swagger-ui`) until Ctrl-C.
///
/// # Environment Variables
/// - `MEDPORTAL_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `MEDPORTAL_OTP_EXPIRY_SECS`: OTP countdown in seconds (default: 60)
/// - `MEDPORTAL_SHARE_BASE_URL` / `MEDPORTAL_QR_IMAGE_URL`: share link and QR renderer bases
/// - `MEDPORTAL_SEED_FILE`: JSON seed for the in-memory test request store
/// - `SUPABASE_URL` / `SUPABASE_KEY`: remote test request tables (override the seed)
/// - `MEDPORTAL_MOCK_DELAY_MS`: simulated latency of the mock auth provider
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, binding or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medportal_run=info".parse()?)
                .add_directive("medportal_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("MEDPORTAL_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::from_env()?);
    let services = PortalServices::from_config(cfg)?;
    let app = router(AppState::new(services));

    tracing::info!("++ Starting MedPortal REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- MedPortal REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
}
