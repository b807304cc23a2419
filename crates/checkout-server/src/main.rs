//! zero-checkout HTTP Server
//!
//! Axum server exposing the zero-total card validation hooks to the host
//! commerce platform.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_server::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::from_env()?;
    let app = router(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 zero-checkout server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health               - Health check");
    tracing::info!("  POST /checkout/widget      - Card widget for a free cart");
    tracing::info!("  POST /checkout/ajax        - action=create_setup_intent");
    tracing::info!("  POST /hooks/pre-checkout   - Strip native payment fields");
    tracing::info!("  POST /hooks/validate-card  - Card field validation");
    tracing::info!("  POST /hooks/order-accepted - Store validated card");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
