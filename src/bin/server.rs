//! purexcel-intake HTTP server binary.
//!
//! Starts an axum HTTP server that accepts contact form submissions from the
//! marketing sites and forwards them to the CRM.
//!
//! # Environment Variables
//!
//! See [`purexcel_intake::config`]. The essentials:
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `HUBSPOT_PRIVATE_APP_TOKEN` — CRM token (required unless
//!   `INTAKE_CRM_BACKEND=memory`)
//! - `RUST_LOG` — Tracing filter (default: "info,purexcel_intake=debug")
//!
//! # Usage
//!
//! ```bash
//! HUBSPOT_PRIVATE_APP_TOKEN=pat-... cargo run --bin intake-server
//! # or without a CRM:
//! INTAKE_CRM_BACKEND=memory cargo run --bin intake-server
//! ```

use anyhow::Context;
use purexcel_intake::server::{app_router_at, AppState};
use purexcel_intake::{crm, ContactForwarder, IntakeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,purexcel_intake=debug".into()),
        )
        .init();

    let config = IntakeConfig::from_env().context("invalid configuration")?;
    tracing::debug!(?config, "loaded configuration");

    // A missing CRM token stops the process here, before the port is bound.
    let crm = crm::connect(&config.crm).context("failed to initialise CRM backend")?;
    let forwarder = ContactForwarder::new(crm, config.note_fallback);

    let bind_addr = config.bind_addr();

    tracing::info!("purexcel-intake server starting on {}", bind_addr);
    tracing::info!("CRM backend: {:?}", config.crm.backend);
    tracing::info!("Note fallback policy: {:?}", forwarder.fallback_policy());
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health — liveness probe");
    tracing::info!("  POST {} — contact form submission", config.contact_path);

    let app = app_router_at(AppState::new(forwarder), &config.contact_path);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    tracing::info!("purexcel-intake server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
