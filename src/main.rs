use std::time::Duration;
use tokio::net::TcpListener;

use parley::config::{generate_config_template, Config};
use parley::registry::Registry;
use parley::routes;
use parley::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "parley=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "parley=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("parley server v{} starting", env!("CARGO_PKG_VERSION"));

    // The registry is constructed exactly once here and handed into the
    // router state; no module-level connection state exists anywhere.
    let registry = Registry::new();
    let state = AppState::new(
        registry,
        Duration::from_secs(config.poll_session_timeout_secs),
    );

    let app = routes::build_router(state);

    // Bind and serve. A bind failure is the one hard-fatal error class:
    // log the cause and exit non-zero.
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%addr, %error, "failed to bind listen address");
            return Err(error.into());
        }
    };
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
