//! flux-site: demo blog and contact pages built from live components.

mod components;
mod error;
mod security;
mod seed;
mod server;
mod stores;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use flux_runtime::{Runtime, RuntimeConfig};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use security::{CookieContext, Signer};

#[derive(Parser, Debug)]
#[command(name = "flux-site", version, about = "Live component demo site")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 4000)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Key for signing form tokens; random per process when unset
    #[arg(long, env = "FLUX_SECRET", hide_env_values = true)]
    secret: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().compact())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,flux_runtime=debug,flux_site=debug")),
        )
        .init();

    let config = RuntimeConfig::from_env();
    let signer = match args.secret.as_deref() {
        Some(secret) => Signer::new(secret.as_bytes()),
        None => {
            warn!("FLUX_SECRET not set, form tokens will not survive a restart");
            Signer::random()
        }
    }
    .map_err(|err| anyhow::anyhow!("invalid signing key: {}", err))?;
    let services = Arc::new(seed::services(signer));
    let runtime = components::register(Runtime::builder())?
        .config(config)
        .contexts(Arc::new(CookieContext::new(services)))
        .build();
    let sweeper = runtime.spawn_sweeper();

    info!(
        endpoint = %runtime.config().endpoint,
        ttl_secs = runtime.config().instance_ttl.as_secs(),
        kinds = runtime.registry().kinds().len(),
        "runtime ready"
    );

    let app = server::router(Arc::new(server::AppState { runtime }));

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("flux-site v{} listening on http://{}", env!("CARGO_PKG_VERSION"), addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
