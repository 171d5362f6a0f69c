use clap::Parser;
use docqa::{api, config::Config, logging, pipeline::QaService};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Question answering server for small PDF document sets.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the JSON configuration document.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Port to bind (falls back to SERVER_PORT, then probing).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = Config::load(cli.config.as_deref()).expect("Failed to load configuration");
    logging::init_tracing();

    let service = QaService::new(&config).expect("Failed to initialize pipeline");
    let app = api::create_router(Arc::new(service));

    let port_override = cli.port.or(config.server_port);
    let (listener, port) = bind_listener(port_override)
        .await
        .expect("Failed to bind listener");
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.unwrap();
}

async fn bind_listener(port_override: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = port_override {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 8000..=8099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 8000-8099",
    ))
}
