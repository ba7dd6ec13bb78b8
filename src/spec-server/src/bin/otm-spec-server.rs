use clap::Parser;
use otm_spec_server::{start_server, Config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Version-aware documentation proxy for the OpenTripModel specification
#[derive(Debug, Parser)]
#[command(name = "otm-spec-server", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "SPEC_SERVER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to
    #[arg(long)]
    bind_address: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level or filter directive (overrides LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env();
    if let Some(bind_address) = args.bind_address {
        config.server.bind_address = bind_address;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!("Logging initialized, level={}", config.logging.level);

    match &args.config {
        Some(path) => tracing::info!("Loaded configuration from {}", path.display()),
        None => tracing::info!("Using default configuration"),
    }
    tracing::debug!("LOCAL_HTML_FILE={}", config.content.local_html_file);
    tracing::debug!("LOCAL_SWAGGER_FILE={}", config.content.local_swagger_file);

    let server = start_server(config).await?;
    let addr = server.local_addr;
    tracing::info!("Server Starts - {}", addr);
    server.metrics.event(
        "OTM Spec Server Starts",
        &format!("HTTP server starts listening on {}", addr),
    );

    tokio::select! {
        result = server.handle => {
            if let Err(e) = result {
                tracing::error!("HTTP server task failed: {:?}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
    }

    tracing::info!("Server Stops - {}", addr);
    server.metrics.event(
        "OTM Spec Server Stops",
        &format!("HTTP server stopped listening on {}", addr),
    );
    Ok(())
}
