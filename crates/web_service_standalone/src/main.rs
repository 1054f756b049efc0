use anyhow::Context;
use clap::Parser;
use diagnosis_core::{DiagnosisConfig, DiagnosisService};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use web_service::ServerConfig;

/// Animal skin-disease diagnosis server.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Port to listen on (overrides APP_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind (overrides APP_HOST)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(true)
                .with_file(false),
        )
        .init();

    tracing::info!("Starting diagnosis service...");

    let mut server_config = ServerConfig::from_env();
    if let Some(port) = args.port {
        server_config.port = port;
    }
    if let Some(host) = args.host {
        server_config.host = host;
    }

    let diagnosis_config = DiagnosisConfig::new();
    tracing::debug!("Diagnosis config: {:?}", diagnosis_config);

    let service = match DiagnosisService::from_config(&diagnosis_config) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    web_service::run(server_config, service)
        .await
        .map_err(anyhow::Error::msg)
        .context("diagnosis server stopped")
}
