use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gateway_config::{ConfigLoader, GatewayConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod service;

#[derive(Parser)]
#[command(name = "gateway-service")]
#[command(about = "Multi-chain wallet gateway", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	/// Explicit config file; when absent the standard locations are
	/// searched (CONFIG_FILE, ./config.toml, ./config/gateway.toml).
	#[arg(short, long, value_name = "FILE")]
	config: Option<PathBuf>,

	#[arg(long, env = "GATEWAY_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the gateway service
	Start,
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level)?;

	match cli.command {
		Some(Commands::Start) | None => start_service(cli).await,
		Some(Commands::Validate) => validate_config(cli).await,
	}
}

async fn start_service(cli: Cli) -> Result<()> {
	info!("Starting wallet gateway");

	let config = load(&cli)?;

	info!("Configuration loaded successfully");
	info!("Fiat currency: {}", config.gateway.fiat_currency);
	info!("HTTP port: {}", config.gateway.http_port);

	let engine = service::build_engine(&config).context("Failed to build gateway engine")?;
	let engine = Arc::new(engine);

	let listener =
		tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.gateway.http_port))
			.await
			.context("Failed to bind HTTP port")?;

	info!("Wallet gateway listening on port {}", config.gateway.http_port);

	axum::serve(listener, api::router(engine))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("HTTP server error")?;

	info!("Wallet gateway stopped");
	Ok(())
}

async fn validate_config(cli: Cli) -> Result<()> {
	let config = load(&cli)?;

	// Exercise every factory so schema problems surface here rather than
	// at startup.
	service::build_engine(&config).context("Configuration is not usable")?;

	info!("Configuration is valid");
	info!("Fiat currency: {}", config.gateway.fiat_currency);
	info!(
		"Fan-out concurrency cap: {}",
		config.gateway.max_concurrent_lookups
	);
	Ok(())
}

fn load(cli: &Cli) -> Result<GatewayConfig> {
	match &cli.config {
		Some(path) => {
			info!("Loading configuration from: {:?}", path);
			ConfigLoader::from_file(path).context("Failed to load configuration")
		}
		None => gateway_config::load_config().context("Failed to load configuration"),
	}
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c()
			.await
			.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
