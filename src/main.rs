use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use parlance_gateway::local::CaptureMode;
use parlance_gateway::{AppState, ServerConfig, local, routes};

/// Parlance Gateway - real-time audio/video relay for live
/// conversational sessions
#[derive(Parser, Debug)]
#[command(name = "parlance-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the browser relay server
    Serve,

    /// Run the desktop loop against local devices
    Local {
        /// Video source: webcam, screen share, or none
        #[arg(long, value_enum, default_value_t = CaptureMode::Camera)]
        mode: CaptureMode,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    // A missing API key is a startup error, never a runtime one
    let config = ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Local { mode } => local::run(mode, &config)
            .await
            .map_err(|e| anyhow!(e.to_string())),
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let address = config.address();
    let app_state = AppState::new(config);

    let app = routes::create_relay_router().with_state(app_state);

    let listener = TcpListener::bind(&address).await?;
    println!("Server listening on http://{address}");
    axum::serve(listener, app).await?;

    Ok(())
}
