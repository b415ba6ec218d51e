use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bakul_mcp_runtime::{DEFAULT_API_BASE, McpCommands, RuntimeConfig, run};

#[derive(Parser)]
#[command(
    name = "bakul-mcp",
    version,
    about = "Bakul MCP server: the Bakul dataset API as MCP tools over stdio"
)]
struct Cli {
    /// API base URL
    #[arg(long, env = "BAKUL_API_URL", default_value = DEFAULT_API_BASE)]
    api_url: String,

    /// Pin an API key instead of reading BAKUL_API_KEY / API_KEY on every call
    #[arg(long)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Option<McpCommands>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Structured JSON logging on stderr; stdout carries the protocol.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bakul_mcp=info,bakul_mcp_runtime=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = RuntimeConfig {
        api_url: cli.api_url,
        api_key: cli.api_key.filter(|key| !key.is_empty()),
    };

    let code = run(config, cli.command.unwrap_or(McpCommands::Serve)).await;
    tracing::debug!(code, "exiting");
    std::process::exit(code);
}
