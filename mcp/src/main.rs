use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use channex_mcp_runtime::{McpCommands, run as run_mcp};

#[derive(Parser)]
#[command(
    name = "channex-mcp",
    version,
    about = "Channex MCP server over stdio"
)]
struct Cli {
    #[command(subcommand)]
    command: McpCommands,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // stdout carries protocol frames, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "channex_mcp_runtime=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
        .init();

    let cli = Cli::parse();
    let code = run_mcp(cli.command).await;
    std::process::exit(code);
}
