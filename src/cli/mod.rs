pub mod commands;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "jsonform-api")]
#[command(about = "JSON Form API - dynamic form definitions and runtime table access")]
#[command(version)]
pub struct Cli {
    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve(ServeArgs),

    #[command(about = "Apply the embedded database migrations and exit")]
    Migrate,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    #[arg(long, help = "Port to listen on (overrides PORT / JSONFORM_PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Use process-local in-memory storage instead of PostgreSQL")]
    pub memory: bool,

    #[arg(long, help = "Apply database migrations before serving")]
    pub migrate: bool,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve(args)) => commands::serve::handle(args).await,
        Some(Commands::Migrate) => commands::migrate::handle().await,
        None => commands::serve::handle(ServeArgs::default()).await,
    }
}
