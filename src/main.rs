use clap::Parser;
use jsonform_api::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present so DATABASE_URL and friends are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jsonform_api=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = cli::run(cli).await {
        match std::env::var("JSONFORM_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }
}
