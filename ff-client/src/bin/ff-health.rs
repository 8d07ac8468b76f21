use anyhow::Result;
use clap::Parser;
use ff_client::backend::{Backend, ManifestClient};
use ff_client::config::Config;

/// Check that the FlavorFind backend is reachable
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// URL of the backend to check; defaults to FLAVORFIND_BACKEND_URL or the built-in default
    #[arg(long)]
    backend: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    if dotenvy::dotenv().is_err() {
        eprintln!("Warning: Failed to load .env file");
    }
    let args = Args::parse();
    let config = Config::from_env(None)?.with_backend_url(args.backend);
    let client = ManifestClient::new(&config.backend.url);

    println!("Checking backend at {}...", client.base_url());
    match client.health().await {
        Ok(()) => {
            println!("Backend is online.");
            println!("Admin panel: {}", config.admin_panel_url());
            Ok(())
        }
        Err(e) => {
            eprintln!("\nBackend is offline: {e}");
            if client.base_url().starts_with("https://localhost") {
                eprintln!("\nHint: Local backends typically use HTTP, not HTTPS.");
                eprintln!("Try: cargo run --bin ff-health -- --backend http://localhost:1111");
            }
            std::process::exit(1);
        }
    }
}
