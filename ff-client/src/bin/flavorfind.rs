use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use ff_client::backend::ManifestClient;
use ff_client::config::Config;
use ff_client::prompt::{Notice, Prompt};
use ff_client::shell::{Command, Reply, Shell};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

/// Browse, create and manage your recipes on a FlavorFind backend
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// YAML config file (backend url, demo account)
    #[arg(long)]
    config: Option<String>,

    /// Backend URL, overriding the config file and FLAVORFIND_BACKEND_URL
    #[arg(long)]
    backend: Option<String>,
}

/// Reads commands and answers from stdin.
struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    async fn read_line(&mut self, label: &str) -> Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(label.as_bytes()).await?;
        stdout.flush().await?;
        Ok(self.lines.next_line().await?)
    }
}

#[async_trait]
impl Prompt for Console {
    fn alert(&mut self, notice: Notice) {
        println!("!! {notice}");
    }

    async fn confirm(&mut self, question: &str) -> bool {
        match self.read_line(&format!("{question} [y/N] ")).await {
            Ok(Some(answer)) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let config = Config::from_env(args.config.as_deref())?.with_backend_url(args.backend);
    tracing::info!("Using backend at {}", config.backend.url);
    let backend = Arc::new(ManifestClient::new(&config.backend.url));
    let mut shell = Shell::new(backend, config);
    let mut console = Console {
        lines: BufReader::new(tokio::io::stdin()).lines(),
    };

    println!("{}", shell.start().await);
    while let Some(line) = console.read_line(&shell.label()).await? {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        match shell.execute(command, &mut console).await {
            Ok(Reply::Text(text)) => println!("{text}"),
            Ok(Reply::Quit) => break,
            Err(e) => println!("{e:#}"),
        }
    }
    Ok(())
}
