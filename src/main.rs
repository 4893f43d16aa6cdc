use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use storefront_bot::oauth::Credentials;
use storefront_bot::post::{self, PostOutcome};
use storefront_bot::{config, feed, site};

#[derive(Debug, Parser)]
#[command(name = "storefront-bot")]
#[command(about = "Product auto-poster and static storefront builder")]
struct Cli {
    /// Store configuration file.
    #[arg(long, default_value = "store.json", env = "STOREFRONT_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Publish the next product.
    Post {
        /// Compose and log the post without sending it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate the static storefront.
    Build {
        #[arg(long, default_value = "site")]
        out: PathBuf,
    },
    /// Restyle already published pages in place.
    Theme {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Write products_slugs.csv only.
    Slugs {
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Commands::Post { dry_run } => {
            let credentials = if dry_run {
                None
            } else {
                Some(Credentials::from_env()?)
            };
            match post::run(&config, credentials, chrono::Utc::now()).await? {
                PostOutcome::Posted(tweet) => info!(id = %tweet.id, "done"),
                PostOutcome::DryRun(_) => info!("dry run, nothing sent"),
                PostOutcome::QuotaReached { posts_this_month } => {
                    info!(posts_this_month, "quota reached, nothing sent")
                }
            }
        }
        Commands::Build { out } => {
            let products = feed::load_products(&config.products_path)?;
            site::build(&config, &products, &out)?;
        }
        Commands::Theme { root } => {
            site::theme::apply(&root, &config.theme)?;
        }
        Commands::Slugs { out } => {
            let products = feed::load_products(&config.products_path)?;
            site::write_slugs(&config, &products, &out)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}
