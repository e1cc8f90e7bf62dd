//! CLI entry point for mdserve

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mdserve")]
#[command(version)]
#[command(about = "Serve Markdown files as templated HTML pages", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (overrides configuration)
        #[arg(short, long)]
        ip: Option<String>,
    },

    /// Validate the configured layout template without serving
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "mdserve=debug,info"
    } else {
        "mdserve=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = cli.cwd.unwrap_or_else(|| std::env::current_dir().unwrap());

    match cli.command {
        Commands::Serve { port, ip } => {
            let mut app = mdserve::MdServe::new(&base_dir)?;
            if let Some(port) = port {
                app.config.port = port;
            }
            if let Some(ip) = ip {
                app.config.ip = ip;
            }

            tracing::info!(
                "Starting server at http://{}:{}",
                app.config.ip,
                app.config.port
            );
            mdserve::server::start(&app).await?;
        }

        Commands::Check => {
            let app = mdserve::MdServe::new(&base_dir)?;
            let notifier = Arc::new(mdserve::cache::NotifyWatcher::new()?);
            let cache = Arc::new(mdserve::cache::FileCache::new(notifier));
            let resolver =
                mdserve::template::TemplateResolver::new(cache, app.site_dir.clone());

            match resolver.resolve(&app.template_path, &app.config.root) {
                Ok(_) => println!("Template OK: {}", app.template_path.display()),
                Err(e) => {
                    eprintln!("Template error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
