//! CLI entry point for slate

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "slate")]
#[command(version)]
#[command(about = "Serve JSON and markdown content through templates", long_about = None)]
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
    /// Start the content server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on (overrides PORT and the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to
        #[arg(short, long, default_value = "0.0.0.0")]
        ip: String,
    },

    /// List content in a partition (general, pillar, static) or the aggregate (all)
    List {
        #[arg(default_value = "general")]
        r#type: String,
    },

    /// Load every record and report the ones that fail
    Check,

    /// Display version information
    Version,
}

/// How long shutdown waits for reads still parked on the blocking pool
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "slate=debug,tower_http=debug,info"
    } else {
        "slate=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(cli));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run(cli: Cli) -> Result<()> {
    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Serve { port, ip } => {
            let mut site = slate::Site::new(&base_dir)?;
            site.config
                .apply_port_env(std::env::var("PORT").ok().as_deref());
            let port = port.unwrap_or(site.config.port);

            slate::server::start(&site, &ip, port, None).await?;
        }

        Commands::List { r#type } => {
            let site = slate::Site::new(&base_dir)?;
            slate::commands::list::run(&site, &r#type).await?;
        }

        Commands::Check => {
            let site = slate::Site::new(&base_dir)?;
            tracing::info!("Checking content in {:?}", site.content_dir);
            slate::commands::check::run(&site).await?;
        }

        Commands::Version => {
            println!("slate version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
