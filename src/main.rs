use anyhow::Result;
use clap::{Parser, Subcommand};
use statuswatch::config::{Config, LogFormat, LoggingConfig};
use statuswatch::HealthProbe;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "statuswatch",
    about = "Uptime monitor for a remote search API",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (falls back to $STATUSWATCH_CONFIG, then defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (monitor loop + status API)
    Serve {
        /// Bind address, overrides [server].bind
        #[arg(long)]
        bind: Option<String>,

        /// Polling interval in milliseconds, overrides [monitor].interval_ms
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Run a single health check and print the outcome
    Check {
        /// Health endpoint, overrides [monitor].target_url
        #[arg(long)]
        target: Option<String>,

        /// Probe timeout in milliseconds, overrides [monitor].timeout_ms
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::resolve(cli.config.as_deref())?;

    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind, interval_ms } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(interval_ms) = interval_ms {
                config.monitor.interval_ms = interval_ms;
            }
            tracing::info!(
                bind = %config.server.bind,
                interval_ms = config.monitor.interval_ms,
                "Starting statuswatch daemon"
            );
            statuswatch::serve(config).await?;
        }
        Commands::Check {
            target,
            timeout_ms,
            json,
        } => {
            if let Some(target) = target {
                config.monitor.target_url = target;
            }
            if let Some(timeout_ms) = timeout_ms {
                config.monitor.timeout_ms = timeout_ms;
            }
            config.monitor.validate()?;

            let probe = statuswatch::HttpProbe::new(config.monitor.policy.clone())?;
            let outcome = probe
                .check(&config.monitor.target_url, config.monitor.timeout())
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("\n=== statuswatch health check ===");
                println!("Target:   {}", config.monitor.target_url);
                println!(
                    "Status:   {}",
                    if outcome.is_healthy() { "ONLINE" } else { "OFFLINE" }
                );
                println!("Response: {} ms", outcome.response_time_ms());
                println!("Checked:  {}", outcome.timestamp().to_rfc3339());
                if let Some(error) = outcome.error() {
                    println!("Error:    {}", error);
                }
                println!("================================\n");
            }

            if !outcome.is_healthy() {
                std::process::exit(1);
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
