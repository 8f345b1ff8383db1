use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use gd_cli::cli::{self, Cli, Command, ConfigCommand};
use gd_domain::config::{LogFormat, ObservabilityConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Version => {
            println!("guardian {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Config(ConfigCommand::Validate) => {
            let (config, config_path) = cli::load_config()?;
            if !cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let (config, _) = cli::load_config()?;
            cli::config::show(&config)
        }
        Command::List { json } => {
            let (config, _) = cli::load_config()?;
            init_tracing(&config.observability);
            let store = cli::open_store(&config)?;
            cli::sessions::list(&store, json).await
        }
        Command::Show { id } => {
            let (config, _) = cli::load_config()?;
            init_tracing(&config.observability);
            let store = cli::open_store(&config)?;
            cli::sessions::show(&store, &id).await
        }
        Command::Revoke { id } => {
            let (config, _) = cli::load_config()?;
            init_tracing(&config.observability);
            let store = cli::open_store(&config)?;
            cli::sessions::revoke(&store, &id).await
        }
        Command::Purge => {
            let (config, _) = cli::load_config()?;
            init_tracing(&config.observability);
            let store = cli::open_store(&config)?;
            cli::sessions::purge(&store).await
        }
    }
}

/// Initialize stderr tracing so diagnostics never mix with command output
/// on stdout.  `RUST_LOG` overrides the configured filter.
fn init_tracing(obs: &ObservabilityConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&obs.default_filter));

    match obs.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}
