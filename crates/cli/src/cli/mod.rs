pub mod config;
pub mod sessions;

use clap::{Parser, Subcommand};

use gd_domain::config::{BackendKind, Config};
use gd_sessions::SessionStore;

/// guardian — inspect and maintain a session store.
#[derive(Debug, Parser)]
#[command(name = "guardian", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List stored sessions.
    List {
        /// Print full records as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show a single session record as JSON.
    Show {
        /// Session identifier.
        id: String,
    },
    /// Delete a session so its identifier stops authenticating.
    Revoke {
        /// Session identifier.
        id: String,
    },
    /// Delete every expired or invalid session.
    Purge,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `GUARDIAN_CONFIG` (or
/// `guardian.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path =
        std::env::var("GUARDIAN_CONFIG").unwrap_or_else(|_| "guardian.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

/// Parse `path`, falling back to defaults when the file does not exist.
pub fn load_config_from(path: &str) -> anyhow::Result<Config> {
    if !std::path::Path::new(path).exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))
}

/// Open the configured store.  Only persistent backends make sense from
/// a separate process.
pub fn open_store(config: &Config) -> anyhow::Result<SessionStore> {
    if config.store.backend == BackendKind::Memory {
        anyhow::bail!(
            "store.backend is \"memory\"; the guardian CLI needs a persistent backend \
             (set store.backend = \"file\")"
        );
    }
    Ok(SessionStore::from_config(&config.store)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_show() {
        let cli = Cli::try_parse_from(["guardian", "show", "abc123"]).unwrap();
        assert!(matches!(cli.command, Command::Show { ref id } if id == "abc123"));
    }

    #[test]
    fn parses_config_validate() {
        let cli = Cli::try_parse_from(["guardian", "config", "validate"]).unwrap();
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Validate)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config_from("/nonexistent/guardian.toml").unwrap();
        assert_eq!(config.store.backend, BackendKind::Memory);
    }

    #[test]
    fn memory_backend_is_refused() {
        let err = open_store(&Config::default()).err().unwrap();
        assert!(err.to_string().contains("persistent backend"));
    }

    #[test]
    fn reads_file_backend_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guardian.toml");
        let store_dir = dir.path().join("sessions");
        std::fs::write(
            &path,
            format!(
                "[store]\nbackend = \"file\"\npath = {:?}\n",
                store_dir.to_string_lossy()
            ),
        )
        .unwrap();

        let config = load_config_from(path.to_str().unwrap()).unwrap();
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend_name(), "file");
        assert!(store_dir.is_dir());
    }
}
