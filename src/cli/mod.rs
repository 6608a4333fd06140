//! CLI commands for Twitter Extras.
//!
//! The options surface: toggle features, inspect configuration, and print
//! the extension manifest.

pub mod preferences;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::manifest::{registered_scripts, ExtensionManifest};
use crate::storage::{JsonFileBackend, PreferenceStore};

#[derive(Parser)]
#[command(name = "extras")]
#[command(about = "Toggle Twitter Extras features", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List features and whether each is enabled
    List,

    /// Enable a feature
    Enable {
        /// Feature identifier (see `extras list`)
        identifier: String,
    },

    /// Disable a feature
    Disable {
        /// Feature identifier (see `extras list`)
        identifier: String,
    },

    /// Remove every stored preference
    Reset,

    /// Print the config and preferences file locations
    ConfigPath {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },

    /// Print the extension manifest and content-script registrations
    Manifest,
}

/// Parse arguments and run the command.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = Config::load_from(&config_path);
    crate::logging::init(&config.logging.filter);

    execute(cli.command, &config, &config_path, &mut std::io::stdout())
}

/// Run `command` against `config`, writing output to `out`.
pub fn execute(
    command: Commands,
    config: &Config,
    config_path: &std::path::Path,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Commands::List => {
            let store = open_store(config);
            preferences::write_list(&preferences::list(&store), out)?;
        }
        Commands::Enable { identifier } => {
            preferences::set_enabled(&open_store(config), &identifier, true)?;
            writeln!(out, "Enabled {}", identifier)?;
        }
        Commands::Disable { identifier } => {
            preferences::set_enabled(&open_store(config), &identifier, false)?;
            writeln!(out, "Disabled {}", identifier)?;
        }
        Commands::Reset => {
            let removed = preferences::reset(&open_store(config));
            writeln!(out, "Removed {} stored preference(s)", removed)?;
        }
        Commands::ConfigPath { init } => {
            if init && !config_path.exists() {
                config
                    .save_to(config_path)
                    .with_context(|| format!("Failed to write {}", config_path.display()))?;
            }
            writeln!(out, "config: {}", config_path.display())?;
            writeln!(out, "preferences: {}", config.storage.preferences_path.display())?;
        }
        Commands::Manifest => {
            let manifest = ExtensionManifest::new(&config.site.origins);
            manifest.validate()?;
            writeln!(out, "{}", manifest.to_json()?)?;
            let scripts = registered_scripts(&config.site.origins);
            writeln!(out, "{}", serde_json::to_string_pretty(&scripts)?)?;
        }
    }
    Ok(())
}

fn open_store(config: &Config) -> PreferenceStore {
    PreferenceStore::new(JsonFileBackend::open(&config.storage.preferences_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> (Config, PathBuf) {
        let mut config = Config::default();
        config.storage.preferences_path = dir.path().join("preferences.json");
        (config, dir.path().join("config.toml"))
    }

    fn run_command(command: Commands, config: &Config, path: &std::path::Path) -> anyhow::Result<String> {
        let mut out = Vec::new();
        execute(command, config, path, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["extras", "enable", "timecodes"]).unwrap();
        assert!(matches!(cli.command, Commands::Enable { identifier } if identifier == "timecodes"));

        let cli = Cli::try_parse_from(["extras", "--config", "/tmp/c.toml", "config-path", "--init"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::ConfigPath { init: true }));

        assert!(Cli::try_parse_from(["extras"]).is_err());
    }

    #[test]
    fn test_enable_then_list() {
        let dir = TempDir::new().unwrap();
        let (config, path) = config_in(&dir);

        run_command(Commands::Enable { identifier: "hideTrends".to_string() }, &config, &path).unwrap();
        let listing = run_command(Commands::List, &config, &path).unwrap();
        assert!(listing.lines().any(|l| l.starts_with("hideTrends") && l.contains(" on ")));

        let err = run_command(Commands::Disable { identifier: "nope".to_string() }, &config, &path).unwrap_err();
        assert!(err.to_string().contains("Unknown feature 'nope'"));

        let reset = run_command(Commands::Reset, &config, &path).unwrap();
        assert!(reset.contains("Removed 1"));
    }

    #[test]
    fn test_config_path_init_and_manifest() {
        let dir = TempDir::new().unwrap();
        let (config, path) = config_in(&dir);

        let printed = run_command(Commands::ConfigPath { init: true }, &config, &path).unwrap();
        assert!(printed.contains("config.toml"));
        assert_eq!(Config::load_from(&path), config);

        let manifest = run_command(Commands::Manifest, &config, &path).unwrap();
        assert!(manifest.contains("\"manifest_version\": 3"));
        assert!(manifest.contains("\"MAIN\""));
    }
}
