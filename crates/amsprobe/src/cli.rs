//! Clap derive structures for the `amsprobe` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// amsprobe -- watch the run state of a TwinCAT controller
#[derive(Debug, Parser)]
#[command(
    name = "amsprobe",
    version,
    about = "Poll the ADS state of a TwinCAT controller through the local AMS router",
    long_about = "Connects to the PLC runtime (port 851) of the controller named by\n\
        HOST_AMS_NETID and prints its ADS state once per second until stopped.\n\n\
        Router settings come from the config file and AMSPROBE_* variables.",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    /// Defaults to `watch`
    #[command(subcommand)]
    pub command: Option<Command>,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Router settings file (TOML)
    #[arg(long, env = "AMSPROBE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the controller until interrupted (default)
    Watch,

    /// Print the effective router settings
    Settings(SettingsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Output format
    #[arg(long, short = 'o', default_value = "toml")]
    pub format: SettingsFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SettingsFormat {
    Toml,
    Json,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_watch() {
        let cli = Cli::try_parse_from(["amsprobe", "-vv"]).ok();
        assert!(matches!(
            cli,
            Some(Cli {
                command: None,
                global: GlobalOpts { verbose: 2, .. }
            })
        ));
    }

    #[test]
    fn settings_accepts_json() {
        let cli = Cli::try_parse_from(["amsprobe", "settings", "--format", "json"]).ok();
        assert!(matches!(
            cli.and_then(|c| c.command),
            Some(Command::Settings(SettingsArgs {
                format: SettingsFormat::Json
            }))
        ));
    }
}
