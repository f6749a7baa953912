//! Subcommand handlers.

pub mod settings;
pub mod watch;

use tracing::error;

use amsprobe_config::Config;
use amsprobe_core::MonitorConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load settings from `--config` (or the default location) plus env.
pub(crate) fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    amsprobe_config::load_config(global.config.as_deref()).map_err(|e| {
        error!(error = %e, "failed to load router settings");
        CliError::from(e)
    })
}

/// Validate loaded settings and build the monitor configuration.
pub(crate) fn monitor_config(cfg: &Config) -> Result<MonitorConfig, CliError> {
    amsprobe_config::to_monitor_config(cfg).map_err(|e| {
        error!(error = %e, "router settings rejected");
        CliError::from(e)
    })
}
