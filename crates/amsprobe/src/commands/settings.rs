//! `amsprobe settings`: print the effective router settings.

use std::io::Write;

use crate::cli::{GlobalOpts, SettingsArgs, SettingsFormat};
use crate::error::CliError;

pub fn handle(args: &SettingsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = super::load(global)?;
    // Reject settings the monitor would refuse before printing them.
    super::monitor_config(&cfg)?;

    let rendered = match args.format {
        SettingsFormat::Toml => amsprobe_config::render_toml(&cfg)?,
        SettingsFormat::Json => serde_json::to_string_pretty(&cfg)?,
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", rendered.trim_end())?;
    Ok(())
}
