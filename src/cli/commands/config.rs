//! Config command implementation

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use harrow_config::Config;
use harrow_utils::exit_codes::ExitCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    value: String,
    source: String,
}

/// Print every effective configuration value with its source.
pub fn execute_config_command(config: &Config, json: bool) -> Result<ExitCode> {
    let mut out = std::io::stdout().lock();
    let effective = config.effective_config();

    if json {
        let entries: BTreeMap<String, ConfigEntry> = effective
            .into_iter()
            .map(|(key, (value, source))| (key, ConfigEntry { value, source }))
            .collect();
        let text = serde_json::to_string_pretty(&entries).context("serializing configuration")?;
        writeln!(out, "{text}").context("writing configuration")?;
        return Ok(ExitCode::SUCCESS);
    }

    for (key, (value, source)) in effective {
        writeln!(out, "{key} = {value}  ({source})").context("writing configuration")?;
    }
    Ok(ExitCode::SUCCESS)
}
