//! Config command implementation.
//!
//! Only runtime keys live in the database; startup keys (`db`, `actor`,
//! `lock-timeout`) are read from YAML, the environment or flags.

use std::collections::BTreeMap;

use super::{CommandContext, print_json};
use crate::cli::ConfigCommands;
use crate::config::{self, CliOverrides};
use crate::error::{MetaError, Result};

/// Execute the config command.
///
/// # Errors
///
/// Returns an error for startup-only keys on `set`, invalid values, or
/// database failures.
pub fn execute(command: &ConfigCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut ctx = CommandContext::open(cli)?;

    match command {
        ConfigCommands::Get { key } => {
            let value = ctx.config.value(key).cloned();
            if json {
                return print_json(&serde_json::json!({ "key": key, "value": value }));
            }
            match value {
                Some(value) => println!("{value}"),
                None => println!("{key} is not set"),
            }
        }
        ConfigCommands::Set { key, value } => {
            if config::is_startup_key(key) {
                return Err(MetaError::Config(format!(
                    "'{key}' is a startup key; set it in {}/config.yaml or the environment",
                    config::WORKSPACE_DIR
                )));
            }
            config::validate_runtime_value(key, value)?;
            ctx.storage.set_config(key.trim(), value)?;
            if json {
                return print_json(&serde_json::json!({ "key": key, "value": value }));
            }
            println!("Set {key} = {value}");
        }
        ConfigCommands::Unset { key } => {
            let deleted = ctx.storage.delete_config(key.trim())?;
            if json {
                return print_json(&serde_json::json!({ "key": key, "deleted": deleted }));
            }
            if deleted {
                println!("Unset {key}");
            } else {
                println!("{key} was not set in the database");
            }
        }
        ConfigCommands::List => {
            let mut all: BTreeMap<&str, &str> = ctx
                .config
                .runtime
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            all.extend(ctx.config.startup.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            if json {
                return print_json(&serde_json::json!({
                    "workspace": ctx.workspace_dir.display().to_string(),
                    "values": all,
                }));
            }
            for (key, value) in all {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}
