//! Command implementations.
//!
//! Each command opens the workspace through [`CommandContext`], which
//! resolves the database, the merged configuration and the acting user.

pub mod config;
pub mod directory;
pub mod init;
pub mod label;
pub mod pin;
pub mod watch;

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{self as cfg, CliOverrides, ConfigLayer};
use crate::error::{MetaError, Result};
use crate::model::User;
use crate::pins::PinLimits;
use crate::storage::SqliteStorage;
use crate::storage::directory as dir;

/// Storage plus configuration for one command invocation.
pub struct CommandContext {
    pub storage: SqliteStorage,
    pub config: ConfigLayer,
    pub workspace_dir: PathBuf,
}

impl CommandContext {
    /// Discover the workspace and open its database.
    ///
    /// With `--db`, a missing workspace falls back to the database's directory.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if no workspace is found, or a config or
    /// database error.
    pub fn open(cli: &CliOverrides) -> Result<Self> {
        let workspace_dir = match cfg::discover_workspace_dir(None) {
            Ok(dir) => dir,
            Err(MetaError::NotInitialized) => match &cli.db {
                Some(db) => db
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
                None => return Err(MetaError::NotInitialized),
            },
            Err(e) => return Err(e),
        };
        let (storage, db_path) = cfg::open_storage(&workspace_dir, cli)?;
        let config = cfg::load_config(&workspace_dir, Some(&storage), cli)?;
        tracing::debug!(db = %db_path.display(), "Opened workspace");
        Ok(Self {
            storage,
            config,
            workspace_dir,
        })
    }

    /// The account commands act as.
    ///
    /// # Errors
    ///
    /// Returns a config error when no actor is configured, or `NotFound`
    /// when the name is unknown.
    pub fn actor(&self) -> Result<User> {
        let name = cfg::resolve_actor(&self.config).ok_or_else(|| {
            MetaError::Config("no actor configured; pass --actor or set TRACKER_ACTOR".to_string())
        })?;
        self.user_by_name(&name)
    }

    /// Look up a user by name, defaulting to the actor.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown names.
    pub fn user_or_actor(&self, name: Option<&str>) -> Result<User> {
        match name {
            Some(name) => self.user_by_name(name),
            None => self.actor(),
        }
    }

    /// # Errors
    ///
    /// Returns `NotFound` for unknown names.
    pub fn user_by_name(&self, name: &str) -> Result<User> {
        dir::find_user_by_name(self.storage.conn(), name)?
            .ok_or_else(|| MetaError::not_found("User", name))
    }

    /// # Errors
    ///
    /// Returns a config error for an invalid pin limit.
    pub fn pin_limits(&self) -> Result<PinLimits> {
        cfg::pin_limits_from_layer(&self.config)
    }
}

/// Print a value as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
