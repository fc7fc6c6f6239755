use crate::config::{DEFAULT_DB_FILENAME, WORKSPACE_DIR};
use crate::error::{MetaError, Result};
use crate::storage::SqliteStorage;
use std::fs;
use std::path::Path;

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the directory or database cannot be created.
pub fn execute(force: bool, root_dir: Option<&Path>) -> Result<()> {
    let base_dir = root_dir.unwrap_or_else(|| Path::new("."));
    let workspace_dir = base_dir.join(WORKSPACE_DIR);
    let db_path = workspace_dir.join(DEFAULT_DB_FILENAME);

    if workspace_dir.exists() {
        if db_path.exists() && !force {
            return Err(MetaError::AlreadyInitialized { path: db_path });
        }
    } else {
        fs::create_dir(&workspace_dir)?;
    }

    // Creates the file and applies the schema.
    SqliteStorage::open(&db_path)?;

    let config_path = workspace_dir.join("config.yaml");
    if !config_path.exists() {
        let config = r"# Tracker metadata configuration
# actor: alice
# lock-timeout: 30000
# pins:
#   max-per-container: 3
";
        fs::write(config_path, config)?;
    }

    let gitignore_path = workspace_dir.join(".gitignore");
    if !gitignore_path.exists() {
        let gitignore = r"# Database
*.db
*.db-shm
*.db-wal
";
        fs::write(gitignore_path, gitignore)?;
    }

    println!("Initialized tracker workspace in {WORKSPACE_DIR}/");
    Ok(())
}
