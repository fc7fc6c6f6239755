//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::model::{CommentKind, ItemKind, WatchMode};

pub mod commands;

/// Labels, pins and subscriptions for tracker items (`SQLite`)
#[derive(Parser, Debug)]
#[command(name = "tmeta", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (defaults to .tracker/tracker.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Acting user name (falls back to config, then $USER)
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// `SQLite` busy timeout in ms
    #[arg(long, global = true)]
    pub lock_timeout: Option<u64>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a tracker workspace
    Init {
        /// Reopen an existing database instead of failing
        #[arg(long)]
        force: bool,
    },

    /// Manage user and organization accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage containers and container watches
    Container {
        #[command(subcommand)]
        command: ContainerCommands,
    },

    /// Manage items (issues and pull requests)
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Post activity on an item
    Comment(CommentArgs),

    /// Manage labels
    Label {
        #[command(subcommand)]
        command: LabelCommands,
    },

    /// Manage pinned items
    Pin {
        #[command(subcommand)]
        command: PinCommands,
    },

    /// Manage item watches and list subscribers
    Watch {
        #[command(subcommand)]
        command: WatchCommands,
    },

    /// Read and write runtime configuration stored in the database
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

// ============================================================================
// Accounts, containers, items
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create an account
    Add {
        /// Unique account name
        name: String,
        /// Create an organization instead of a user
        #[arg(long)]
        org: bool,
    },
    /// Update account status flags
    Status(UserStatusArgs),
    /// Show an account
    Show { name: String },
}

#[derive(Args, Debug)]
pub struct UserStatusArgs {
    pub name: String,
    /// Mark the account inactive
    #[arg(long, conflicts_with = "activate")]
    pub deactivate: bool,
    /// Mark the account active
    #[arg(long)]
    pub activate: bool,
    /// Block or allow login
    #[arg(long)]
    pub prohibit_login: Option<bool>,
}

#[derive(Subcommand, Debug)]
pub enum ContainerCommands {
    /// Create a container owned by an account
    Add {
        /// Owner account name
        owner: String,
        /// Container name
        name: String,
    },
    /// Set a user's watch mode on a container
    Watch {
        container: i64,
        #[arg(value_parser = parse_watch_mode)]
        mode: WatchMode,
        /// User name (defaults to the actor)
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Create an item
    Add(ItemAddArgs),
    /// Close an item
    Close { id: i64 },
    /// Reopen an item
    Reopen { id: i64 },
    /// Show an item with labels, pin rank and recent events
    Show {
        id: i64,
        /// Number of events to show (0 = all)
        #[arg(long, default_value_t = 10)]
        events: usize,
    },
}

#[derive(Args, Debug)]
pub struct ItemAddArgs {
    pub container: i64,
    pub title: String,
    /// Item kind (issue, pull_request)
    #[arg(long, default_value = "issue", value_parser = parse_item_kind)]
    pub kind: ItemKind,
    /// Author name (defaults to the actor)
    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    pub item: i64,
    pub body: String,
    /// Comment kind (comment, code, review, other)
    #[arg(long, default_value = "comment", value_parser = parse_comment_kind)]
    pub kind: CommentKind,
}

// ============================================================================
// Labels
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum LabelCommands {
    /// Create a label owned by a container or an organization
    Create(LabelCreateArgs),
    /// Labels usable on an item (its container's plus its organization's)
    Available { item: i64 },
    /// Labels attached to an item
    List { item: i64 },
    /// Replace the labels of an item
    Set {
        item: i64,
        /// Label IDs; none clears the item
        labels: Vec<i64>,
    },
    /// Add labels to an item
    Add {
        item: i64,
        #[arg(required = true)]
        labels: Vec<i64>,
    },
    /// Remove one label from an item
    Remove { item: i64, label: i64 },
    /// Remove every label from an item
    Clear { item: i64 },
}

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("owner").required(true).args(["container", "org"])))]
pub struct LabelCreateArgs {
    pub name: String,
    /// Owning container ID
    #[arg(long)]
    pub container: Option<i64>,
    /// Owning organization name
    #[arg(long)]
    pub org: Option<String>,
    #[arg(long, short)]
    pub description: Option<String>,
}

// ============================================================================
// Pins
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum PinCommands {
    /// Pin an item at the end of its container's order
    Add { item: i64 },
    /// Unpin an item
    Remove { item: i64 },
    /// Pin if unpinned, unpin if pinned
    Toggle { item: i64 },
    /// Move a pinned item to a 1-based position
    Move {
        item: i64,
        #[arg(allow_negative_numbers = true)]
        position: i64,
    },
    /// List pinned items of a container
    List(PinScopeArgs),
    /// Check that pin ranks form 1..n
    Check(PinScopeArgs),
}

#[derive(Args, Debug)]
pub struct PinScopeArgs {
    pub container: i64,
    #[arg(long, default_value = "issue", value_parser = parse_item_kind)]
    pub kind: ItemKind,
}

// ============================================================================
// Watches
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum WatchCommands {
    /// Explicitly watch an item
    On(WatchTargetArgs),
    /// Explicitly stop watching an item
    Off(WatchTargetArgs),
    /// Remove the explicit choice so implicit signals apply
    Unset(WatchTargetArgs),
    /// Show whether and why a user is subscribed
    Status(WatchTargetArgs),
    /// List subscribers of an item
    Subscribers {
        item: i64,
        /// Print only the number of subscribers
        #[arg(long)]
        count: bool,
    },
}

#[derive(Args, Debug)]
pub struct WatchTargetArgs {
    pub item: i64,
    /// User name (defaults to the actor)
    #[arg(long)]
    pub user: Option<String>,
}

// ============================================================================
// Config
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective value of a key
    Get { key: String },
    /// Store a runtime key in the database
    Set { key: String, value: String },
    /// Delete a runtime key from the database
    Unset { key: String },
    /// Print every effective key
    List,
}

fn parse_item_kind(value: &str) -> Result<ItemKind, String> {
    value.parse().map_err(|e: crate::error::MetaError| e.to_string())
}

fn parse_comment_kind(value: &str) -> Result<CommentKind, String> {
    value.parse().map_err(|e: crate::error::MetaError| e.to_string())
}

fn parse_watch_mode(value: &str) -> Result<WatchMode, String> {
    value.parse().map_err(|e: crate::error::MetaError| e.to_string())
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
    fn parses_pin_move_with_negative_position() {
        let cli = Cli::try_parse_from(["tmeta", "pin", "move", "3", "-1"]).unwrap();
        match cli.command {
            Commands::Pin {
                command: PinCommands::Move { item, position },
            } => {
                assert_eq!(item, 3);
                assert_eq!(position, -1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn label_create_requires_owner() {
        assert!(Cli::try_parse_from(["tmeta", "label", "create", "bug"]).is_err());
        assert!(
            Cli::try_parse_from(["tmeta", "label", "create", "bug", "--container", "1"]).is_ok()
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tmeta", "watch", "subscribers", "4", "--json", "-vv"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }
}
