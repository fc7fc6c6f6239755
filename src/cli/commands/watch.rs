//! Watch command implementation.

use serde::Serialize;

use super::{CommandContext, print_json};
use crate::cli::{WatchCommands, WatchTargetArgs};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::model::WatchState;
use crate::watch::SubscriptionReason;

#[derive(Serialize)]
struct WatchStatus<'a> {
    user: &'a str,
    item_id: i64,
    subscribed: bool,
    reason: SubscriptionReason,
    record: Option<WatchState>,
}

/// Execute the watch command.
///
/// # Errors
///
/// Returns an error if the user or item is unknown or the database fails.
pub fn execute(command: &WatchCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut ctx = CommandContext::open(cli)?;

    match command {
        WatchCommands::On(target) | WatchCommands::Off(target) => {
            let watching = matches!(command, WatchCommands::On(_));
            let user = ctx.user_or_actor(target.user.as_deref())?;
            let state = ctx.storage.watch_item(user.id, target.item, watching)?;
            if json {
                return print_json(&state);
            }
            let verb = if watching { "watching" } else { "not watching" };
            println!("{} is now {verb} item {}", user.name, target.item);
            Ok(())
        }
        WatchCommands::Unset(target) => {
            let user = ctx.user_or_actor(target.user.as_deref())?;
            let removed = ctx.storage.unset_item_watch(user.id, target.item)?;
            if json {
                return print_json(&serde_json::json!({
                    "user": user.name,
                    "item_id": target.item,
                    "removed": removed,
                }));
            }
            if removed {
                println!("Cleared explicit watch of {} on item {}", user.name, target.item);
            } else {
                println!("{} had no explicit watch on item {}", user.name, target.item);
            }
            Ok(())
        }
        WatchCommands::Status(WatchTargetArgs { item, user }) => {
            let user = ctx.user_or_actor(user.as_deref())?;
            let reason = ctx.storage.subscription_reason(user.id, *item)?;
            let record = ctx.storage.item_watch(user.id, *item)?;
            if json {
                return print_json(&WatchStatus {
                    user: &user.name,
                    item_id: *item,
                    subscribed: reason.is_subscribed(),
                    reason,
                    record,
                });
            }
            let verdict = if reason.is_subscribed() {
                "subscribed"
            } else {
                "not subscribed"
            };
            println!("{} is {verdict} to item {item} ({reason})", user.name);
            if let Some(record) = record {
                println!("  explicit record since {}", record.updated_at.to_rfc3339());
            }
            Ok(())
        }
        WatchCommands::Subscribers { item, count } => {
            if *count {
                let n = ctx.storage.count_subscribers(*item)?;
                if json {
                    return print_json(&serde_json::json!({ "item_id": item, "count": n }));
                }
                println!("{n}");
                return Ok(());
            }
            let users = ctx.storage.subscribers(*item)?;
            if json {
                return print_json(&users);
            }
            if users.is_empty() {
                println!("No subscribers");
            }
            for user in &users {
                println!("{} {}", user.id, user.name);
            }
            Ok(())
        }
    }
}
