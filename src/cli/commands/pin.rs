//! Pin command implementation.

use serde::Serialize;

use super::{CommandContext, print_json};
use crate::cli::{PinCommands, PinScopeArgs};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::model::Item;
use crate::pins::{self, PinState};
use crate::storage::directory as dir;

#[derive(Serialize)]
struct PinResult {
    item_id: i64,
    changed: bool,
    rank: i64,
}

#[derive(Serialize)]
struct PinList<'a> {
    container_id: i64,
    kind: &'static str,
    max_pinned: i64,
    new_pin_allowed: bool,
    items: &'a [Item],
}

/// Execute the pin command.
///
/// # Errors
///
/// Returns an error if the pin operation fails (capacity, position,
/// permission) or the database cannot be read.
pub fn execute(command: &PinCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut ctx = CommandContext::open(cli)?;
    let limits = ctx.pin_limits()?;

    match command {
        PinCommands::Add { item } => {
            let actor = ctx.actor()?;
            let changed = ctx.storage.pin_item(*item, actor.id, limits)?;
            report(&ctx, *item, changed, json)
        }
        PinCommands::Remove { item } => {
            let actor = ctx.actor()?;
            let changed = ctx.storage.unpin_item(*item, actor.id)?;
            report(&ctx, *item, changed, json)
        }
        PinCommands::Toggle { item } => {
            let actor = ctx.actor()?;
            let state = ctx.storage.pin_or_unpin_item(*item, actor.id, limits)?;
            if json {
                return print_json(&serde_json::json!({ "item_id": item, "state": state }));
            }
            match state {
                PinState::Pinned(rank) => println!("Pinned item {item} at position {rank}"),
                PinState::Unpinned => println!("Unpinned item {item}"),
            }
            Ok(())
        }
        PinCommands::Move { item, position } => {
            let actor = ctx.actor()?;
            let rank = ctx.storage.move_pin(*item, *position, actor.id)?;
            if json {
                return print_json(&PinResult {
                    item_id: *item,
                    changed: rank > 0,
                    rank,
                });
            }
            if rank == 0 {
                println!("Item {item} is not pinned; nothing moved");
            } else {
                println!("Item {item} is now at position {rank}");
            }
            Ok(())
        }
        PinCommands::List(PinScopeArgs { container, kind }) => {
            dir::require_container(ctx.storage.conn(), *container)?;
            let items = ctx.storage.pinned_items(*container, *kind)?;
            let allowed =
                pins::is_new_pin_allowed(ctx.storage.conn(), *container, *kind, limits)?;
            if json {
                return print_json(&PinList {
                    container_id: *container,
                    kind: kind.as_str(),
                    max_pinned: limits.max_pinned,
                    new_pin_allowed: allowed,
                    items: &items,
                });
            }
            if items.is_empty() {
                println!("No pinned {kind}s in container {container}");
            }
            for item in &items {
                println!("{:>2}. {} {}", item.pin_order, item.id, item.title);
            }
            if !allowed {
                println!("(pin limit of {} reached)", limits.max_pinned);
            }
            Ok(())
        }
        PinCommands::Check(PinScopeArgs { container, kind }) => {
            dir::require_container(ctx.storage.conn(), *container)?;
            let defects = ctx.storage.verify_pin_order(*container, *kind)?;
            if json {
                return print_json(&serde_json::json!({
                    "container_id": container,
                    "kind": kind,
                    "ok": defects.is_empty(),
                    "defects": defects,
                }));
            }
            if defects.is_empty() {
                println!("Pin order of {kind}s in container {container} is dense");
            }
            for defect in &defects {
                println!("{defect}");
            }
            Ok(())
        }
    }
}

fn report(ctx: &CommandContext, item_id: i64, changed: bool, json: bool) -> Result<()> {
    let item = dir::require_item(ctx.storage.conn(), item_id)?;
    if json {
        return print_json(&PinResult {
            item_id,
            changed,
            rank: item.pin_order,
        });
    }
    match (changed, item.is_pinned()) {
        (true, true) => println!("Pinned item {item_id} at position {}", item.pin_order),
        (true, false) => println!("Unpinned item {item_id}"),
        (false, true) => println!("Item {item_id} is already pinned at position {}", item.pin_order),
        (false, false) => println!("Item {item_id} is not pinned"),
    }
    Ok(())
}
