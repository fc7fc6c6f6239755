//! Label command implementation.
//!
//! Provides label management: create, available, list, set, add, remove, clear.

use serde::Serialize;
use tracing::debug;

use super::{CommandContext, print_json};
use crate::cli::{LabelCommands, LabelCreateArgs};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::labels::LabelDiff;
use crate::model::{Label, LabelOwner};
use crate::storage::directory as dir;

/// Execute the label command.
///
/// # Errors
///
/// Returns an error if database operations fail or if inputs are invalid.
pub fn execute(command: &LabelCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut ctx = CommandContext::open(cli)?;

    match command {
        LabelCommands::Create(args) => label_create(&ctx, args, json),
        LabelCommands::Available { item } => {
            let conn = ctx.storage.conn();
            let item = dir::require_item(conn, *item)?;
            let labels = dir::available_labels(conn, dir::label_target(conn, &item)?)?;
            print_labels(&labels, json)
        }
        LabelCommands::List { item } => {
            dir::require_item(ctx.storage.conn(), *item)?;
            print_labels(&ctx.storage.item_labels(*item)?, json)
        }
        LabelCommands::Set { item, labels } => {
            let actor = ctx.actor()?;
            let diff = ctx.storage.replace_item_labels(*item, labels, actor.id)?;
            print_diff(&ctx, *item, &diff, json)
        }
        LabelCommands::Add { item, labels } => {
            let actor = ctx.actor()?;
            let diff = ctx.storage.add_item_labels(*item, labels, actor.id)?;
            print_diff(&ctx, *item, &diff, json)
        }
        LabelCommands::Remove { item, label } => {
            let actor = ctx.actor()?;
            let removed = ctx.storage.remove_item_label(*item, *label, actor.id)?;
            if json {
                return print_json(&LabelActionResult {
                    status: if removed { "removed" } else { "unchanged" },
                    item_id: *item,
                    label_id: *label,
                });
            }
            if removed {
                println!("Removed label {label} from item {item}");
            } else {
                println!("Label {label} was not attached to item {item}");
            }
            Ok(())
        }
        LabelCommands::Clear { item } => {
            let actor = ctx.actor()?;
            let removed = ctx.storage.clear_item_labels(*item, actor.id)?;
            if json {
                return print_json(&serde_json::json!({ "item_id": item, "removed": removed }));
            }
            println!("Removed {removed} label(s) from item {item}");
            Ok(())
        }
    }
}

/// JSON output for remove.
#[derive(Serialize)]
struct LabelActionResult {
    status: &'static str,
    item_id: i64,
    label_id: i64,
}

/// JSON output for set/add.
#[derive(Serialize)]
struct LabelChangeResult<'a> {
    item_id: i64,
    added: &'a [Label],
    removed: &'a [Label],
    labels: Vec<Label>,
}

fn label_create(ctx: &CommandContext, args: &LabelCreateArgs, json: bool) -> Result<()> {
    let owner = match (&args.container, &args.org) {
        (Some(container_id), _) => LabelOwner::Container(*container_id),
        (None, Some(org)) => LabelOwner::Org(ctx.user_by_name(org)?.id),
        (None, None) => {
            return Err(crate::error::MetaError::validation(
                "owner",
                "pass --container or --org",
            ));
        }
    };
    let label = dir::create_label(
        ctx.storage.conn(),
        owner,
        &args.name,
        args.description.as_deref(),
    )?;
    debug!(label_id = label.id, ?owner, "Created label");

    if json {
        return print_json(&label);
    }
    let scope = label.exclusive_scope();
    if scope.is_empty() {
        println!("Created label {} '{}'", label.id, label.name);
    } else {
        println!(
            "Created label {} '{}' (exclusive scope '{scope}')",
            label.id, label.name
        );
    }
    Ok(())
}

fn print_diff(ctx: &CommandContext, item_id: i64, diff: &LabelDiff, json: bool) -> Result<()> {
    let labels = ctx.storage.item_labels(item_id)?;
    if json {
        return print_json(&LabelChangeResult {
            item_id,
            added: &diff.to_add,
            removed: &diff.to_remove,
            labels,
        });
    }

    if diff.is_empty() {
        println!("No label changes for item {item_id}");
    }
    for label in &diff.to_add {
        println!("+ {} {}", label.id, label.name);
    }
    for label in &diff.to_remove {
        println!("- {} {}", label.id, label.name);
    }
    Ok(())
}

fn print_labels(labels: &[Label], json: bool) -> Result<()> {
    if json {
        return print_json(labels);
    }
    if labels.is_empty() {
        println!("No labels");
        return Ok(());
    }
    for label in labels {
        let owner = match label.owner {
            LabelOwner::Container(id) => format!("container {id}"),
            LabelOwner::Org(id) => format!("org {id}"),
        };
        println!(
            "{:>4}  {:<30} {owner}  open {} / closed {}",
            label.id,
            label.name,
            label.num_open_issues(),
            label.num_closed_issues
        );
    }
    Ok(())
}
