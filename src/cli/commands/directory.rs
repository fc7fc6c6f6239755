//! Account, container, item and comment commands.
//!
//! These seed and inspect the records the metadata core hangs off.

use serde::Serialize;
use tracing::info;

use super::{CommandContext, print_json};
use crate::cli::{CommentArgs, ContainerCommands, ItemAddArgs, ItemCommands, UserCommands};
use crate::config::CliOverrides;
use crate::error::Result;
use crate::model::{Event, Item, Label, User};
use crate::storage::directory as dir;

/// Execute a `user` subcommand.
///
/// # Errors
///
/// Returns an error if validation or database operations fail.
pub fn execute_user(command: &UserCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let ctx = CommandContext::open(cli)?;
    let conn = ctx.storage.conn();

    let user = match command {
        UserCommands::Add { name, org } => {
            let user = dir::create_user(conn, name, *org)?;
            info!(user_id = user.id, name = %user.name, org = user.is_org, "Created account");
            user
        }
        UserCommands::Status(args) => {
            let user = ctx.user_by_name(&args.name)?;
            let is_active = if args.deactivate {
                false
            } else {
                args.activate || user.is_active
            };
            let prohibit_login = args.prohibit_login.unwrap_or(user.prohibit_login);
            dir::set_user_status(conn, user.id, is_active, prohibit_login)?;
            dir::require_user(conn, user.id)?
        }
        UserCommands::Show { name } => ctx.user_by_name(name)?,
    };

    if json {
        return print_json(&user);
    }
    print_user(&user);
    Ok(())
}

fn print_user(user: &User) {
    let kind = if user.is_org { "org" } else { "user" };
    let mut flags = Vec::new();
    if !user.is_active {
        flags.push("inactive");
    }
    if user.prohibit_login {
        flags.push("login prohibited");
    }
    if flags.is_empty() {
        println!("{} {} ({kind})", user.id, user.name);
    } else {
        println!("{} {} ({kind}; {})", user.id, user.name, flags.join(", "));
    }
}

/// Execute a `container` subcommand.
///
/// # Errors
///
/// Returns an error if validation or database operations fail.
pub fn execute_container(
    command: &ContainerCommands,
    json: bool,
    cli: &CliOverrides,
) -> Result<()> {
    let ctx = CommandContext::open(cli)?;
    let conn = ctx.storage.conn();

    match command {
        ContainerCommands::Add { owner, name } => {
            let owner = ctx.user_by_name(owner)?;
            let container = dir::create_container(conn, owner.id, name)?;
            if json {
                return print_json(&container);
            }
            println!("Created container {} {}/{}", container.id, owner.name, container.name);
        }
        ContainerCommands::Watch {
            container,
            mode,
            user,
        } => {
            let user = ctx.user_or_actor(user.as_deref())?;
            dir::set_container_watch(conn, user.id, *container, *mode)?;
            if json {
                return print_json(&serde_json::json!({
                    "user": user.name,
                    "container_id": container,
                    "mode": mode,
                }));
            }
            println!("{} now has watch mode '{mode}' on container {container}", user.name);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ItemDetails {
    #[serde(flatten)]
    item: Item,
    labels: Vec<Label>,
    events: Vec<Event>,
}

/// Execute an `item` subcommand.
///
/// # Errors
///
/// Returns an error if validation or database operations fail.
pub fn execute_item(command: &ItemCommands, json: bool, cli: &CliOverrides) -> Result<()> {
    let ctx = CommandContext::open(cli)?;
    let conn = ctx.storage.conn();

    match command {
        ItemCommands::Add(ItemAddArgs {
            container,
            title,
            kind,
            author,
        }) => {
            let author = ctx.user_or_actor(author.as_deref())?;
            let item = dir::create_item(conn, *container, *kind, author.id, title)?;
            if json {
                return print_json(&item);
            }
            println!("Created {} {}: {}", item.kind, item.id, item.title);
        }
        ItemCommands::Close { id } | ItemCommands::Reopen { id } => {
            let closed = matches!(command, ItemCommands::Close { .. });
            dir::set_item_closed(conn, *id, closed)?;
            let item = dir::require_item(conn, *id)?;
            if json {
                return print_json(&item);
            }
            let state = if closed { "Closed" } else { "Reopened" };
            println!("{state} {} {}", item.kind, item.id);
        }
        ItemCommands::Show { id, events } => {
            let details = ItemDetails {
                item: dir::require_item(conn, *id)?,
                labels: ctx.storage.item_labels(*id)?,
                events: ctx.storage.get_events(*id, *events)?,
            };
            if json {
                return print_json(&details);
            }
            print_item_details(&details);
        }
    }
    Ok(())
}

fn print_item_details(details: &ItemDetails) {
    let item = &details.item;
    let state = if item.is_closed { "closed" } else { "open" };
    println!("{} {} [{state}] {}", item.kind, item.id, item.title);
    println!("  container: {}  author: {}", item.container_id, item.author_id);
    if item.is_pinned() {
        println!("  pinned at position {}", item.pin_order);
    }
    if !details.labels.is_empty() {
        let names: Vec<&str> = details.labels.iter().map(|l| l.name.as_str()).collect();
        println!("  labels: {}", names.join(", "));
    }
    for event in &details.events {
        let value = event
            .new_value
            .as_deref()
            .or(event.old_value.as_deref())
            .unwrap_or("");
        println!(
            "  {} {} by {} {value}",
            event.created_at.format("%Y-%m-%d %H:%M"),
            event.event_type.as_str(),
            event.actor_id
        );
    }
}

/// Execute the `comment` command.
///
/// # Errors
///
/// Returns an error if the item or actor is unknown.
pub fn execute_comment(args: &CommentArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let ctx = CommandContext::open(cli)?;
    let actor = ctx.actor()?;
    let comment = dir::add_comment(ctx.storage.conn(), args.item, actor.id, args.kind, &args.body)?;
    if json {
        return print_json(&comment);
    }
    println!("Added {} {} to item {}", args.kind.as_str(), comment.id, args.item);
    Ok(())
}
