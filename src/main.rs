use clap::Parser;
use std::io::{self, IsTerminal};
use tracker_meta::cli::commands;
use tracker_meta::cli::{Cli, Commands};
use tracker_meta::config;
use tracker_meta::logging::init_logging;
use tracker_meta::{MetaError, StructuredError};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, None) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let overrides = build_cli_overrides(&cli);

    let result = match &cli.command {
        Commands::Init { force } => commands::init::execute(*force, None),
        Commands::User { command } => {
            commands::directory::execute_user(command, cli.json, &overrides)
        }
        Commands::Container { command } => {
            commands::directory::execute_container(command, cli.json, &overrides)
        }
        Commands::Item { command } => {
            commands::directory::execute_item(command, cli.json, &overrides)
        }
        Commands::Comment(args) => commands::directory::execute_comment(args, cli.json, &overrides),
        Commands::Label { command } => commands::label::execute(command, cli.json, &overrides),
        Commands::Pin { command } => commands::pin::execute(command, cli.json, &overrides),
        Commands::Watch { command } => commands::watch::execute(command, cli.json, &overrides),
        Commands::Config { command } => commands::config::execute(command, cli.json, &overrides),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &MetaError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}

fn build_cli_overrides(cli: &Cli) -> config::CliOverrides {
    config::CliOverrides {
        db: cli.db.clone(),
        actor: cli.actor.clone(),
        lock_timeout: cli.lock_timeout,
    }
}
