mod adapters;
mod cli;
mod config;
mod core;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let args = Cli::parse();

    cli::context::init(args.dir.as_deref());

    let result = match &args.command {
        Commands::Init => cli::commands::init::execute(args.verbose),
        Commands::Record { action } => {
            cli::commands::record::execute(action, args.actor.as_deref())
        }
        Commands::Log {
            source,
            key,
            log_type,
            user,
            since,
            last,
        } => cli::commands::log::execute(
            source.as_deref(),
            key.as_deref(),
            log_type.as_deref(),
            user.as_deref(),
            since.as_deref(),
            *last,
        ),
        Commands::Show { id } => cli::commands::show::execute(*id),
        Commands::Diff {
            id,
            output,
            side_by_side,
        } => cli::commands::diff::execute(*id, output.as_deref(), *side_by_side),
        Commands::Revert {
            source,
            key,
            entry,
            fields,
            preview,
        } => cli::commands::revert::execute(source, key, *entry, fields, *preview),
        Commands::Restore { source, key } => cli::commands::restore::execute(source, key),
        Commands::Cleanup {
            source,
            days,
            dry_run,
            force,
        } => cli::commands::cleanup::execute(source.as_deref(), *days, *dry_run, *force),
    };

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}
