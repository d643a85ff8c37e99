//! CLI entry point: parses arguments, discovers (or initializes) the
//! repository, and dispatches to the selected subcommand.

use std::path::PathBuf;
use std::process::exit;

use clap::Parser;

use onyo::{Cmd, Command, GlobalArgs, OnyoArgs, Repo, Result, TermUi};

fn main() {
    let args = OnyoArgs::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else {
        builder.filter_level(log::LevelFilter::Warn);
    }
    builder.init();

    match exec_command(&args) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("onyo: {}", e);
            exit(e.exit_code());
        }
    }
}

fn exec_command(args: &OnyoArgs) -> Result<()> {
    let path = args.path.clone().unwrap_or_else(|| PathBuf::from("."));

    if args.quiet && !args.yes {
        return Err(onyo::OnyoError::FlagConflict(
            "--quiet requires --yes".to_string(),
        ));
    }

    let ui = TermUi {
        assume_yes: args.yes,
        quiet: args.quiet,
    };
    let globals = GlobalArgs {
        yes: args.yes,
        quiet: args.quiet,
        message: args.message.as_deref(),
        dry_run: args.dry_run,
    };

    let repo = match &args.command {
        Command::Init(_) => Repo::init(&path)?,
        _ => Repo::discover(&path)?,
    };

    args.command.exec(&repo, &globals, &ui)
}
