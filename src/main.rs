//! `dotdeploy` command-line entry point.
use anyhow::Result;
use clap::Parser;

use dotdeploy::cli::{Cli, Command};
use dotdeploy::{VERSION, commands, logging};

#[allow(clippy::print_stdout)]
fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let command = args.command();

    if args.global.list_profiles {
        return commands::list_profiles(&args.global);
    }

    let (name, quiet) = match &command {
        Command::Version => {
            println!("dotdeploy {VERSION}");
            return Ok(());
        }
        Command::Install => ("install", false),
        Command::Verify(opts) => ("verify", opts.json),
        Command::Reset => ("reset", false),
    };
    let log_file = logging::LogFile::for_command(name);
    logging::init_subscriber(args.verbose, quiet, log_file.as_ref());
    let log = logging::Logger::new(log_file);

    match &command {
        Command::Verify(opts) => commands::verify::run(&args.global, opts, &log),
        Command::Reset => commands::reset::run(&args.global, &log),
        _ => commands::install::run(&args.global, &log),
    }
}
