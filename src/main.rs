mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use iiskit::Client;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub appcmd: Option<String>,
}

impl Context {
    /// Client for the local host, honoring `--appcmd`.
    pub fn client(&self) -> Client {
        let client = Client::new();
        match &self.appcmd {
            Some(appcmd) => client.with_appcmd(paths::expand_str(appcmd)),
            None => client,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        appcmd: cli.appcmd,
    };
    log::debug!("Verbosity {}", ctx.verbose);

    match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::List(args) => commands::list::run(&ctx, args),
        Command::Targets(args) => commands::targets::run(&ctx, args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "iisprov", &mut io::stdout());
            Ok(())
        }
    }
}
