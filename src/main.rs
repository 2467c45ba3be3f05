use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod binding;
mod capture;
mod cli;
mod command;
mod config;
mod error;
mod record;
mod state;
mod store;
mod vcs;

use cli::{AddCommand, Cli, Commands};
use command::GlobalOptions;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = GlobalOptions {
        home: cli.home,
        project: cli.project,
    };

    match cli.command {
        Some(Commands::Associate {
            project,
            uri,
            name,
            email,
            global,
        }) => command::run_associate(&options, &project, &uri, name, email, global)?,
        Some(Commands::Use { project }) => command::run_use(&options, &project)?,
        Some(Commands::Status) => command::run_status(&options)?,
        Some(Commands::List { json }) => command::run_list(&options, json)?,
        Some(Commands::Show { fingerprint, json }) => {
            command::run_show(&options, &fingerprint, json)?
        }
        Some(Commands::Add(AddCommand::Capture(args))) => {
            command::run_add_capture(&options, args)?
        }
        Some(Commands::Add(AddCommand::Finding { file })) => {
            command::run_add_finding(&options, &file)?
        }
        Some(Commands::Remove { fingerprint }) => command::run_remove(&options, &fingerprint)?,
        Some(Commands::Describe { fingerprint, text }) => {
            command::run_describe(&options, &fingerprint, &text)?
        }
        Some(Commands::Pull) => command::run_pull(&options)?,
        Some(Commands::Push) => command::run_push(&options)?,
        Some(Commands::Forget { uri, yes }) => command::run_forget(&options, &uri, yes)?,
        Some(Commands::Init { dir, bare }) => command::run_init(&options, &dir, bare)?,
        None => {
            // No command specified, show help
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!("Use 'git-bridge associate <project> <uri>' to get started.");
        }
    }

    Ok(())
}
