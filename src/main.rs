mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    keybridge::logging::init(cli.verbose);

    match cli.command {
        Command::Init => commands::init::run()?,
        Command::Write {
            key,
            value,
            options,
        } => commands::write::run(&key, value, &options)?,
        Command::Read { key, options } => commands::read::run(&key, &options)?,
        Command::ReadAll { values, options } => commands::read_all::run(values, &options)?,
        Command::ContainsKey { key, options } => commands::contains_key::run(&key, &options)?,
        Command::Delete { key, options } => commands::delete::run(&key, &options)?,
        Command::DeleteAll { options } => commands::delete_all::run(&options)?,
    }

    Ok(())
}
