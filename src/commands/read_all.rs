use anyhow::{bail, Result};

use keybridge::command::Command;
use keybridge::Payload;

use crate::cli::OptionArgs;
use crate::commands::Session;

pub fn run(show_values: bool, args: &OptionArgs) -> Result<()> {
    let mut session = Session::open()?;
    let options = session.options(args);

    let Payload::Entries(entries) = session.execute(Command::read_all(options))? else {
        bail!("Unexpected reply to readAll");
    };

    if entries.is_empty() {
        println!("No entries stored. Add one with: keybridge write <key>");
    }
    for (key, value) in &entries {
        if show_values {
            println!("{}={}", key, value);
        } else {
            println!("{}", key);
        }
    }

    Ok(())
}
