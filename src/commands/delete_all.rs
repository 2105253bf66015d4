use std::io::{BufRead, IsTerminal, Write};

use anyhow::{bail, Result};

use keybridge::command::Command;

use crate::cli::OptionArgs;
use crate::commands::Session;

pub fn run(args: &OptionArgs) -> Result<()> {
    if std::io::stdin().is_terminal() && !confirm()? {
        bail!("Aborted.");
    }

    let mut session = Session::open()?;
    let options = session.options(args);

    session.execute(Command::delete_all(options))?;
    println!("All entries deleted.");
    Ok(())
}

fn confirm() -> Result<bool> {
    print!("Delete every entry in this namespace? [y/N]: ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
