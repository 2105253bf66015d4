use anyhow::Result;

use keybridge::command::Command;

use crate::cli::OptionArgs;
use crate::commands::Session;

pub fn run(key: &str, args: &OptionArgs) -> Result<()> {
    let mut session = Session::open()?;
    let options = session.options(args);

    session.execute(Command::delete(key, options))?;
    println!("Deleted '{}'.", key);
    Ok(())
}
