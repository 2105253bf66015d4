use anyhow::{bail, Result};

use keybridge::command::Command;
use keybridge::Payload;

use crate::cli::OptionArgs;
use crate::commands::Session;

pub fn run(key: &str, args: &OptionArgs) -> Result<()> {
    let mut session = Session::open()?;
    let options = session.options(args);

    let Payload::Bool(found) = session.execute(Command::contains_key(key, options))? else {
        bail!("Unexpected reply to containsKey");
    };

    println!("{}", found);
    if !found {
        std::process::exit(1);
    }
    Ok(())
}
