use anyhow::{bail, Result};

use keybridge::command::Command;
use keybridge::Payload;

use crate::cli::OptionArgs;
use crate::commands::Session;

pub fn run(key: &str, args: &OptionArgs) -> Result<()> {
    let mut session = Session::open()?;
    let options = session.options(args);

    match session.execute(Command::read(key, options))? {
        Payload::Value(value) => println!("{}", value),
        Payload::None => {
            eprintln!("'{}' not found.", key);
            std::process::exit(1);
        }
        other => bail!("Unexpected reply to read: {:?}", other),
    }

    Ok(())
}
