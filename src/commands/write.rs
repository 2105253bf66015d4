use anyhow::{bail, Context, Result};
use secrecy::SecretString;

use keybridge::command::Command;

use crate::cli::OptionArgs;
use crate::commands::Session;

pub fn run(key: &str, value: Option<String>, args: &OptionArgs) -> Result<()> {
    let mut session = Session::open()?;

    let value = match value {
        Some(value) => value,
        None => rpassword::prompt_password(format!("Value for '{}': ", key))
            .context("Failed to read value")?,
    };
    if value.is_empty() {
        bail!("Value must not be empty.");
    }

    let options = session.options(args);
    session.execute(Command::write(key, Some(SecretString::new(value)), options))?;

    println!("Saved '{}'.", key);
    Ok(())
}
