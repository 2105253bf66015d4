use clap::{Args, Parser, Subcommand};

use keybridge::options::{self, Options};

#[derive(Parser, Debug)]
#[command(
    name = "keybridge",
    about = "Encrypted key-value store behind a serialized command bridge.",
    version
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). KEYBRIDGE_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new keybridge store in the current directory.
    Init,

    /// Store a value (prompted interactively unless --value is given).
    Write {
        key: String,
        /// Value to store. Visible in shell history; prefer the prompt.
        #[arg(long)]
        value: Option<String>,
        #[command(flatten)]
        options: OptionArgs,
    },

    /// Print the value stored under a key.
    Read {
        key: String,
        #[command(flatten)]
        options: OptionArgs,
    },

    /// List all keys under the prefix. Values are only printed with --values.
    ReadAll {
        #[arg(long)]
        values: bool,
        #[command(flatten)]
        options: OptionArgs,
    },

    /// Exit 0 if the key exists, 1 otherwise.
    ContainsKey {
        key: String,
        #[command(flatten)]
        options: OptionArgs,
    },

    /// Delete a key. Succeeds whether or not it existed.
    Delete {
        key: String,
        #[command(flatten)]
        options: OptionArgs,
    },

    /// Delete every entry in the namespace.
    DeleteAll {
        #[command(flatten)]
        options: OptionArgs,
    },
}

/// Per-command store options. Unset flags fall back to config defaults.
#[derive(Args, Debug, Default)]
pub struct OptionArgs {
    /// Storage namespace (one encrypted file per namespace).
    #[arg(long)]
    pub namespace: Option<String>,

    /// Prefix prepended to every key.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Wipe the namespace and retry once if the operation fails.
    #[arg(long)]
    pub reset_on_error: bool,
}

impl OptionArgs {
    /// The flags that were actually given, as raw options.
    pub fn to_options(&self) -> Options {
        let mut raw = Options::new();
        if let Some(namespace) = &self.namespace {
            raw.insert(options::NAMESPACE.into(), namespace.clone());
        }
        if let Some(prefix) = &self.prefix {
            raw.insert(options::KEY_PREFIX.into(), prefix.clone());
        }
        if self.reset_on_error {
            raw.insert(options::RESET_ON_ERROR.into(), "true".into());
        }
        raw
    }
}
