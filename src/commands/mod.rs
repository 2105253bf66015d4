pub mod contains_key;
pub mod delete;
pub mod delete_all;
pub mod init;
pub mod read;
pub mod read_all;
pub mod write;

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use tokio::sync::oneshot;

use keybridge::command::Command;
use keybridge::config::{self, Config};
use keybridge::options::Options;
use keybridge::store::{EncryptedFileStore, MasterKey};
use keybridge::{CallerLoop, Outcome, Payload, SecureStorageBridge};

use crate::cli::OptionArgs;

/// Read the store password from here instead of prompting (for scripts and CI).
const PASSWORD_ENV: &str = "KEYBRIDGE_PASSWORD";

/// An unlocked store behind a running bridge, driven from the main thread.
pub struct Session {
    config: Config,
    bridge: SecureStorageBridge,
    caller: CallerLoop,
}

impl Session {
    pub fn open() -> Result<Self> {
        let root = config::project_root()?;
        let cfg = config::read(&root)?;

        let password = read_password()?;
        let key = MasterKey::derive(&password, &cfg.salt_bytes()?, &cfg.kdf_params())
            .context("Failed to derive store key")?;

        let store = EncryptedFileStore::new(config::keybridge_dir(&root), key);
        let bridge = SecureStorageBridge::start(Box::new(store))?;

        Ok(Self {
            config: cfg,
            bridge,
            caller: CallerLoop::new(),
        })
    }

    /// Config defaults overlaid with the flags given on this invocation.
    pub fn options(&self, args: &OptionArgs) -> Options {
        self.config.options_with(args.to_options())
    }

    /// Submit one command and pump the caller loop until it resolves.
    pub fn execute(&mut self, command: Command) -> Result<Payload> {
        let method = command.method.to_string();
        let (tx, mut rx) = oneshot::channel();

        self.bridge.submit(command, &self.caller.context(), move |outcome| {
            let _ = tx.send(outcome);
        })?;
        self.caller.blocking_run_next();

        let outcome = rx
            .try_recv()
            .context("Command finished without an outcome")?;
        match outcome {
            Outcome::Success(payload) => Ok(payload),
            Outcome::Failure(err) => {
                Err(anyhow::Error::new(err).context(format!("{method} failed")))
            }
            Outcome::NotImplemented => bail!("{method} is not supported"),
        }
    }
}

pub fn read_password() -> Result<SecretString> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::new(password));
    }
    let password = rpassword::prompt_password("keybridge password: ")
        .context("Failed to read keybridge password")?;
    Ok(SecretString::new(password))
}
