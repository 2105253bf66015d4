use anyhow::{bail, Context, Result};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

use keybridge::config;
use keybridge::store::MasterKey;

pub fn run() -> Result<()> {
    let root = config::project_root()?;
    let cfg_path = config::config_path(&root);

    if cfg_path.exists() {
        bail!(
            "keybridge is already initialized in this directory. \
             To reinitialize, delete .keybridge/ first."
        );
    }

    println!("Initializing keybridge store...");

    // Generate a fresh 32-byte salt
    let mut salt = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = hex::encode(&salt);

    let cfg = config::Config::default_new(salt_hex);

    let password = prompt_new_password()?;

    // Derive once so bad KDF parameters fail here rather than on first use.
    MasterKey::derive(&password, &salt, &cfg.kdf_params())
        .context("Failed to derive store key")?;

    config::write(&root, &cfg).context("Failed to write config")?;

    println!("Initialized.");
    println!();
    println!("  1. Store a value:   keybridge write api_token");
    println!("  2. Read it back:    keybridge read api_token");
    println!("  3. List keys:       keybridge read-all");
    println!();
    println!("Set KEYBRIDGE_PASSWORD to skip the password prompt in scripts.");

    Ok(())
}

pub fn prompt_new_password() -> Result<SecretString> {
    let password = rpassword::prompt_password("New keybridge password: ")
        .context("Failed to read password")?;
    let confirm = rpassword::prompt_password("Confirm keybridge password: ")
        .context("Failed to read password confirmation")?;

    let password = SecretString::new(password);
    if password.expose_secret() != &confirm {
        bail!("Passwords do not match.");
    }
    if password.expose_secret().is_empty() {
        bail!("keybridge password must not be empty.");
    }

    Ok(password)
}
