use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::options::Options;
use crate::store::KdfParams;

const CONFIG_DIR: &str = ".keybridge";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub version: u32,
    pub kdf: String,
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
    /// Hex-encoded 32-byte salt for Argon2id.
    pub salt: String,
    /// Options applied to every CLI command unless a flag overrides them.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

impl Config {
    pub fn default_new(salt_hex: String) -> Self {
        let kdf = KdfParams::default();
        Self {
            version: 1,
            kdf: "argon2id".into(),
            m_cost: kdf.m_cost,
            t_cost: kdf.t_cost,
            p_cost: kdf.p_cost,
            salt: salt_hex,
            defaults: BTreeMap::new(),
        }
    }

    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            m_cost: self.m_cost,
            t_cost: self.t_cost,
            p_cost: self.p_cost,
        }
    }

    pub fn salt_bytes(&self) -> Result<Vec<u8>, StoreError> {
        hex::decode(&self.salt)
            .map_err(|_| StoreError::Config("Invalid salt hex in config.toml".into()))
    }

    /// Config defaults with `overrides` layered on top. Built fresh per command.
    pub fn options_with(&self, overrides: Options) -> Options {
        let mut options = self.defaults.clone();
        options.extend(overrides);
        options
    }
}

/// Returns the `.keybridge` directory for a given project root.
/// Namespace files live next to the config.
pub fn keybridge_dir(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR)
}

/// Returns the config file path for a given project root.
pub fn config_path(project_root: &Path) -> PathBuf {
    keybridge_dir(project_root).join(CONFIG_FILE)
}

/// Read and parse config from the given project root. Returns an error if not initialized.
pub fn read(project_root: &Path) -> Result<Config, StoreError> {
    let path = config_path(project_root);
    if !path.exists() {
        return Err(StoreError::NotInitialized);
    }
    let raw = std::fs::read_to_string(&path)?;
    let config: Config = toml::from_str(&raw).map_err(|e| StoreError::Config(e.to_string()))?;
    if config.kdf != "argon2id" {
        return Err(StoreError::Config(format!(
            "Unsupported kdf '{}' in config.toml",
            config.kdf
        )));
    }
    Ok(config)
}

/// Write config to the given project root. Creates the `.keybridge` directory if needed.
pub fn write(project_root: &Path, config: &Config) -> Result<(), StoreError> {
    let dir = keybridge_dir(project_root);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(CONFIG_FILE);
    let raw = toml::to_string(config).map_err(|e| StoreError::Config(e.to_string()))?;
    std::fs::write(path, raw)?;
    Ok(())
}

/// Returns the current project root (cwd).
pub fn project_root() -> Result<PathBuf, StoreError> {
    std::env::current_dir().map_err(StoreError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_salt_hex() -> String {
        hex::encode((0u8..32).collect::<Vec<u8>>())
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let salt = fake_salt_hex();

        let mut config = Config::default_new(salt.clone());
        config
            .defaults
            .insert("namespace".into(), "accounts".into());
        write(root, &config).unwrap();

        let loaded = read(root).unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.kdf, "argon2id");
        assert_eq!(loaded.salt, salt);
        assert_eq!(loaded.defaults.get("namespace").map(String::as_str), Some("accounts"));
    }

    #[test]
    fn test_read_missing_config_returns_not_initialized() {
        let dir = TempDir::new().unwrap();
        let err = read(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::NotInitialized));
    }

    #[test]
    fn test_config_without_defaults_table_parses() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(keybridge_dir(root)).unwrap();
        std::fs::write(
            config_path(root),
            format!(
                "version = 1\nkdf = \"argon2id\"\nm_cost = 8192\nt_cost = 1\np_cost = 1\nsalt = \"{}\"\n",
                fake_salt_hex()
            ),
        )
        .unwrap();

        let loaded = read(root).unwrap();
        assert!(loaded.defaults.is_empty());
        assert_eq!(loaded.kdf_params().m_cost, 8192);
    }

    #[test]
    fn test_unsupported_kdf_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default_new(fake_salt_hex());
        config.kdf = "scrypt".into();
        write(dir.path(), &config).unwrap();
        assert!(matches!(read(dir.path()).unwrap_err(), StoreError::Config(_)));
    }

    #[test]
    fn test_salt_bytes_roundtrip() {
        let original: Vec<u8> = (0u8..32).collect();
        let config = Config::default_new(hex::encode(&original));
        assert_eq!(config.salt_bytes().unwrap(), original);
    }

    #[test]
    fn test_flags_override_defaults() {
        let mut config = Config::default_new(fake_salt_hex());
        config.defaults.insert("namespace".into(), "accounts".into());
        config.defaults.insert("resetOnError".into(), "true".into());

        let options = config.options_with(Options::from([(
            "namespace".to_string(),
            "tokens".to_string(),
        )]));
        assert_eq!(options.get("namespace").map(String::as_str), Some("tokens"));
        assert_eq!(options.get("resetOnError").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_kdf_params_default() {
        let config = Config::default_new(fake_salt_hex());
        let params = config.kdf_params();
        assert_eq!(params.m_cost, 65536);
        assert_eq!(params.t_cost, 3);
        assert_eq!(params.p_cost, 4);
    }
}
