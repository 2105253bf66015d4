use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::StoreError;
use crate::options::StoreOptions;
use crate::store::{Result, SecureStore, StoreState};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const STORE_EXTENSION: &str = "store";

#[derive(Clone, Debug)]
pub struct KdfParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 65536, // 64 MB
            t_cost: 3,
            p_cost: 4,
        }
    }
}

/// 32-byte AES key derived once per process. Wiped when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    /// Derive the key from a password and salt using Argon2id.
    pub fn derive(password: &SecretString, salt: &[u8], params: &KdfParams) -> Result<Self> {
        let argon2_params =
            Params::new(params.m_cost, params.t_cost, params.p_cost, Some(KEY_LEN))
                .map_err(|e| StoreError::Config(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

        let mut key = [0u8; KEY_LEN];
        argon2
            .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key)
            .map_err(|e| StoreError::Config(e.to_string()))?;

        Ok(Self(key))
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.0)
            .map_err(|_| StoreError::CorruptStore("Invalid key length.".into()))
    }
}

/// AES-256-GCM store keeping one encrypted file per namespace.
///
/// Every operation decrypts the namespace file, applies the change, and writes
/// it back atomically. Nothing decrypted outlives the call.
pub struct EncryptedFileStore {
    dir: PathBuf,
    key: MasterKey,
    /// File of the namespace selected by the last `configure`.
    current: Option<PathBuf>,
}

impl EncryptedFileStore {
    pub fn new(dir: PathBuf, key: MasterKey) -> Self {
        Self {
            dir,
            key,
            current: None,
        }
    }

    /// Path of the encrypted file backing `namespace`.
    pub fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.{STORE_EXTENSION}"))
    }

    fn path(&self) -> Result<&Path> {
        self.current.as_deref().ok_or(StoreError::NotConfigured)
    }

    /// Decrypt the namespace file. A missing file reports `Uninitialized`.
    fn load(&self) -> Result<HashMap<String, String>> {
        let path = self.path()?;
        if !path.exists() {
            return Err(StoreError::Uninitialized(path.display().to_string()));
        }

        let ciphertext_with_nonce = std::fs::read(path)?;
        if ciphertext_with_nonce.len() < NONCE_LEN {
            return Err(StoreError::CorruptStore(
                "Store file too short to contain a nonce.".into(),
            ));
        }

        let (nonce_bytes, ciphertext) = ciphertext_with_nonce.split_at(NONCE_LEN);
        let plaintext = Zeroizing::new(
            self.key
                .cipher()?
                .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
                .map_err(|_| StoreError::DecryptionFailed)?,
        );

        serde_json::from_slice(&plaintext).map_err(|e| StoreError::CorruptStore(e.to_string()))
    }

    /// Like `load`, but an absent namespace is an empty map.
    fn load_or_empty(&self) -> Result<HashMap<String, String>> {
        match self.load() {
            Err(e) if e.is_uninitialized() => Ok(HashMap::new()),
            other => other,
        }
    }

    /// Encrypt `entries` and write them atomically to the namespace file.
    fn save(&self, entries: &HashMap<String, String>) -> Result<()> {
        let path = self.path()?;

        let json_bytes = Zeroizing::new(
            serde_json::to_vec(entries).map_err(|e| StoreError::Serialization(e.to_string()))?,
        );

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .key
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), json_bytes.as_slice())
            .map_err(|_| StoreError::CorruptStore("Encryption failed.".into()))?;

        // Atomic write: write to temp file → fsync → rename
        let parent = path
            .parent()
            .ok_or_else(|| StoreError::Config("Store has no parent directory.".into()))?;
        std::fs::create_dir_all(parent)?;

        let tmp_path = parent.join(format!(".store.tmp.{}", rand::random::<u64>()));

        {
            let mut tmp = std::fs::File::create(&tmp_path)?;
            tmp.write_all(&nonce_bytes)?;
            tmp.write_all(&ciphertext)?;
            tmp.sync_all()?;
        }

        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

impl SecureStore for EncryptedFileStore {
    fn configure(&mut self, options: &StoreOptions) -> Result<StoreState> {
        let path = self.namespace_path(&options.namespace);
        let state = if path.exists() {
            StoreState::Ready
        } else {
            StoreState::Uninitialized
        };
        self.current = Some(path);
        Ok(state)
    }

    fn read(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load_or_empty()?;
        entries.insert(key.to_string(), value.to_string());
        let result = self.save(&entries);
        wipe(entries);
        result
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let mut entries = self.load()?;
        let removed = entries.remove(key).is_some();
        let result = if removed { self.save(&entries) } else { Ok(()) };
        wipe(entries);
        result
    }

    fn delete_all(&mut self) -> Result<()> {
        let path = self.path()?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn contains_key(&mut self, key: &str) -> Result<bool> {
        let entries = self.load()?;
        let found = entries.contains_key(key);
        wipe(entries);
        Ok(found)
    }

    fn read_all(&mut self) -> Result<BTreeMap<String, String>> {
        Ok(self.load()?.into_iter().collect())
    }
}

fn wipe(entries: HashMap<String, String>) {
    for (_, mut value) in entries {
        value.zeroize();
    }
}
