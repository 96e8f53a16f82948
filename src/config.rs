use std::env;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use objcore::{Error, Result, StoreCrypto};
use remote::conf::Params;
use remote::ObjType;

pub const CONF_FILE: &str = "storage.toml";

// Configuration, read from `storage.toml`
//
// storage_dir = "/srv/syncwerk/storage"
//
// [storage]
// enable_storage_classes = false
// storage_classes_file = "/etc/syncwerk/storage_classes.json"
// lookup_db = "/srv/syncwerk/syncwerk.db"
//
// [store_crypt]
// key_path = "/etc/syncwerk/store.key"
//
// [block_backend]
// name = "s3"
// ...
#[derive(Deserialize, Debug, Clone, Default)]
pub struct StorageConfig {
    pub storage_dir: Option<PathBuf>,

    #[serde(default)]
    pub storage: toml::Table,

    pub store_crypt: Option<CryptSection>,

    #[serde(default)]
    pub block_backend: toml::Table,
    #[serde(default)]
    pub fs_object_backend: toml::Table,
    #[serde(default)]
    pub commit_object_backend: toml::Table,

    #[serde(skip)]
    conf_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CryptSection {
    pub key_path: Option<PathBuf>,
}

// Key file, hex encoded
//
// [store_crypt]
// enc_key = "..."
// enc_iv = "..."
#[derive(Deserialize, Debug)]
struct KeyFile {
    store_crypt: Option<KeyEntry>,
}

#[derive(Deserialize, Debug)]
struct KeyEntry {
    enc_key: Option<String>,
    enc_iv: Option<String>,
}

impl StorageConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("loading storage config {}", path.display());

        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("reading {}: {}", path.display(), e)))?;
        let mut cfg = StorageConfig::parse(&text)?;
        cfg.conf_dir = path.parent().map(Path::to_path_buf);
        Ok(cfg)
    }

    /// `$SYNCWERK_CENTRAL_CONF_DIR/storage.toml`, else
    /// `$SYNCWERK_CONF_DIR/storage.toml`.
    pub fn from_env() -> Result<Self> {
        let conf_dir = env::var_os("SYNCWERK_CENTRAL_CONF_DIR")
            .or_else(|| env::var_os("SYNCWERK_CONF_DIR"))
            .map(PathBuf::from)
            .ok_or_else(|| {
                Error::InvalidConfig(
                    "neither SYNCWERK_CENTRAL_CONF_DIR nor SYNCWERK_CONF_DIR is set".to_string(),
                )
            })?;
        StorageConfig::load(conf_dir.join(CONF_FILE))
    }

    /// Root of the filesystem backends, `<conf_dir>/storage` unless set.
    pub fn storage_dir(&self) -> PathBuf {
        match (&self.storage_dir, &self.conf_dir) {
            (Some(dir), _) => dir.clone(),
            (None, Some(conf_dir)) => conf_dir.join("storage"),
            (None, None) => PathBuf::from("storage"),
        }
    }

    pub fn backend_section(&self, typ: ObjType) -> &toml::Table {
        match typ {
            ObjType::Blocks => &self.block_backend,
            ObjType::Fs => &self.fs_object_backend,
            ObjType::Commits => &self.commit_object_backend,
        }
    }

    pub fn storage_classes_enabled(&self) -> Result<bool> {
        self.storage.flag_or("enable_storage_classes", false)
    }

    pub fn storage_classes_file(&self) -> Result<PathBuf> {
        self.storage.required("storage_classes_file").map(PathBuf::from)
    }

    pub fn lookup_db(&self) -> Result<Option<PathBuf>> {
        Ok(self.storage.text("lookup_db")?.map(PathBuf::from))
    }

    /// `None` when no key file is configured, objects are then plaintext.
    pub fn load_crypto(&self) -> Result<Option<StoreCrypto>> {
        let key_path = match self.store_crypt.as_ref().and_then(|c| c.key_path.as_ref()) {
            Some(path) => path,
            None => return Ok(None),
        };
        if !key_path.exists() {
            return Err(Error::InvalidConfig(format!(
                "key file {} doesn't exist",
                key_path.display()
            )));
        }

        let text = std::fs::read_to_string(key_path)
            .map_err(|e| Error::InvalidConfig(format!("reading {}: {}", key_path.display(), e)))?;
        let key_file: KeyFile = toml::from_str(&text)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", key_path.display(), e)))?;

        match key_file.store_crypt {
            Some(KeyEntry {
                enc_key: Some(key),
                enc_iv: Some(iv),
            }) => {
                info!("store encryption enabled, key from {}", key_path.display());
                StoreCrypto::from_hex(&key, &iv).map(Some)
            }
            _ => Err(Error::InvalidConfig(format!(
                "invalid key file {}: incomplete info",
                key_path.display()
            ))),
        }
    }
}
