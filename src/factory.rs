use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use serde_json::Value;

use objcore::{Error, Result, StoreCrypto};
use remote::conf::Params;
use remote::{BackendConf, ObjType};

use crate::config::StorageConfig;
use crate::router::{RepoStorageResolver, Router, StorageClasses};
use crate::store::ObjectStore;

type Descriptor = serde_json::Map<String, Value>;

/// Builds the object stores of a deployment. The crypto context is loaded
/// once here and shared by every store it hands out.
pub struct ObjectStoreFactory {
    cfg: StorageConfig,
    descriptors: Option<Vec<Descriptor>>,
    crypto: Option<Arc<StoreCrypto>>,
}

impl ObjectStoreFactory {
    pub fn new(cfg: &StorageConfig) -> Result<Self> {
        let crypto = cfg.load_crypto()?.map(Arc::new);

        let descriptors = if cfg.storage_classes_enabled()? {
            let path = cfg.storage_classes_file()?;
            info!("storage classes enabled, descriptors from {}", path.display());
            Some(load_descriptors(&path)?)
        } else {
            None
        };

        Ok(ObjectStoreFactory {
            cfg: cfg.clone(),
            descriptors,
            crypto,
        })
    }

    pub fn storage_classes_enabled(&self) -> bool {
        self.descriptors.is_some()
    }

    fn build(&self, conf: &BackendConf, typ: ObjType) -> Result<ObjectStore> {
        let remote = remote::connect(conf)?;
        Ok(ObjectStore::new(remote, typ, self.crypto.clone()))
    }

    /// Single-backend mode store for one object class.
    pub fn obj_store(&self, typ: ObjType) -> Result<ObjectStore> {
        let conf = BackendConf::from_config(
            self.cfg.backend_section(typ),
            &self.cfg.storage_dir(),
            typ,
        )?;
        info!("{} objects: {} backend from [{}]", typ, conf.kind(), typ.section());
        self.build(&conf, typ)
    }

    /// Storage-class mode stores for one object class, keyed by storage id.
    pub fn obj_stores(&self, typ: ObjType) -> Result<StorageClasses> {
        let descriptors = self.descriptors.as_ref().ok_or_else(|| {
            Error::InvalidConfig("storage classes are not enabled".to_string())
        })?;

        let mut classes = StorageClasses::new();
        for desc in descriptors {
            let storage_id = desc.required("storage_id")?;
            let entry = desc
                .get(&typ.to_string())
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    Error::InvalidConfig(format!(
                        "storage {} has no {} backend",
                        storage_id, typ
                    ))
                })?;

            let conf = BackendConf::from_json(entry, typ)?;
            info!(
                "{} objects: storage {} ({}) on {} backend",
                typ,
                storage_id,
                desc.text("name")?.unwrap_or_default(),
                conf.kind()
            );

            let store = self.build(&conf, typ)?;
            classes.insert(&storage_id, store, desc.flag_or("is_default", false)?)?;
        }

        if classes.default_id().is_none() {
            warn!("no default storage class for {} objects", typ);
        }
        Ok(classes)
    }

    /// Router for one object class in whichever mode is configured. The
    /// resolver is only consulted in storage-class mode.
    pub fn router(&self, typ: ObjType, resolver: Option<Arc<RepoStorageResolver>>) -> Result<Router> {
        if !self.storage_classes_enabled() {
            return self.obj_store(typ).map(Router::Single);
        }

        let resolver = resolver.ok_or_else(|| {
            Error::InvalidConfig("storage classes need a repo storage lookup".to_string())
        })?;
        Ok(Router::Classes {
            classes: self.obj_stores(typ)?,
            resolver,
        })
    }
}

fn load_descriptors(path: &Path) -> Result<Vec<Descriptor>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidConfig(format!("reading {}: {}", path.display(), e)))?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(desc) => Ok(desc),
                other => Err(Error::InvalidConfig(format!(
                    "{}: storage descriptor must be an object, got {}",
                    path.display(),
                    other
                ))),
            })
            .collect(),
        _ => Err(Error::InvalidConfig(format!(
            "{}: expected a list of storage descriptors",
            path.display()
        ))),
    }
}
