use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use objcore::{Error, ObjectId, Result};

use crate::lookup::StorageClassLookup;
use crate::store::ObjectStore;

/// Caches which storage class each repository lives in. Answers, including
/// "not mapped", are kept for the lifetime of the resolver.
pub struct RepoStorageResolver {
    lookup: Box<dyn StorageClassLookup>,
    cache: RwLock<HashMap<String, Option<String>>>,
}

impl RepoStorageResolver {
    pub fn new(lookup: Box<dyn StorageClassLookup>) -> Self {
        RepoStorageResolver {
            lookup,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn storage_id(&self, repo_id: &str) -> Result<Option<String>> {
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(repo_id)
        {
            return Ok(hit.clone());
        }

        let found = self.lookup.resolve(repo_id)?;
        debug!("repo {} -> storage {:?}", repo_id, found);

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(repo_id.to_string(), found.clone());
        Ok(found)
    }

    /// Number of repositories with a cached answer.
    pub fn cached(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Stores of one object class keyed by storage id.
pub struct StorageClasses {
    stores: HashMap<String, ObjectStore>,
    default: Option<String>,
}

impl StorageClasses {
    pub fn new() -> Self {
        StorageClasses {
            stores: HashMap::new(),
            default: None,
        }
    }

    pub fn insert(&mut self, storage_id: &str, store: ObjectStore, is_default: bool) -> Result<()> {
        if is_default {
            if let Some(prev) = &self.default {
                return Err(Error::InvalidConfig(format!(
                    "only one default backend can be set, {} and {} both are",
                    prev, storage_id
                )));
            }
            self.default = Some(storage_id.to_string());
        }
        self.stores.insert(storage_id.to_string(), store);
        Ok(())
    }

    pub fn get(&self, storage_id: &str) -> Option<&ObjectStore> {
        self.stores.get(storage_id)
    }

    pub fn default_store(&self) -> Option<&ObjectStore> {
        self.default.as_deref().and_then(|id| self.get(id))
    }

    pub fn default_id(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl Default for StorageClasses {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks the store a repository's objects are read from.
pub enum Router {
    Single(ObjectStore),
    Classes {
        classes: StorageClasses,
        resolver: Arc<RepoStorageResolver>,
    },
}

impl Router {
    pub fn store_for(&self, repo_id: &str) -> Result<&ObjectStore> {
        match self {
            Router::Single(store) => Ok(store),
            Router::Classes { classes, resolver } => match resolver.storage_id(repo_id)? {
                Some(storage_id) => classes.get(&storage_id).ok_or_else(|| {
                    Error::InvalidConfig(format!(
                        "repo {} is mapped to unknown storage {}",
                        repo_id, storage_id
                    ))
                }),
                None => classes.default_store().ok_or_else(|| {
                    Error::InvalidConfig(format!(
                        "repo {} has no storage class and no default is set",
                        repo_id
                    ))
                }),
            },
        }
    }

    pub fn read_obj(&self, repo_id: &str, version: u32, obj_id: &ObjectId) -> Result<Vec<u8>> {
        self.store_for(repo_id)?.read_obj(repo_id, version, obj_id)
    }
}
