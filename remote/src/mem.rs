use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use log::debug;

use objcore::{Error, ObjectId, Result};

use crate::Remote;

/// In-memory backend, counts every read so callers can assert on I/O.
#[derive(Default)]
pub struct MemRemote {
    objects: RwLock<HashMap<(String, ObjectId), Vec<u8>>>,
    reads: AtomicU64,
}

impl MemRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, repo_id: &str, obj_id: ObjectId, data: Vec<u8>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((repo_id.to_string(), obj_id), data);
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl Remote for MemRemote {
    fn read(&self, repo_id: &str, _version: u32, obj_id: &ObjectId) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        debug!("mem read: {}/{}", repo_id, obj_id);

        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(repo_id.to_string(), *obj_id))
            .cloned()
            .ok_or_else(|| Error::not_found(repo_id, obj_id))
    }

    fn kind(&self) -> &'static str {
        "mem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_read_count() {
        let id = ObjectId::from([1u8; 20]);
        let remote = MemRemote::new();
        assert!(remote.is_empty());

        remote.insert("repo", id, b"data".to_vec());
        assert_eq!(remote.len(), 1);
        assert_eq!(remote.read("repo", 1, &id).unwrap(), b"data");
        assert!(matches!(
            remote.read("other", 1, &id),
            Err(Error::ObjectNotFound { .. })
        ));
        assert_eq!(remote.reads(), 2);
    }
}
