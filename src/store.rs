use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use flate2::read::ZlibDecoder;
use log::debug;

use objcore::{Error, ObjectId, Result, StoreCrypto};
use remote::{ObjType, Remote};

/// One backend for one class of objects.
///
/// Reads run fetch, decrypt, then zlib decompress. Only `fs` objects of
/// version 1 and later are compressed, v0 metadata and raw blocks are stored
/// as is.
pub struct ObjectStore {
    remote: Box<dyn Remote>,
    typ: ObjType,
    crypto: Option<Arc<StoreCrypto>>,
    reads: AtomicU64,
}

impl ObjectStore {
    pub fn new(remote: Box<dyn Remote>, typ: ObjType, crypto: Option<Arc<StoreCrypto>>) -> Self {
        ObjectStore {
            remote,
            typ,
            crypto,
            reads: AtomicU64::new(0),
        }
    }

    pub fn obj_type(&self) -> ObjType {
        self.typ
    }

    pub fn kind(&self) -> &'static str {
        self.remote.kind()
    }

    pub fn is_encrypted(&self) -> bool {
        self.crypto.is_some()
    }

    fn is_compressed(&self, version: u32) -> bool {
        self.typ == ObjType::Fs && version >= 1
    }

    pub fn read_obj(&self, repo_id: &str, version: u32, obj_id: &ObjectId) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        debug!("{} read {}/{} (v{})", self.typ, repo_id, obj_id, version);

        let data = self.remote.read(repo_id, version, obj_id)?;

        let data = match &self.crypto {
            Some(crypto) => crypto.decrypt(&data)?,
            None => data,
        };

        if !self.is_compressed(version) {
            return Ok(data);
        }

        let mut out = Vec::with_capacity(data.len().saturating_mul(4));
        ZlibDecoder::new(&data[..])
            .read_to_end(&mut out)
            .map_err(Error::Decompression)?;
        Ok(out)
    }

    /// Number of `read_obj` calls so far.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}
