pub mod dirent;
pub mod v0;
pub mod v1;

use objcore::{Error, ObjectId, Result};

pub use crate::dirent::{DirEntry, EntryKind, NameMode};

/// Decoded content of a file manifest object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileBody {
    pub block_ids: Vec<ObjectId>,
    pub size: u64,
}

/// Fails for any fs version this crate cannot decode.
pub fn check_version(version: u32) -> Result<()> {
    match version {
        0 | 1 => Ok(()),
        v => Err(Error::UnsupportedVersion(v)),
    }
}

/// Entries come back sorted by name.
pub fn decode_dir(
    version: u32,
    data: &[u8],
    obj_id: &ObjectId,
    mode: NameMode,
) -> Result<Vec<DirEntry>> {
    match version {
        0 => v0::decode_dir(data, obj_id, mode),
        1 => v1::decode_dir(data, obj_id, mode),
        v => Err(Error::UnsupportedVersion(v)),
    }
}

pub fn decode_file(version: u32, data: &[u8], obj_id: &ObjectId) -> Result<FileBody> {
    match version {
        0 => v0::decode_file(data, obj_id),
        1 => v1::decode_file(data, obj_id),
        v => Err(Error::UnsupportedVersion(v)),
    }
}

pub fn encode_dir(version: u32, entries: &[DirEntry]) -> Result<Vec<u8>> {
    match version {
        0 => v0::encode_dir(entries),
        1 => v1::encode_dir(entries),
        v => Err(Error::UnsupportedVersion(v)),
    }
}

pub fn encode_file(version: u32, body: &FileBody) -> Result<Vec<u8>> {
    match version {
        0 => v0::encode_file(body),
        1 => v1::encode_file(body),
        v => Err(Error::UnsupportedVersion(v)),
    }
}
