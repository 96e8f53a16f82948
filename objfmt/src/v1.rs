//! JSON layout.
//!
//! Directory: `{"dirents": [{"name", "id", "mtime", "mode", "size"?}], ...}`.
//! File: `{"block_ids": [hex, ...], "size": n, ...}`.
use serde::{Deserialize, Serialize};

use objcore::{Error, ObjectId, Result};

use crate::dirent::{DirEntry, Dirents, EntryKind, NameMode, UNKNOWN};
use crate::v0::{DIR_TAG, FILE_TAG};
use crate::FileBody;

const VERSION: u32 = 1;

#[derive(Deserialize)]
struct DirJson {
    dirents: Vec<DirentJson>,
}

#[derive(Deserialize)]
struct DirentJson {
    name: String,
    id: ObjectId,
    #[serde(default)]
    mtime: Option<i64>,
    mode: u32,
    #[serde(default)]
    size: Option<i64>,
}

#[derive(Deserialize)]
struct FileJson {
    block_ids: Vec<ObjectId>,
    size: u64,
}

#[derive(Serialize)]
struct DirOut<'a> {
    #[serde(rename = "type")]
    typ: u32,
    version: u32,
    dirents: Vec<DirentOut<'a>>,
}

#[derive(Serialize)]
struct DirentOut<'a> {
    name: &'a str,
    id: ObjectId,
    mtime: i64,
    mode: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<i64>,
}

#[derive(Serialize)]
struct FileOut<'a> {
    #[serde(rename = "type")]
    typ: u32,
    version: u32,
    block_ids: &'a [ObjectId],
    size: u64,
}

pub fn decode_dir(data: &[u8], obj_id: &ObjectId, mode: NameMode) -> Result<Vec<DirEntry>> {
    let dir: DirJson =
        serde_json::from_slice(data).map_err(|e| Error::format(obj_id, e.to_string()))?;

    let mut dirents = Dirents::new(mode);
    for dent in dir.dirents {
        // Entries that are neither file nor directory are dropped
        let Some(kind) = EntryKind::from_mode(dent.mode) else {
            continue;
        };

        let size = match kind {
            EntryKind::Dir => 0,
            EntryKind::File => dent.size.ok_or_else(|| {
                Error::format(obj_id, format!("file entry {:?} has no size", dent.name))
            })?,
        };

        dirents.insert(
            obj_id,
            DirEntry {
                name: dent.name.into_bytes(),
                kind,
                id: dent.id,
                mtime: dent.mtime.unwrap_or(UNKNOWN),
                size,
            },
        )?;
    }

    Ok(dirents.into_sorted())
}

pub fn decode_file(data: &[u8], obj_id: &ObjectId) -> Result<FileBody> {
    let file: FileJson =
        serde_json::from_slice(data).map_err(|e| Error::format(obj_id, e.to_string()))?;

    Ok(FileBody {
        block_ids: file.block_ids,
        size: file.size,
    })
}

/// Names have to be valid UTF-8 to be representable in JSON.
pub fn encode_dir(entries: &[DirEntry]) -> Result<Vec<u8>> {
    let dirents = entries
        .iter()
        .map(|e| {
            let name = std::str::from_utf8(&e.name).map_err(|_| {
                Error::format(e.id, format!("entry name {:?} is not valid utf-8", e.name_lossy()))
            })?;
            Ok(DirentOut {
                name,
                id: e.id,
                mtime: e.mtime,
                mode: e.kind.mode(),
                size: e.is_file().then_some(e.size),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    serde_json::to_vec(&DirOut {
        typ: DIR_TAG,
        version: VERSION,
        dirents,
    })
    .map_err(|e| Error::format("directory", e.to_string()))
}

pub fn encode_file(body: &FileBody) -> Result<Vec<u8>> {
    serde_json::to_vec(&FileOut {
        typ: FILE_TAG,
        version: VERSION,
        block_ids: &body.block_ids,
        size: body.size,
    })
    .map_err(|e| Error::format("file", e.to_string()))
}
