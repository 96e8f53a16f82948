use std::borrow::Cow;
use std::collections::BTreeMap;

use objcore::{Error, ObjectId, Result};

// POSIX file type bits
pub const S_IFMT: u32 = 0o170000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFDIR: u32 = 0o040000;

/// Mode written for regular files by the encoders.
pub const FILE_MODE: u32 = S_IFREG | 0o644;
/// Mode written for directories by the encoders.
pub const DIR_MODE: u32 = S_IFDIR;

/// Value of `mtime`/`size` when the encoding does not carry it.
pub const UNKNOWN: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

impl EntryKind {
    /// `None` for anything that is neither a regular file nor a directory.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & S_IFMT {
            S_IFREG => Some(EntryKind::File),
            S_IFDIR => Some(EntryKind::Dir),
            _ => None,
        }
    }

    pub fn mode(&self) -> u32 {
        match self {
            EntryKind::File => FILE_MODE,
            EntryKind::Dir => DIR_MODE,
        }
    }
}

/// How entry names are handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMode {
    /// Names are opaque bytes.
    #[default]
    Bytes,
    /// Every name must be valid UTF-8, decoding fails otherwise.
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: Vec<u8>,
    pub kind: EntryKind,
    pub id: ObjectId,
    pub mtime: i64,
    pub size: i64,
}

impl DirEntry {
    pub fn new<N: Into<Vec<u8>>>(name: N, kind: EntryKind, id: ObjectId) -> Self {
        DirEntry {
            name: name.into(),
            kind,
            id,
            mtime: UNKNOWN,
            size: UNKNOWN,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

/// Collects decoded entries, keyed by name. A later entry with the same name
/// replaces the earlier one.
#[derive(Debug, Default)]
pub(crate) struct Dirents {
    mode: NameMode,
    entries: BTreeMap<Vec<u8>, DirEntry>,
}

impl Dirents {
    pub(crate) fn new(mode: NameMode) -> Self {
        Dirents {
            mode,
            entries: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, obj_id: &ObjectId, entry: DirEntry) -> Result<()> {
        if self.mode == NameMode::Text && std::str::from_utf8(&entry.name).is_err() {
            return Err(Error::format(
                obj_id,
                format!("entry name {:?} is not valid utf-8", entry.name_lossy()),
            ));
        }
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Entries in ascending name order.
    pub(crate) fn into_sorted(self) -> Vec<DirEntry> {
        self.entries.into_values().collect()
    }
}
