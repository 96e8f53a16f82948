use objcore::{ObjectId, Result};
use objfmt::{DirEntry, EntryKind, NameMode};

use crate::file::FileManifest;
use crate::manager::Manager;

/// A loaded child of a directory.
pub enum Child {
    Dir(DirectoryTree),
    File(FileManifest),
}

/// Immutable snapshot of one directory, entries sorted by name.
pub struct DirectoryTree {
    repo_id: String,
    version: u32,
    obj_id: ObjectId,
    mode: NameMode,
    entries: Vec<DirEntry>,

    // Indices into entries, computed once
    files: Vec<usize>,
    subdirs: Vec<usize>,
}

impl DirectoryTree {
    pub fn new(
        repo_id: &str,
        version: u32,
        obj_id: ObjectId,
        mode: NameMode,
        mut entries: Vec<DirEntry>,
    ) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            match entry.kind {
                EntryKind::File => files.push(i),
                EntryKind::Dir => subdirs.push(i),
            }
        }

        DirectoryTree {
            repo_id: repo_id.to_string(),
            version,
            obj_id,
            mode,
            entries,
            files,
            subdirs,
        }
    }

    /// Empty directory behind the all-zero id.
    pub fn empty(repo_id: &str, version: u32, mode: NameMode) -> Self {
        DirectoryTree::new(repo_id, version, ObjectId::zero(), mode, Vec::new())
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn obj_id(&self) -> &ObjectId {
        &self.obj_id
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn files(&self) -> impl Iterator<Item = &DirEntry> + '_ {
        self.files.iter().map(move |i| &self.entries[*i])
    }

    pub fn subdirs(&self) -> impl Iterator<Item = &DirEntry> + '_ {
        self.subdirs.iter().map(move |i| &self.entries[*i])
    }

    /// Entry by name, no I/O.
    pub fn lookup_dent<N: AsRef<[u8]>>(&self, name: N) -> Option<&DirEntry> {
        let name = name.as_ref();
        self.entries
            .binary_search_by(|e| e.name.as_slice().cmp(name))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Loads the named child through `mgr`, `None` if there is no such entry.
    pub fn lookup<N: AsRef<[u8]>>(&self, mgr: &Manager, name: N) -> Result<Option<Child>> {
        let Some(entry) = self.lookup_dent(name) else {
            return Ok(None);
        };

        let child = match entry.kind {
            EntryKind::Dir => Child::Dir(mgr.load_directory_with(
                &self.repo_id,
                self.version,
                &entry.id,
                self.mode,
            )?),
            EntryKind::File => Child::File(mgr.load_file(&self.repo_id, self.version, &entry.id)?),
        };
        Ok(Some(child))
    }
}
