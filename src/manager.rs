use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;

use objcore::{Error, ObjectId, Result};
use objfmt::NameMode;
use remote::ObjType;

use crate::blocks::BlockManager;
use crate::config::StorageConfig;
use crate::dir::DirectoryTree;
use crate::factory::ObjectStoreFactory;
use crate::file::FileManifest;
use crate::lookup::{SqliteLookup, StorageClassLookup};
use crate::router::{RepoStorageResolver, Router};

/// Entry point for loading directories and files. Owns the routers of the
/// `fs` and `blocks` classes, and through them the repo storage cache.
pub struct Manager {
    fs: Router,
    blocks: BlockManager,

    dirs_loaded: AtomicU64,
    files_loaded: AtomicU64,
}

impl Manager {
    pub fn new(fs: Router, blocks: Router) -> Self {
        Manager {
            fs,
            blocks: BlockManager::new(blocks),
            dirs_loaded: AtomicU64::new(0),
            files_loaded: AtomicU64::new(0),
        }
    }

    /// Builds both routers from the config. In storage-class mode `lookup`
    /// answers repo to storage id, falling back to the configured
    /// `lookup_db`.
    pub fn from_config(
        cfg: &StorageConfig,
        lookup: Option<Box<dyn StorageClassLookup>>,
    ) -> Result<Self> {
        let factory = ObjectStoreFactory::new(cfg)?;

        let resolver = if factory.storage_classes_enabled() {
            let lookup = match (lookup, cfg.lookup_db()?) {
                (Some(lookup), _) => lookup,
                (None, Some(path)) => Box::new(SqliteLookup::open(path)?),
                (None, None) => {
                    return Err(Error::InvalidConfig(
                        "storage classes need [storage] lookup_db".to_string(),
                    ))
                }
            };
            Some(Arc::new(RepoStorageResolver::new(lookup)))
        } else {
            None
        };

        Ok(Manager::new(
            factory.router(ObjType::Fs, resolver.clone())?,
            factory.router(ObjType::Blocks, resolver)?,
        ))
    }

    pub fn load_directory(&self, repo_id: &str, version: u32, obj_id: &ObjectId) -> Result<DirectoryTree> {
        self.load_directory_with(repo_id, version, obj_id, NameMode::Bytes)
    }

    pub fn load_directory_with(
        &self,
        repo_id: &str,
        version: u32,
        obj_id: &ObjectId,
        mode: NameMode,
    ) -> Result<DirectoryTree> {
        self.dirs_loaded.fetch_add(1, Ordering::Relaxed);

        if obj_id.is_zero() {
            return Ok(DirectoryTree::empty(repo_id, version, mode));
        }
        objfmt::check_version(version)?;

        debug!("load dir {}/{}", repo_id, obj_id);
        let data = self.fs.read_obj(repo_id, version, obj_id)?;
        let entries = objfmt::decode_dir(version, &data, obj_id, mode)?;
        Ok(DirectoryTree::new(repo_id, version, *obj_id, mode, entries))
    }

    pub fn load_file(&self, repo_id: &str, version: u32, obj_id: &ObjectId) -> Result<FileManifest> {
        self.files_loaded.fetch_add(1, Ordering::Relaxed);

        if obj_id.is_zero() {
            return Ok(FileManifest::empty(repo_id, version));
        }
        objfmt::check_version(version)?;

        debug!("load file {}/{}", repo_id, obj_id);
        let data = self.fs.read_obj(repo_id, version, obj_id)?;
        let body = objfmt::decode_file(version, &data, obj_id)?;
        Ok(FileManifest::new(repo_id, version, *obj_id, body))
    }

    pub fn blocks(&self) -> &BlockManager {
        &self.blocks
    }

    pub fn fs_router(&self) -> &Router {
        &self.fs
    }

    pub fn dir_read_count(&self) -> u64 {
        self.dirs_loaded.load(Ordering::Relaxed)
    }

    pub fn file_read_count(&self) -> u64 {
        self.files_loaded.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir::Child;
    use crate::store::ObjectStore;
    use objfmt::{DirEntry, EntryKind, FileBody};
    use remote::mem::MemRemote;
    use remote::Remote;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::collections::HashMap;
    use std::io::Write;

    // Shares one MemRemote between the test and the store
    struct Shared(Arc<MemRemote>);

    impl Remote for Shared {
        fn read(&self, repo_id: &str, version: u32, obj_id: &ObjectId) -> Result<Vec<u8>> {
            self.0.read(repo_id, version, obj_id)
        }

        fn kind(&self) -> &'static str {
            self.0.kind()
        }
    }

    fn id(c: char) -> ObjectId {
        ObjectId::from_hex(c.to_string().repeat(40)).unwrap()
    }

    fn fs_v1(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    struct Fixture {
        mgr: Manager,
        fs: Arc<MemRemote>,
        blocks: Arc<MemRemote>,
    }

    // root (a) -> { docs/ (b) -> { note.txt (c) }, hello.txt (d) }
    fn fixture() -> Fixture {
        let fs = Arc::new(MemRemote::new());
        let blocks = Arc::new(MemRemote::new());

        let root = vec![
            DirEntry::new("hello.txt", EntryKind::File, id('d')),
            DirEntry::new("docs", EntryKind::Dir, id('b')),
        ];
        fs.insert("repo", id('a'), fs_v1(&objfmt::encode_dir(1, &root).unwrap()));

        let docs = vec![DirEntry::new("note.txt", EntryKind::File, id('c'))];
        fs.insert("repo", id('b'), fs_v1(&objfmt::encode_dir(1, &docs).unwrap()));

        let hello = FileBody {
            block_ids: vec![id('1'), id('2')],
            size: 12,
        };
        fs.insert("repo", id('d'), fs_v1(&objfmt::encode_file(1, &hello).unwrap()));
        blocks.insert("repo", id('1'), b"Hello ".to_vec());
        blocks.insert("repo", id('2'), b"World!".to_vec());

        let note = FileBody {
            block_ids: vec![id('3')],
            size: 4,
        };
        fs.insert("repo", id('c'), fs_v1(&objfmt::encode_file(1, &note).unwrap()));
        blocks.insert("repo", id('3'), b"note".to_vec());

        let mgr = Manager::new(
            Router::Single(ObjectStore::new(Box::new(Shared(fs.clone())), ObjType::Fs, None)),
            Router::Single(ObjectStore::new(Box::new(Shared(blocks.clone())), ObjType::Blocks, None)),
        );
        Fixture { mgr, fs, blocks }
    }

    #[test]
    fn walk_tree() {
        let f = fixture();

        let root = f.mgr.load_directory("repo", 1, &id('a')).unwrap();
        assert_eq!(root.len(), 2);
        assert_eq!(root.subdirs().count(), 1);

        let Some(Child::Dir(docs)) = root.lookup(&f.mgr, "docs").unwrap() else {
            panic!("docs is not a directory");
        };
        let Some(Child::File(note)) = docs.lookup(&f.mgr, "note.txt").unwrap() else {
            panic!("note.txt is not a file");
        };
        assert_eq!(&note.get_content(f.mgr.blocks(), None).unwrap()[..], b"note");

        assert!(root.lookup(&f.mgr, "missing").unwrap().is_none());
        assert_eq!(f.mgr.dir_read_count(), 2);
        assert_eq!(f.mgr.file_read_count(), 1);
    }

    #[test]
    fn file_content() {
        let f = fixture();
        let file = f.mgr.load_file("repo", 1, &id('d')).unwrap();
        assert_eq!(file.size(), 12);

        assert_eq!(&file.get_content(f.mgr.blocks(), None).unwrap()[..], b"Hello World!");
        assert_eq!(f.blocks.reads(), 2);

        let mut stream = file.stream(f.mgr.blocks());
        assert_eq!(stream.read(5).unwrap(), b"Hello");
    }

    #[test]
    fn zero_id_no_io() {
        let f = fixture();

        let dir = f.mgr.load_directory("repo", 1, &ObjectId::zero()).unwrap();
        assert!(dir.is_empty());

        let file = f.mgr.load_file("repo", 1, &ObjectId::zero()).unwrap();
        assert_eq!(file.size(), 0);
        assert!(file.get_content(f.mgr.blocks(), None).unwrap().is_empty());

        assert_eq!(f.fs.reads(), 0);
        assert_eq!(f.blocks.reads(), 0);
        assert_eq!(f.mgr.dir_read_count(), 1);
        assert_eq!(f.mgr.file_read_count(), 1);
    }

    #[test]
    fn unsupported_version_before_io() {
        let f = fixture();
        assert!(matches!(
            f.mgr.load_directory("repo", 2, &id('a')),
            Err(Error::UnsupportedVersion(2))
        ));
        assert!(matches!(
            f.mgr.load_file("repo", 9, &id('d')),
            Err(Error::UnsupportedVersion(9))
        ));
        assert_eq!(f.fs.reads(), 0);
        assert_eq!(f.mgr.dir_read_count(), 1);
    }

    #[test]
    fn missing_object() {
        let f = fixture();
        assert!(matches!(
            f.mgr.load_directory("repo", 1, &id('e')),
            Err(Error::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn wrong_object_type() {
        let f = fixture();
        // a file manifest decoded as directory
        assert!(matches!(
            f.mgr.load_directory("repo", 1, &id('d')),
            Err(Error::ObjectFormat { .. })
        ));
    }

    #[test]
    fn text_names() {
        let f = fixture();
        let root = f.mgr.load_directory_with("repo", 1, &id('a'), NameMode::Text).unwrap();
        let Some(Child::Dir(docs)) = root.lookup(&f.mgr, "docs").unwrap() else {
            panic!("docs is not a directory");
        };
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn v0_objects() {
        let fs = MemRemote::new();
        let root = vec![DirEntry::new("x", EntryKind::File, id('1'))];
        fs.insert("repo", id('a'), objfmt::encode_dir(0, &root).unwrap());

        let mgr = Manager::new(
            Router::Single(ObjectStore::new(Box::new(fs), ObjType::Fs, None)),
            Router::Single(ObjectStore::new(Box::new(MemRemote::new()), ObjType::Blocks, None)),
        );

        let dir = mgr.load_directory("repo", 0, &id('a')).unwrap();
        let entry = dir.lookup_dent("x").unwrap();
        assert_eq!(entry.id, id('1'));
        assert_eq!(entry.size, -1);
    }

    #[test]
    fn from_config_single() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StorageConfig::parse(&format!(
            "storage_dir = {:?}\n",
            dir.path().display().to_string()
        ))
        .unwrap();

        let mgr = Manager::from_config(&cfg, None).unwrap();
        assert!(matches!(
            mgr.load_directory("repo", 1, &id('a')),
            Err(Error::ObjectNotFound { .. })
        ));
        assert!(mgr.load_directory("repo", 1, &ObjectId::zero()).unwrap().is_empty());
    }

    #[test]
    fn from_config_classes_need_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path().join("classes.json");
        std::fs::write(&classes, "[]").unwrap();
        let cfg = StorageConfig::parse(&format!(
            "[storage]\nenable_storage_classes = true\nstorage_classes_file = {:?}\n",
            classes.display().to_string()
        ))
        .unwrap();

        assert!(matches!(
            Manager::from_config(&cfg, None),
            Err(Error::InvalidConfig(_))
        ));
        let lookup: HashMap<String, String> = HashMap::new();
        assert!(Manager::from_config(&cfg, Some(Box::new(lookup))).is_ok());
    }
}
