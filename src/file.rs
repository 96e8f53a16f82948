use std::borrow::Cow;
use std::sync::OnceLock;

use objcore::{ObjectId, Result};
use objfmt::FileBody;

use crate::blocks::BlockStore;
use crate::stream::FileStream;

/// Ordered block list of one file version.
pub struct FileManifest {
    repo_id: String,
    version: u32,
    obj_id: ObjectId,
    block_ids: Vec<ObjectId>,
    size: u64,

    // Full content, filled by the first complete read
    content: OnceLock<Vec<u8>>,
}

impl FileManifest {
    pub fn new(repo_id: &str, version: u32, obj_id: ObjectId, body: FileBody) -> Self {
        FileManifest {
            repo_id: repo_id.to_string(),
            version,
            obj_id,
            block_ids: body.block_ids,
            size: body.size,
            content: OnceLock::new(),
        }
    }

    /// Zero byte file behind the all-zero id.
    pub fn empty(repo_id: &str, version: u32) -> Self {
        FileManifest::new(repo_id, version, ObjectId::zero(), FileBody::default())
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

    pub fn block_ids(&self) -> &[ObjectId] {
        &self.block_ids
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn stream<'a>(&'a self, blocks: &'a dyn BlockStore) -> FileStream<'a> {
        FileStream::new(self, blocks)
    }

    /// Whole content when `limit` is `None`, zero or at least the file size,
    /// kept after the first read. Otherwise the first `limit` bytes, read
    /// fresh every call.
    pub fn get_content(&self, blocks: &dyn BlockStore, limit: Option<u64>) -> Result<Cow<'_, [u8]>> {
        match limit {
            Some(limit) if limit > 0 && limit < self.size => {
                let data = self.stream(blocks).read(to_usize(limit))?;
                Ok(Cow::Owned(data))
            }
            _ => {
                if let Some(content) = self.content.get() {
                    return Ok(Cow::Borrowed(content.as_slice()));
                }
                let data = self.stream(blocks).read(to_usize(self.size))?;
                Ok(Cow::Borrowed(self.content.get_or_init(|| data).as_slice()))
            }
        }
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use objcore::Error;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Blocks {
        data: HashMap<ObjectId, Vec<u8>>,
        reads: AtomicUsize,
    }

    impl BlockStore for Blocks {
        fn read_block(&self, repo_id: &str, _version: u32, block_id: &ObjectId) -> Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.data
                .get(block_id)
                .cloned()
                .ok_or_else(|| Error::not_found(repo_id, block_id))
        }
    }

    fn fixture() -> (FileManifest, Blocks) {
        let a = ObjectId::from([1; 20]);
        let b = ObjectId::from([2; 20]);

        let mut blocks = Blocks::default();
        blocks.data.insert(a, b"Hello ".to_vec());
        blocks.data.insert(b, b"World!".to_vec());

        let manifest = FileManifest::new(
            "repo",
            1,
            ObjectId::from([9; 20]),
            FileBody {
                block_ids: vec![a, b],
                size: 12,
            },
        );
        (manifest, blocks)
    }

    #[test]
    fn full_content_cached() {
        let (manifest, blocks) = fixture();

        let first = manifest.get_content(&blocks, None).unwrap().into_owned();
        assert_eq!(first, b"Hello World!");
        assert_eq!(blocks.reads.load(Ordering::SeqCst), 2);

        let second = manifest.get_content(&blocks, None).unwrap();
        assert_eq!(&second[..], &first[..]);
        assert_eq!(blocks.reads.load(Ordering::SeqCst), 2);

        // Zero and oversized limits are full reads too
        assert_eq!(&manifest.get_content(&blocks, Some(0)).unwrap()[..], &first[..]);
        assert_eq!(&manifest.get_content(&blocks, Some(100)).unwrap()[..], &first[..]);
        assert_eq!(blocks.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn partial_not_cached() {
        let (manifest, blocks) = fixture();

        assert_eq!(&manifest.get_content(&blocks, Some(8)).unwrap()[..], b"Hello Wo");
        assert_eq!(blocks.reads.load(Ordering::SeqCst), 2);

        assert_eq!(&manifest.get_content(&blocks, Some(3)).unwrap()[..], b"Hel");
        assert_eq!(blocks.reads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failed_read_not_cached() {
        let (manifest, mut blocks) = fixture();
        let missing = blocks.data.remove(&ObjectId::from([2; 20])).unwrap();

        assert!(manifest.get_content(&blocks, None).is_err());

        blocks.data.insert(ObjectId::from([2; 20]), missing);
        assert_eq!(&manifest.get_content(&blocks, None).unwrap()[..], b"Hello World!");
    }

    #[test]
    fn empty_manifest() {
        let manifest = FileManifest::empty("repo", 1);
        let blocks = Blocks::default();

        assert!(manifest.obj_id().is_zero());
        assert_eq!(manifest.size(), 0);
        assert!(manifest.get_content(&blocks, None).unwrap().is_empty());
        assert_eq!(blocks.reads.load(Ordering::SeqCst), 0);
    }
}
