use std::cmp;
use std::io;

use objcore::Result;

use crate::blocks::BlockStore;
use crate::file::FileManifest;

// Upper bound on up-front allocation for one read call
const MAX_PREALLOC: usize = 1024 * 1024;

/// Sequential reader over the blocks of one file.
pub struct FileStream<'a> {
    manifest: &'a FileManifest,
    blocks: &'a dyn BlockStore,

    current: Option<Vec<u8>>,
    next_block: usize,
    offset: usize,
}

impl<'a> FileStream<'a> {
    pub fn new(manifest: &'a FileManifest, blocks: &'a dyn BlockStore) -> Self {
        FileStream {
            manifest,
            blocks,
            current: None,
            next_block: 0,
            offset: 0,
        }
    }

    /// Up to `n` bytes, fewer only at end of file.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(cmp::min(n, MAX_PREALLOC));

        while out.len() < n {
            let Some(avail) = self.fill()? else {
                break;
            };
            let take = cmp::min(n - out.len(), avail.len());
            out.extend_from_slice(&avail[..take]);
            self.offset += take;
        }
        Ok(out)
    }

    // Unread part of the current block, loading blocks until one has data
    fn fill(&mut self) -> Result<Option<&[u8]>> {
        loop {
            let exhausted = match &self.current {
                Some(block) => self.offset >= block.len(),
                None => true,
            };
            if !exhausted {
                break;
            }

            let Some(block_id) = self.manifest.block_ids().get(self.next_block) else {
                self.current = None;
                return Ok(None);
            };
            let block = self
                .blocks
                .read_block(self.manifest.repo_id(), self.manifest.version(), block_id)?;

            self.next_block += 1;
            self.current = Some(block);
            self.offset = 0;
        }

        Ok(self.current.as_deref().map(|block| &block[self.offset..]))
    }
}

impl io::Read for FileStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let avail = match self.fill() {
            Ok(Some(avail)) => avail,
            Ok(None) => return Ok(0),
            Err(e) => return Err(io::Error::new(io::ErrorKind::Other, e)),
        };
        let len = cmp::min(buf.len(), avail.len());
        buf[..len].copy_from_slice(&avail[..len]);
        self.offset += len;
        Ok(len)
    }
}
