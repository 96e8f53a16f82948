use objcore::{ObjectId, Result};

use crate::router::Router;

/// Source of raw data blocks for file content.
pub trait BlockStore: Send + Sync {
    fn read_block(&self, repo_id: &str, version: u32, block_id: &ObjectId) -> Result<Vec<u8>>;
}

/// Blocks served from the `blocks` object class.
pub struct BlockManager {
    router: Router,
}

impl BlockManager {
    pub fn new(router: Router) -> Self {
        BlockManager { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

impl BlockStore for BlockManager {
    fn read_block(&self, repo_id: &str, version: u32, block_id: &ObjectId) -> Result<Vec<u8>> {
        self.router.read_obj(repo_id, version, block_id)
    }
}
