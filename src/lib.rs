pub mod blocks;
pub mod config;
pub mod dir;
pub mod factory;
pub mod file;
pub mod lookup;
pub mod manager;
pub mod router;
pub mod store;
pub mod stream;

pub use objcore::{Error, ObjectId, Result, StoreCrypto};
pub use objfmt::{DirEntry, EntryKind, NameMode};
pub use remote::ObjType;

pub use crate::blocks::{BlockManager, BlockStore};
pub use crate::config::StorageConfig;
pub use crate::dir::{Child, DirectoryTree};
pub use crate::file::FileManifest;
pub use crate::manager::Manager;
pub use crate::stream::FileStream;
