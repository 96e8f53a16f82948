pub mod crypto;
pub mod error;
pub mod id;

pub use crate::crypto::StoreCrypto;
pub use crate::error::{Error, Result};
pub use crate::id::ObjectId;
