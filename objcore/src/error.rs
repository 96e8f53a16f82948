use thiserror::Error;

/// Every failure the object-storage layer can report.
#[derive(Error, Debug)]
pub enum Error {
    /// Start-up misconfiguration: missing parameters, duplicate default
    /// backend, missing key material.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid object id: {0}")]
    InvalidId(String),

    /// Decoded bytes do not match the layout of their declared version.
    #[error("corrupt object {id}: {reason}")]
    ObjectFormat { id: String, reason: String },

    #[error("object {repo_id}/{obj_id} not found")]
    ObjectNotFound { repo_id: String, obj_id: String },

    #[error("backend I/O failed: {context}")]
    BackendIo {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("decryption failed: {0}")]
    Crypto(String),

    #[error("decompression failed")]
    Decompression(#[source] std::io::Error),

    /// Protocol mismatch, the caller cannot recover from this.
    #[error("unsupported fs version {0}")]
    UnsupportedVersion(u32),
}

impl Error {
    pub fn format<I: ToString, R: Into<String>>(id: I, reason: R) -> Self {
        Error::ObjectFormat {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_found<O: ToString>(repo_id: &str, obj_id: O) -> Self {
        Error::ObjectNotFound {
            repo_id: repo_id.to_string(),
            obj_id: obj_id.to_string(),
        }
    }

    pub fn backend<C, E>(context: C, source: E) -> Self
    where
        C: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::BackendIo {
            context: context.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
