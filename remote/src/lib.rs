pub mod conf;
pub mod fs;
pub mod mem;

#[cfg(feature = "s3")]
pub mod s3;

#[cfg(feature = "swift")]
pub mod swift;

use std::fmt;
use std::str::FromStr;

use log::info;

use objcore::{Error, ObjectId, Result};

pub use crate::conf::BackendConf;

// Classes of objects being stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjType {
    Blocks,
    Fs,
    Commits,
}

impl ObjType {
    pub const ALL: [ObjType; 3] = [ObjType::Blocks, ObjType::Fs, ObjType::Commits];

    /// Config section describing the single backend of this class.
    pub fn section(&self) -> &'static str {
        match self {
            ObjType::Blocks => "block_backend",
            ObjType::Fs => "fs_object_backend",
            ObjType::Commits => "commit_object_backend",
        }
    }
}

impl fmt::Display for ObjType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjType::Blocks => write!(f, "blocks"),
            ObjType::Fs => write!(f, "fs"),
            ObjType::Commits => write!(f, "commits"),
        }
    }
}

impl FromStr for ObjType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "blocks" => Ok(ObjType::Blocks),
            "fs" => Ok(ObjType::Fs),
            "commits" => Ok(ObjType::Commits),
            other => Err(Error::InvalidConfig(format!("unknown obj_type {}", other))),
        }
    }
}

/// Raw byte access to one backend. Bytes come back exactly as stored, still
/// encrypted and compressed.
pub trait Remote: Send + Sync {
    fn read(&self, repo_id: &str, version: u32, obj_id: &ObjectId) -> Result<Vec<u8>>;

    fn kind(&self) -> &'static str;
}

pub fn connect(conf: &BackendConf) -> Result<Box<dyn Remote>> {
    info!("connecting {} backend", conf.kind());

    match conf {
        BackendConf::Fs(c) => Ok(Box::new(fs::FsRemote::new(&c.obj_dir))),

        #[cfg(feature = "s3")]
        BackendConf::S3(c) => Ok(Box::new(s3::S3Remote::new(c, "s3")?)),

        #[cfg(feature = "s3")]
        BackendConf::Oss(c) => Ok(Box::new(s3::S3Remote::new(&c.as_s3(), "oss")?)),

        #[cfg(feature = "swift")]
        BackendConf::Swift(c) => Ok(Box::new(swift::SwiftRemote::new(c)?)),

        BackendConf::Ceph(c) => Err(Error::InvalidConfig(format!(
            "ceph backend (pool {}) is not available in this build",
            c.pool
        ))),

        #[allow(unreachable_patterns)]
        other => Err(Error::InvalidConfig(format!(
            "{} backend support is not compiled in",
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{CephConf, FsConf};
    use std::path::PathBuf;

    #[test]
    fn obj_type_names() {
        for typ in ObjType::ALL {
            assert_eq!(typ.to_string().parse::<ObjType>().unwrap(), typ);
        }
        assert_eq!(ObjType::Fs.section(), "fs_object_backend");
        assert!("trees".parse::<ObjType>().is_err());
    }

    #[test]
    fn connect_fs() {
        let remote = connect(&BackendConf::Fs(FsConf {
            obj_dir: PathBuf::from("/nonexistent"),
        }))
        .unwrap();
        assert_eq!(remote.kind(), "fs");
    }

    #[test]
    fn connect_ceph_fails() {
        let res = connect(&BackendConf::Ceph(CephConf {
            ceph_config: PathBuf::from("/etc/ceph/ceph.conf"),
            pool: "objs".to_string(),
            ceph_client_id: None,
        }));
        assert!(matches!(res, Err(Error::InvalidConfig(_))));
    }
}
