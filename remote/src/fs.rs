use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;

use objcore::{Error, ObjectId, Result};

use crate::Remote;

/// Objects on local disk, `<obj_dir>/<repo_id>/<id[..2]>/<id[2..]>`.
pub struct FsRemote {
    obj_dir: PathBuf,
}

impl FsRemote {
    pub fn new<P: AsRef<Path>>(obj_dir: P) -> Self {
        FsRemote {
            obj_dir: obj_dir.as_ref().to_path_buf(),
        }
    }

    pub fn obj_path(&self, repo_id: &str, obj_id: &ObjectId) -> Result<PathBuf> {
        if repo_id.is_empty() || repo_id == "." || repo_id == ".." || repo_id.contains(['/', '\\']) {
            return Err(Error::InvalidId(format!("bad repo id {:?}", repo_id)));
        }

        let (fan_out, rest) = obj_id.fan_out();
        Ok(self.obj_dir.join(repo_id).join(fan_out).join(rest))
    }
}

impl Remote for FsRemote {
    fn read(&self, repo_id: &str, _version: u32, obj_id: &ObjectId) -> Result<Vec<u8>> {
        let path = self.obj_path(repo_id, obj_id)?;
        debug!("fs read: {}", path.display());

        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::not_found(repo_id, obj_id),
            _ => Error::backend(format!("reading {}", path.display()), e),
        })
    }

    fn kind(&self) -> &'static str {
        "fs"
    }
}
