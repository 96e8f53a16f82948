use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value as JsonValue;
use toml::Value as TomlValue;

use objcore::{Error, Result};

use crate::ObjType;

/// Read-only view over one backend's key/value parameters, either a TOML
/// config section or one class entry of a JSON storage-class descriptor.
pub trait Params {
    fn text(&self, key: &str) -> Result<Option<String>>;
    fn flag(&self, key: &str) -> Result<Option<bool>>;

    fn required(&self, key: &str) -> Result<String> {
        self.text(key)?
            .ok_or_else(|| Error::InvalidConfig(format!("{} is not configured", key)))
    }

    fn flag_or(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self.flag(key)?.unwrap_or(default))
    }
}

pub fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::InvalidConfig(format!(
            "{} = {:?} is not a boolean",
            key, value
        ))),
    }
}

fn wrong_type(key: &str, what: &str) -> Error {
    Error::InvalidConfig(format!("{} must be {}", key, what))
}

impl Params for toml::Table {
    fn text(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(TomlValue::String(s)) => Ok(Some(s.clone())),
            Some(TomlValue::Integer(i)) => Ok(Some(i.to_string())),
            Some(TomlValue::Boolean(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(wrong_type(key, "a string")),
        }
    }

    fn flag(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(TomlValue::Boolean(b)) => Ok(Some(*b)),
            Some(TomlValue::String(s)) => parse_flag(key, s).map(Some),
            Some(TomlValue::Integer(i)) => parse_flag(key, &i.to_string()).map(Some),
            Some(_) => Err(wrong_type(key, "a boolean")),
        }
    }
}

impl Params for serde_json::Map<String, JsonValue> {
    fn text(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.clone())),
            Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
            Some(JsonValue::Bool(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(wrong_type(key, "a string")),
        }
    }

    fn flag(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Bool(b)) => Ok(Some(*b)),
            Some(JsonValue::String(s)) => parse_flag(key, s).map(Some),
            Some(JsonValue::Number(n)) => parse_flag(key, &n.to_string()).map(Some),
            Some(_) => Err(wrong_type(key, "a boolean")),
        }
    }
}

/// Local filesystem backend, objects live below `obj_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsConf {
    pub obj_dir: PathBuf,
}

impl FsConf {
    /// `<dir or storage_dir>/<class>`
    pub fn from_config(section: &toml::Table, storage_dir: &Path, typ: ObjType) -> Result<Self> {
        let base = match section.text("dir")? {
            Some(dir) => PathBuf::from(dir),
            None => storage_dir.to_path_buf(),
        };
        Ok(FsConf {
            obj_dir: base.join(typ.to_string()),
        })
    }

    /// `<dir>/storage/<class>`
    pub fn from_json(entry: &serde_json::Map<String, JsonValue>, typ: ObjType) -> Result<Self> {
        let dir = entry.required("dir")?;
        Ok(FsConf {
            obj_dir: Path::new(&dir).join("storage").join(typ.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Conf {
    pub key_id: String,
    pub key: String,
    pub bucket: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub use_v4_signature: bool,
    pub aws_region: Option<String>,
    pub use_https: bool,
    pub path_style_request: bool,
}

impl S3Conf {
    pub fn from_config(section: &toml::Table) -> Result<Self> {
        S3Conf::parse(section)
    }

    pub fn from_json(entry: &serde_json::Map<String, JsonValue>) -> Result<Self> {
        S3Conf::parse(entry)
    }

    fn parse(p: &dyn Params) -> Result<Self> {
        let (host, port) = match p.text("host")? {
            Some(addr) => split_host(&addr)?,
            None => (None, None),
        };

        let use_v4_signature = p.flag_or("use_v4_signature", false)?;
        let aws_region = if use_v4_signature {
            Some(p.required("aws_region")?)
        } else {
            p.text("aws_region")?
        };

        Ok(S3Conf {
            key_id: p.required("key_id")?,
            key: p.required("key")?,
            bucket: p.required("bucket")?,
            host,
            port,
            use_v4_signature,
            aws_region,
            use_https: p.flag_or("use_https", false)?,
            path_style_request: p.flag_or("path_style_request", false)?,
        })
    }

    /// Explicit endpoint url, `None` means the provider default.
    pub fn endpoint(&self) -> Option<String> {
        let scheme = if self.use_https { "https" } else { "http" };
        self.host.as_ref().map(|host| match self.port {
            Some(port) => format!("{}://{}:{}", scheme, host, port),
            None => format!("{}://{}", scheme, host),
        })
    }
}

// "host[:port]"
fn split_host(addr: &str) -> Result<(Option<String>, Option<u16>)> {
    let mut segs = addr.splitn(2, ':');
    let host = segs.next().unwrap_or_default().to_string();
    let port = match segs.next() {
        Some(port) => Some(port.parse::<u16>().map_err(|_| {
            Error::InvalidConfig(format!("invalid port in host {:?}", addr))
        })?),
        None => None,
    };
    Ok((Some(host), port))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVersion {
    V1,
    V2,
    V3,
}

impl FromStr for AuthVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "v1.0" => Ok(AuthVersion::V1),
            "v2.0" => Ok(AuthVersion::V2),
            "v3.0" => Ok(AuthVersion::V3),
            other => Err(Error::InvalidConfig(format!(
                "unsupported swift auth_ver {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for AuthVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthVersion::V1 => write!(f, "v1.0"),
            AuthVersion::V2 => write!(f, "v2.0"),
            AuthVersion::V3 => write!(f, "v3.0"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwiftConf {
    pub user_name: String,
    pub password: String,
    pub container: String,
    pub auth_host: String,
    pub auth_ver: AuthVersion,
    pub tenant: Option<String>,
    pub use_https: bool,
    pub region: Option<String>,
    pub domain: String,
}

impl SwiftConf {
    pub fn from_config(section: &toml::Table) -> Result<Self> {
        SwiftConf::parse(section)
    }

    pub fn from_json(entry: &serde_json::Map<String, JsonValue>) -> Result<Self> {
        SwiftConf::parse(entry)
    }

    fn parse(p: &dyn Params) -> Result<Self> {
        let auth_ver = match p.text("auth_ver")? {
            Some(ver) => ver.parse()?,
            None => AuthVersion::V2,
        };
        let tenant = match auth_ver {
            AuthVersion::V1 => None,
            _ => Some(p.required("tenant")?),
        };

        Ok(SwiftConf {
            user_name: p.required("user_name")?,
            password: p.required("password")?,
            container: p.required("container")?,
            auth_host: p.required("auth_host")?,
            auth_ver,
            tenant,
            use_https: p.flag_or("use_https", false)?,
            region: p.text("region")?,
            domain: p.text("domain")?.unwrap_or_else(|| "default".to_string()),
        })
    }

    pub fn auth_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        let path = match self.auth_ver {
            AuthVersion::V1 => "auth/v1.0",
            AuthVersion::V2 => "v2.0/tokens",
            AuthVersion::V3 => "v3/auth/tokens",
        };
        format!("{}://{}/{}", scheme, self.auth_host, path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CephConf {
    pub ceph_config: PathBuf,
    pub pool: String,
    pub ceph_client_id: Option<String>,
}

impl CephConf {
    pub fn from_config(section: &toml::Table) -> Result<Self> {
        CephConf::parse(section)
    }

    pub fn from_json(entry: &serde_json::Map<String, JsonValue>) -> Result<Self> {
        CephConf::parse(entry)
    }

    fn parse(p: &dyn Params) -> Result<Self> {
        Ok(CephConf {
            ceph_config: PathBuf::from(p.required("ceph_config")?),
            pool: p.required("pool")?,
            ceph_client_id: p.text("ceph_client_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OssConf {
    pub key_id: String,
    pub key: String,
    pub bucket: String,
    pub endpoint: String,
}

impl OssConf {
    pub fn from_config(section: &toml::Table) -> Result<Self> {
        OssConf::parse(section)
    }

    pub fn from_json(entry: &serde_json::Map<String, JsonValue>) -> Result<Self> {
        OssConf::parse(entry)
    }

    fn parse(p: &dyn Params) -> Result<Self> {
        let endpoint = match p.text("endpoint")? {
            Some(endpoint) if !endpoint.is_empty() => endpoint,
            _ => format!("oss-cn-{}-internal.aliyuncs.com", p.required("region")?),
        };

        Ok(OssConf {
            key_id: p.required("key_id")?,
            key: p.required("key")?,
            bucket: p.required("bucket")?,
            endpoint,
        })
    }

    /// OSS speaks the S3 protocol, virtual hosted over https.
    pub fn as_s3(&self) -> S3Conf {
        S3Conf {
            key_id: self.key_id.clone(),
            key: self.key.clone(),
            bucket: self.bucket.clone(),
            host: Some(self.endpoint.clone()),
            port: None,
            use_v4_signature: false,
            aws_region: None,
            use_https: true,
            path_style_request: false,
        }
    }
}

/// Every backend kind a store can be configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConf {
    Fs(FsConf),
    S3(S3Conf),
    Swift(SwiftConf),
    Ceph(CephConf),
    Oss(OssConf),
}

impl BackendConf {
    /// Single-backend mode: the kind comes from `name`, defaulting to `fs`.
    pub fn from_config(section: &toml::Table, storage_dir: &Path, typ: ObjType) -> Result<Self> {
        let name = section.text("name")?.unwrap_or_else(|| "fs".to_string());
        match name.as_str() {
            "fs" => FsConf::from_config(section, storage_dir, typ).map(BackendConf::Fs),
            _ => BackendConf::parse_remote(&name, section, typ),
        }
    }

    /// Storage-class mode: the kind comes from `backend`.
    pub fn from_json(entry: &serde_json::Map<String, JsonValue>, typ: ObjType) -> Result<Self> {
        let name = entry.required("backend")?;
        match name.as_str() {
            "fs" => FsConf::from_json(entry, typ).map(BackendConf::Fs),
            _ => BackendConf::parse_remote(&name, entry, typ),
        }
    }

    fn parse_remote(name: &str, p: &dyn Params, typ: ObjType) -> Result<Self> {
        match name {
            "s3" => S3Conf::parse(p).map(BackendConf::S3),
            "swift" => SwiftConf::parse(p).map(BackendConf::Swift),
            "ceph" => CephConf::parse(p).map(BackendConf::Ceph),
            "oss" => OssConf::parse(p).map(BackendConf::Oss),
            other => Err(Error::InvalidConfig(format!(
                "unknown {} backend \"{}\"",
                typ, other
            ))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BackendConf::Fs(_) => "fs",
            BackendConf::S3(_) => "s3",
            BackendConf::Swift(_) => "swift",
            BackendConf::Ceph(_) => "ceph",
            BackendConf::Oss(_) => "oss",
        }
    }
}
