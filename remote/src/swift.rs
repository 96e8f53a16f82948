use std::sync::{Mutex, PoisonError};

use log::{debug, info, warn};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tokio::runtime::Runtime;

use objcore::{Error, ObjectId, Result};

use crate::conf::{AuthVersion, SwiftConf};
use crate::Remote;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Session {
    token: String,
    storage_url: String,
}

/// OpenStack Swift container, objects keyed `<repo_id>/<obj_id>`.
///
/// The auth token is fetched lazily and refreshed once when a request comes
/// back unauthorized.
pub struct SwiftRemote {
    conf: SwiftConf,
    client: Client,
    rt: Runtime,
    session: Mutex<Option<Session>>,
}

impl SwiftRemote {
    pub fn new(conf: &SwiftConf) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::backend("building swift http client", e))?;
        SwiftRemote::with_client(conf, client)
    }

    fn with_client(conf: &SwiftConf, client: Client) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::backend("starting swift runtime", e))?;

        info!(
            "swift backend: container {} via {} ({})",
            conf.container,
            conf.auth_host,
            conf.auth_ver
        );

        Ok(SwiftRemote {
            conf: conf.clone(),
            client,
            rt,
            session: Mutex::new(None),
        })
    }

    fn session(&self, refresh: bool) -> Result<Session> {
        let mut cached = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if let (false, Some(session)) = (refresh, cached.as_ref()) {
            return Ok(session.clone());
        }

        let session = self.rt.block_on(authenticate(&self.client, &self.conf))?;
        *cached = Some(session.clone());
        Ok(session)
    }

    async fn get(&self, session: &Session, path: &str) -> Result<Response> {
        let url = format!("{}/{}/{}", session.storage_url.trim_end_matches('/'), self.conf.container, path);
        self.client
            .get(&url)
            .header("X-Auth-Token", &session.token)
            .send()
            .await
            .map_err(|e| Error::backend(format!("swift get {}", url), e))
    }
}

impl Remote for SwiftRemote {
    fn read(&self, repo_id: &str, _version: u32, obj_id: &ObjectId) -> Result<Vec<u8>> {
        let path = format!("{}/{}", repo_id, obj_id);
        debug!("swift read: {}/{}", self.conf.container, path);

        let mut session = self.session(false)?;
        let mut res = self.rt.block_on(self.get(&session, &path))?;

        if res.status() == StatusCode::UNAUTHORIZED {
            warn!("swift token rejected, authenticating again");
            session = self.session(true)?;
            res = self.rt.block_on(self.get(&session, &path))?;
        }

        match res.status() {
            StatusCode::NOT_FOUND => Err(Error::not_found(repo_id, obj_id)),
            status if status.is_success() => {
                let body = self
                    .rt
                    .block_on(res.bytes())
                    .map_err(|e| Error::backend(format!("swift body {}", path), e))?;
                Ok(body.to_vec())
            }
            status => Err(Error::backend(
                format!("swift get {}", path),
                format!("unexpected status {}", status),
            )),
        }
    }

    fn kind(&self) -> &'static str {
        "swift"
    }
}

async fn authenticate(client: &Client, conf: &SwiftConf) -> Result<Session> {
    let url = conf.auth_url();
    debug!("swift auth {}: {}", conf.auth_ver, url);

    let req = match conf.auth_ver {
        AuthVersion::V1 => client
            .get(&url)
            .header("X-Auth-User", &conf.user_name)
            .header("X-Auth-Key", &conf.password),
        AuthVersion::V2 => client.post(&url).json(&v2_request(conf)),
        AuthVersion::V3 => client.post(&url).json(&v3_request(conf)),
    };

    let res = req
        .send()
        .await
        .map_err(|e| Error::backend(format!("swift auth {}", url), e))?;
    if !res.status().is_success() {
        return Err(Error::backend(
            format!("swift auth {}", url),
            format!("unexpected status {}", res.status()),
        ));
    }

    let header = |name: &str| {
        res.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let session = match conf.auth_ver {
        AuthVersion::V1 => match (header("X-Auth-Token"), header("X-Storage-Url")) {
            (Some(token), Some(storage_url)) => Some(Session { token, storage_url }),
            _ => None,
        },
        AuthVersion::V2 => {
            let body: Value = res
                .json()
                .await
                .map_err(|e| Error::backend("swift auth response", e))?;
            v2_session(&body, conf.region.as_deref())
        }
        AuthVersion::V3 => {
            let token = header("X-Subject-Token");
            let body: Value = res
                .json()
                .await
                .map_err(|e| Error::backend("swift auth response", e))?;
            token.and_then(|token| v3_session(token, &body, conf.region.as_deref()))
        }
    };

    session.ok_or_else(|| {
        Error::backend(
            format!("swift auth {}", url),
            "no token or object-store endpoint in response",
        )
    })
}

fn v2_request(conf: &SwiftConf) -> Value {
    json!({
        "auth": {
            "tenantName": conf.tenant,
            "passwordCredentials": {
                "username": conf.user_name,
                "password": conf.password,
            },
        }
    })
}

fn v3_request(conf: &SwiftConf) -> Value {
    json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": conf.user_name,
                        "domain": { "name": conf.domain },
                        "password": conf.password,
                    }
                }
            },
            "scope": {
                "project": {
                    "name": conf.tenant,
                    "domain": { "name": conf.domain },
                }
            }
        }
    })
}

fn object_store<'a>(catalog: &'a Value) -> Option<&'a Vec<Value>> {
    catalog
        .as_array()?
        .iter()
        .find(|service| service["type"] == "object-store")?["endpoints"]
        .as_array()
}

fn region_matches(endpoint: &Value, region: Option<&str>) -> bool {
    match region {
        None => true,
        Some(region) => endpoint["region"] == region || endpoint["region_id"] == region,
    }
}

fn v2_session(body: &Value, region: Option<&str>) -> Option<Session> {
    let access = &body["access"];
    let token = access["token"]["id"].as_str()?.to_string();
    let storage_url = object_store(&access["serviceCatalog"])?
        .iter()
        .find(|ep| region_matches(ep, region))?["publicURL"]
        .as_str()?
        .to_string();
    Some(Session { token, storage_url })
}

fn v3_session(token: String, body: &Value, region: Option<&str>) -> Option<Session> {
    let storage_url = object_store(&body["token"]["catalog"])?
        .iter()
        .find(|ep| ep["interface"] == "public" && region_matches(ep, region))?["url"]
        .as_str()?
        .to_string();
    Some(Session { token, storage_url })
}
