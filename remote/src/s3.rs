use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use log::{debug, info};
use tokio::runtime::Runtime;

use objcore::{Error, ObjectId, Result};

use crate::conf::S3Conf;
use crate::Remote;

// Signing region when none is configured
const DEFAULT_REGION: &str = "us-east-1";

/// S3 compatible bucket, objects keyed `<repo_id>/<obj_id>`.
///
/// Owns a current thread runtime and blocks on it for every call, so it
/// must not be used from inside another tokio runtime.
pub struct S3Remote {
    client: Client,

    // Runtime for the tokio reactor
    rt: Runtime,

    bucket: String,
    kind: &'static str,
}

impl S3Remote {
    pub fn new(conf: &S3Conf, kind: &'static str) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::backend("starting s3 runtime", e))?;

        let client = rt.block_on(connect(conf));
        info!(
            "{} backend: bucket {} at {}",
            kind,
            conf.bucket,
            conf.endpoint().as_deref().unwrap_or("default endpoint")
        );

        Ok(S3Remote {
            client,
            rt,
            bucket: conf.bucket.clone(),
            kind,
        })
    }
}

impl Remote for S3Remote {
    fn read(&self, repo_id: &str, _version: u32, obj_id: &ObjectId) -> Result<Vec<u8>> {
        let key = format!("{}/{}", repo_id, obj_id);
        debug!("{} read: {}/{}", self.kind, self.bucket, key);

        self.rt.block_on(async {
            let call = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .send();

            let res = match call.await {
                Ok(res) => res,
                Err(err) => {
                    let missing = err
                        .as_service_error()
                        .map(|e| e.is_no_such_key())
                        .unwrap_or(false)
                        || err.raw_response().map(|r| r.status().as_u16()) == Some(404);

                    return Err(if missing {
                        Error::not_found(repo_id, obj_id)
                    } else {
                        Error::backend(
                            format!("{} get {}", self.kind, key),
                            DisplayErrorContext(&err).to_string(),
                        )
                    });
                }
            };

            let data = res
                .body
                .collect()
                .await
                .map_err(|e| Error::backend(format!("{} body {}", self.kind, key), e))?;
            Ok(data.into_bytes().to_vec())
        })
    }

    fn kind(&self) -> &'static str {
        self.kind
    }
}

async fn connect(conf: &S3Conf) -> Client {
    let region = conf
        .aws_region
        .clone()
        .unwrap_or_else(|| DEFAULT_REGION.to_string());
    let credentials = Credentials::new(&conf.key_id, &conf.key, None, None, "syncobj");

    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region))
        .credentials_provider(credentials)
        .load()
        .await;

    let mut s3_conf = aws_sdk_s3::config::Builder::from(&shared).force_path_style(conf.path_style_request);
    if let Some(endpoint) = conf.endpoint() {
        s3_conf = s3_conf.endpoint_url(endpoint);
    }
    Client::from_conf(s3_conf.build())
}
