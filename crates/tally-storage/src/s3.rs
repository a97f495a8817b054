use crate::traits::{StorageError, StorageResult, UploadSigner};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use chrono::Utc;
use std::time::Duration;
use tally_core::models::UploadCredential;
use tally_core::StorageSettings;
use tokio::sync::OnceCell;

/// Settings with every required value present.
#[derive(Debug, Clone)]
struct ResolvedSettings {
    bucket: String,
    region: String,
    access_key_id: String,
    secret_access_key: String,
    endpoint: Option<String>,
}

fn required(value: &Option<String>, name: &str) -> StorageResult<String> {
    value
        .clone()
        .ok_or_else(|| StorageError::Config(format!("{} is not set", name)))
}

impl ResolvedSettings {
    fn resolve(settings: &StorageSettings) -> StorageResult<Self> {
        Ok(Self {
            bucket: required(&settings.bucket, "S3_BUCKET_NAME")?,
            region: required(&settings.region, "AWS_REGION")?,
            access_key_id: required(&settings.access_key_id, "AWS_ACCESS_KEY_ID")?,
            secret_access_key: required(&settings.secret_access_key, "AWS_SECRET_ACCESS_KEY")?,
            endpoint: settings.endpoint.clone(),
        })
    }
}

/// S3 presigned-URL signer
///
/// Missing settings are reported when a URL is requested, not at startup,
/// so the service can run without storage configured. The SDK client is
/// built on first use and reused afterwards.
pub struct S3UploadSigner {
    settings: StorageSettings,
    client: OnceCell<Client>,
}

impl S3UploadSigner {
    pub fn new(settings: StorageSettings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    async fn client(&self, resolved: &ResolvedSettings) -> &Client {
        self.client
            .get_or_init(|| async {
                let credentials = Credentials::new(
                    resolved.access_key_id.clone(),
                    resolved.secret_access_key.clone(),
                    None,
                    None,
                    "tally-config",
                );
                let config = aws_config::defaults(BehaviorVersion::latest())
                    .region(aws_config::Region::new(resolved.region.clone()))
                    .credentials_provider(credentials)
                    .load()
                    .await;

                let mut builder = aws_sdk_s3::config::Builder::from(&config);
                if let Some(ref endpoint) = resolved.endpoint {
                    // Path-style addressing for S3-compatible providers (MinIO, etc.)
                    builder = builder.endpoint_url(endpoint).force_path_style(true);
                }
                Client::from_conf(builder.build())
            })
            .await
    }
}

/// For AWS: `https://{bucket}.s3.{region}.amazonaws.com/{key}`.
/// With a custom endpoint: `{endpoint}/{bucket}/{key}`.
fn object_url(resolved: &ResolvedSettings, key: &str) -> String {
    match resolved.endpoint {
        Some(ref endpoint) => format!(
            "{}/{}/{}",
            endpoint.trim_end_matches('/'),
            resolved.bucket,
            key
        ),
        None => format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            resolved.bucket, resolved.region, key
        ),
    }
}

#[async_trait]
impl UploadSigner for S3UploadSigner {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &'static str,
        expires_in: Duration,
    ) -> StorageResult<UploadCredential> {
        let resolved = ResolvedSettings::resolve(&self.settings)?;
        let client = self.client(&resolved).await;

        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::Signing(e.to_string()))?;

        let issued_at = Utc::now();
        let presigned_request = client
            .put_object()
            .bucket(&resolved.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key = %key, "Failed to presign S3 PUT");
                StorageError::Signing(e.to_string())
            })?;

        let ttl = chrono::Duration::from_std(expires_in)
            .map_err(|e| StorageError::Signing(e.to_string()))?;

        tracing::debug!(
            bucket = %resolved.bucket,
            key = %key,
            expires_in_secs = expires_in.as_secs(),
            "Presigned S3 upload URL"
        );

        Ok(UploadCredential {
            object_key: key.to_string(),
            upload_url: presigned_request.uri().to_string(),
            content_type,
            expires_at: issued_at + ttl,
        })
    }

    fn public_url(&self, key: &str) -> StorageResult<String> {
        let resolved = ResolvedSettings::resolve(&self.settings)?;
        Ok(object_url(&resolved, key))
    }
}
