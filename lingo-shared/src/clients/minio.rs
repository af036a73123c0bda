use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use std::time::Duration;

/// S3-compatible object storage client. Objects are never proxied through
/// the service: clients PUT to a presigned URL and read through presigned GETs.
#[derive(Clone)]
pub struct MinioClient {
    client: S3Client,
    bucket: String,
}

impl MinioClient {
    pub async fn new(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "minio");

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = S3Client::from_conf(config);

        // Ensure bucket exists
        let _ = client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await;

        tracing::info!(endpoint = %endpoint, bucket = %bucket, "MinIO client initialized");

        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    fn presign_config(expires_secs: u64) -> Result<PresigningConfig, String> {
        PresigningConfig::builder()
            .expires_in(Duration::from_secs(expires_secs))
            .build()
            .map_err(|e| format!("presign config error: {e}"))
    }

    /// Generate a presigned URL the client can PUT the object body to
    pub async fn presigned_upload_url(&self, key: &str, expires_secs: u64) -> Result<String, String> {
        let url = self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presign_config(expires_secs)?)
            .await
            .map_err(|e| format!("presign error: {e}"))?
            .uri()
            .to_string();

        Ok(url)
    }

    /// Generate a presigned URL for downloading
    pub async fn presigned_url(&self, key: &str, expires_secs: u64) -> Result<String, String> {
        let url = self.client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presign_config(expires_secs)?)
            .await
            .map_err(|e| format!("presign error: {e}"))?
            .uri()
            .to_string();

        Ok(url)
    }

    /// Whether an object has actually been uploaded under `key`
    pub async fn exists(&self, key: &str) -> Result<bool, String> {
        match self.client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    Ok(false)
                } else {
                    Err(format!("head failed: {e}"))
                }
            }
        }
    }

    /// Delete an object
    pub async fn delete(&self, key: &str) -> Result<(), String> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| format!("delete failed: {e}"))?;

        Ok(())
    }
}
