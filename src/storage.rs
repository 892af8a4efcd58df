//! Object storage for product images.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SupabaseConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage api error status={status} body={body}")]
    Api { status: u16, body: String },
    #[error("file storage is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait FileStorage: Send + Sync + 'static {
    /// Stores `bytes` under `object_name` and returns its public URL.
    async fn upload(&self, object_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, StorageError>;
}

/// Supabase Storage REST client authenticated with the service-role key.
#[derive(Clone)]
pub struct SupabaseStorage {
    http: reqwest::Client,
    base_url: Option<String>,
    service_key: Option<String>,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.url.clone(),
            service_key: config.service_role_key.clone(),
            bucket: config.storage_bucket.clone(),
        }
    }

    pub fn public_url(base_url: &str, bucket: &str, object_name: &str) -> String {
        format!("{base_url}/storage/v1/object/public/{bucket}/{object_name}")
    }
}

#[async_trait]
impl FileStorage for SupabaseStorage {
    #[tracing::instrument(skip(self, bytes), fields(bucket = %self.bucket, size = bytes.len()))]
    async fn upload(&self, object_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let (Some(base), Some(key)) = (self.base_url.as_deref(), self.service_key.as_deref()) else {
            return Err(StorageError::NotConfigured);
        };

        let resp = self
            .http
            .post(format!("{base}/storage/v1/object/{}/{object_name}", self.bucket))
            .bearer_auth(key)
            .header("apikey", key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("cache-control", "3600")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Api { status: status.as_u16(), body });
        }
        tracing::info!("product image uploaded");
        Ok(Self::public_url(base, &self.bucket, object_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url() {
        assert_eq!(
            SupabaseStorage::public_url("https://xyz.supabase.co", "product_images", "1700000000000-ring.png"),
            "https://xyz.supabase.co/storage/v1/object/public/product_images/1700000000000-ring.png"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_upload_fails_fast() {
        let storage = SupabaseStorage::new(&SupabaseConfig {
            url: None, anon_key: None, service_role_key: None, jwt_secret: None, storage_bucket: "product_images".into(),
        });
        let res = storage.upload("a.png", "image/png", vec![1, 2, 3]).await;
        assert!(matches!(res, Err(StorageError::NotConfigured)));
    }
}
