use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    primitives::ByteStream,
    Client as S3Client,
};
use bytes::Bytes;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{BlobStore, KeyPage, SessionStore, StorageError, StoredObject};

const KV_LIST_LIMIT: u32 = 1000;

/// Document blobs in a Cloudflare R2 bucket, reached through the S3 API.
#[derive(Clone)]
pub struct R2BlobStore {
    client: S3Client,
    bucket: String,
}

impl R2BlobStore {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn from_credentials(
        account_id: &str,
        access_key_id: &str,
        secret_access_key: &str,
        bucket: String,
    ) -> Self {
        Self::with_endpoint(
            format!("https://{account_id}.r2.cloudflarestorage.com"),
            access_key_id,
            secret_access_key,
            bucket,
        )
    }

    /// Path-style S3 client against any R2-compatible endpoint.
    pub fn with_endpoint(
        endpoint: String,
        access_key_id: &str,
        secret_access_key: &str,
        bucket: String,
    ) -> Self {
        let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "r2");
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new("auto"))
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Self::new(S3Client::from_conf(config), bucket)
    }
}

#[async_trait]
impl BlobStore for R2BlobStore {
    #[instrument(skip(self, body), level = "debug", fields(size = body.len()))]
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| StorageError::Io(format!("R2 put_object error: {err}")))?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(StorageError::Io(format!(
                    "R2 get_object error: {service_error}"
                )));
            }
        };

        let content_type = output.content_type.clone();
        let content_length = output.content_length;
        let body = output
            .body
            .collect()
            .await
            .map_err(|err| StorageError::Io(format!("failed to read R2 object body: {err}")))?
            .into_bytes();
        let size = content_length
            .and_then(|length| u64::try_from(length).ok())
            .unwrap_or(body.len() as u64);

        Ok(Some(StoredObject {
            body,
            content_type,
            size,
        }))
    }
}

/// Session records in a Workers KV namespace, reached through the
/// Cloudflare v4 REST API.
pub struct KvSessionStore {
    http_client: HttpClient,
    base_url: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct KvListResponse {
    #[serde(default)]
    result: Vec<KvKey>,
    #[serde(default)]
    result_info: Option<KvResultInfo>,
}

#[derive(Debug, Deserialize)]
struct KvKey {
    name: String,
}

#[derive(Debug, Deserialize)]
struct KvResultInfo {
    #[serde(default)]
    cursor: Option<String>,
}

/// KV reports the last page with an empty or absent cursor.
impl From<KvListResponse> for KeyPage {
    fn from(listing: KvListResponse) -> Self {
        Self {
            keys: listing.result.into_iter().map(|key| key.name).collect(),
            cursor: listing
                .result_info
                .and_then(|info| info.cursor)
                .filter(|cursor| !cursor.is_empty()),
        }
    }
}

impl KvSessionStore {
    pub fn new(account_id: String, namespace_id: String, api_token: String) -> Self {
        Self::with_base_url(
            format!(
                "https://api.cloudflare.com/client/v4/accounts/{account_id}/storage/kv/namespaces/{namespace_id}"
            ),
            api_token,
        )
    }

    /// `base_url` is the namespace URL, without a trailing slash.
    pub fn with_base_url(base_url: String, api_token: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url,
            api_token,
        }
    }

    fn value_url(&self, key: &str) -> String {
        format!("{}/values/{}", self.base_url, urlencoding::encode(key))
    }

    async fn failure(operation: &str, response: reqwest::Response) -> StorageError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        StorageError::Io(format!("KV {operation} failed with status {status}: {text}"))
    }
}

#[async_trait]
impl SessionStore for KvSessionStore {
    #[instrument(skip(self), level = "debug")]
    async fn list(&self, cursor: Option<&str>) -> Result<KeyPage, StorageError> {
        let mut query = vec![("limit", KV_LIST_LIMIT.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }

        let response = self
            .http_client
            .get(format!("{}/keys", self.base_url))
            .bearer_auth(&self.api_token)
            .query(&query)
            .send()
            .await
            .map_err(|err| StorageError::Io(format!("KV LIST request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(Self::failure("LIST", response).await);
        }

        let page: KeyPage = response
            .json::<KvListResponse>()
            .await
            .map_err(|err| StorageError::Serialization(format!("invalid KV listing: {err}")))?
            .into();

        debug!(count = page.keys.len(), has_more = page.cursor.is_some(), "KV LIST page");
        Ok(page)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let response = self
            .http_client
            .get(self.value_url(key))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|err| StorageError::Io(format!("KV GET request failed: {err}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::failure("GET", response).await);
        }

        let value = response
            .text()
            .await
            .map_err(|err| StorageError::Io(format!("failed to read KV response: {err}")))?;
        Ok(Some(value))
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let response = self
            .http_client
            .put(self.value_url(key))
            .bearer_auth(&self.api_token)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(value.to_string())
            .send()
            .await
            .map_err(|err| StorageError::Io(format!("KV PUT request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(Self::failure("PUT", response).await);
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let response = self
            .http_client
            .delete(self.value_url(key))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|err| StorageError::Io(format!("KV DELETE request failed: {err}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(Self::failure("DELETE", response).await);
        }
        Ok(())
    }
}
