use async_trait::async_trait;
use serde_json::{Value, json};

use agora_application::StorageGateway;
use agora_core::{AppError, AppResult};

/// Object storage adapter speaking the platform's `/storage/v1` HTTP API.
#[derive(Clone)]
pub struct HttpStorageGateway {
    http_client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HttpStorageGateway {
    /// Creates a gateway for `base_url` authenticated with the service credential.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            service_key: service_key.into(),
        }
    }

    /// Builds `/storage/v1/object[/operation]/{bucket}` with the bucket as one encoded segment.
    fn bucket_url(&self, operation: Option<&str>, bucket: &str) -> AppResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(self.base_url.as_str()).map_err(|error| {
            AppError::Store(format!("invalid storage base url '{}': {error}", self.base_url))
        })?;

        {
            let Ok(mut segments) = url.path_segments_mut() else {
                return Err(AppError::Store(format!(
                    "storage base url '{}' cannot carry a path",
                    self.base_url
                )));
            };
            segments.pop_if_empty().extend(["storage", "v1", "object"]);
            if let Some(operation) = operation {
                segments.push(operation);
            }
            segments.push(bucket);
        }

        Ok(url)
    }
}

#[async_trait]
impl StorageGateway for HttpStorageGateway {
    async fn list_objects(&self, bucket: &str, prefix: &str, limit: u32) -> AppResult<Vec<Value>> {
        let response = self
            .http_client
            .post(self.bucket_url(Some("list"), bucket)?)
            .bearer_auth(self.service_key.as_str())
            .header("apikey", self.service_key.as_str())
            .json(&json!({
                "prefix": prefix,
                "limit": limit,
                "offset": 0,
                "sortBy": { "column": "name", "order": "asc" },
            }))
            .send()
            .await
            .map_err(|error| AppError::Store(format!("storage request failed: {error}")))?
            .error_for_status()
            .map_err(|error| {
                AppError::Store(format!("failed to list bucket '{bucket}': {error}"))
            })?;

        response.json::<Vec<Value>>().await.map_err(|error| {
            AppError::Store(format!("storage returned an invalid listing: {error}"))
        })
    }

    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> AppResult<()> {
        self.http_client
            .delete(self.bucket_url(None, bucket)?)
            .bearer_auth(self.service_key.as_str())
            .header("apikey", self.service_key.as_str())
            .json(&json!({ "prefixes": paths }))
            .send()
            .await
            .map_err(|error| AppError::Store(format!("storage request failed: {error}")))?
            .error_for_status()
            .map_err(|error| {
                AppError::Store(format!("failed to remove objects from '{bucket}': {error}"))
            })?;

        tracing::info!(bucket, count = paths.len(), "storage objects removed");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::HttpStorageGateway;

    fn gateway(base_url: &str) -> HttpStorageGateway {
        HttpStorageGateway::new(reqwest::Client::new(), base_url, "service-key")
    }

    #[test]
    fn bucket_is_encoded_as_a_single_segment() {
        let Ok(url) = gateway("https://storage.agora.test/").bucket_url(Some("list"), "a/../b?x")
        else {
            panic!("url should build");
        };
        assert_eq!(
            url.as_str(),
            "https://storage.agora.test/storage/v1/object/list/a%2F..%2Fb%3Fx"
        );
        assert!(url.query().is_none());
    }

    #[test]
    fn base_path_is_kept() {
        let Ok(url) = gateway("https://api.agora.test/edge").bucket_url(None, "media") else {
            panic!("url should build");
        };
        assert_eq!(url.as_str(), "https://api.agora.test/edge/storage/v1/object/media");
    }

    #[test]
    fn unparseable_base_url_is_a_store_error() {
        let result = gateway("not a url").bucket_url(None, "media");
        assert!(matches!(result, Err(agora_core::AppError::Store(_))));
    }
}
