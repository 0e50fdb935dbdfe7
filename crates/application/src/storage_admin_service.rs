use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use agora_core::{AppError, AppResult, NonEmptyString};
use agora_domain::{AdminRole, AuditAction, TargetType};

use crate::{
    ActionContext, ActionHandler, ActionPolicy, AdminAction, AuditRecord, AuditRecorder,
    StorageGateway, ok_payload,
};

/// Objects listed per `list-bucket` call.
pub const STORAGE_LIST_LIMIT: u32 = 200;

/// Storage bucket actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum StorageAction {
    /// List objects under a prefix.
    ListBucket {
        /// Bucket name.
        #[serde(default)]
        bucket: String,
        /// Prefix, root when absent.
        #[serde(default)]
        path: Option<String>,
    },
    /// Remove one object.
    DeleteFile {
        /// Bucket name.
        #[serde(default)]
        bucket: String,
        /// Object path.
        #[serde(default)]
        path: String,
    },
    /// Remove several objects in one call.
    DeleteFiles {
        /// Bucket name.
        #[serde(default)]
        bucket: String,
        /// Object paths.
        #[serde(default)]
        paths: Vec<String>,
    },
    /// Unrecognized tag.
    #[serde(other)]
    Unknown,
}

const STORAGE_POLICIES: &[ActionPolicy] = &[
    ActionPolicy::new("list-bucket", AdminRole::SuperAdmin, TargetType::Storage),
    ActionPolicy::new("delete-file", AdminRole::SuperAdmin, TargetType::Storage),
    ActionPolicy::new("delete-files", AdminRole::SuperAdmin, TargetType::Storage),
];

impl AdminAction for StorageAction {
    fn policy(tag: &str) -> Option<ActionPolicy> {
        STORAGE_POLICIES.iter().find(|policy| policy.name == tag).copied()
    }
}

/// Application service for storage buckets.
#[derive(Clone)]
pub struct StorageAdminService {
    storage: Arc<dyn StorageGateway>,
    audit: AuditRecorder,
}

impl StorageAdminService {
    /// Creates the service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageGateway>, audit: AuditRecorder) -> Self {
        Self { storage, audit }
    }

    async fn delete_file(
        &self,
        context: &ActionContext,
        bucket: String,
        path: String,
    ) -> AppResult<Value> {
        let bucket = NonEmptyString::required("bucket", bucket)?;
        let path = NonEmptyString::required("path", path)?;

        self.storage
            .remove_objects(bucket.as_str(), &[path.to_string()])
            .await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::DeleteFile, TargetType::Storage)
                    .target_id(format!("{bucket}/{path}")),
            )
            .await?;

        Ok(ok_payload())
    }

    async fn delete_files(
        &self,
        context: &ActionContext,
        bucket: String,
        paths: Vec<String>,
    ) -> AppResult<Value> {
        let bucket = NonEmptyString::required("bucket", bucket)?;
        let paths: Vec<String> = paths
            .into_iter()
            .map(|path| path.trim().to_owned())
            .filter(|path| !path.is_empty())
            .collect();
        if paths.is_empty() {
            return Err(AppError::Validation("paths is required".to_owned()));
        }

        self.storage.remove_objects(bucket.as_str(), &paths).await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::DeleteFiles, TargetType::Storage)
                    .target_id(bucket)
                    .after(json!({ "count": paths.len() })),
            )
            .await?;

        Ok(ok_payload())
    }
}

#[async_trait]
impl ActionHandler for StorageAdminService {
    const AREA: &'static str = "storage";
    type Action = StorageAction;

    async fn handle(&self, context: &ActionContext, action: StorageAction) -> AppResult<Value> {
        match action {
            StorageAction::ListBucket { bucket, path } => {
                let bucket = NonEmptyString::required("bucket", bucket)?;
                let prefix = path.unwrap_or_default();
                Ok(Value::from(
                    self.storage
                        .list_objects(bucket.as_str(), prefix.trim(), STORAGE_LIST_LIMIT)
                        .await?,
                ))
            }
            StorageAction::DeleteFile { bucket, path } => {
                self.delete_file(context, bucket, path).await
            }
            StorageAction::DeleteFiles { bucket, paths } => {
                self.delete_files(context, bucket, paths).await
            }
            StorageAction::Unknown => Err(AppError::Validation("unknown action".to_owned())),
        }
    }
}
