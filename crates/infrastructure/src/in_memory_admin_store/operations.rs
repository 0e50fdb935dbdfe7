use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use agora_application::{
    NewPlan, PlanPatch, PlanRepository, SettingEntry, SettingsRepository, StorageGateway,
};
use agora_core::{AppError, AppResult, PrincipalId};

use super::{InMemoryAdminStore, timestamp};

fn plan_code(row: &super::Row) -> Option<&str> {
    row.get("code").and_then(Value::as_str)
}

fn plan_not_found(code: &str) -> AppError {
    AppError::NotFound(format!("plan '{code}' not found"))
}

/// Matches SQL `LIKE` semantics: `%` is any run, `_` any single character.
fn like_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let mut matches = vec![false; text.len() + 1];
    matches[0] = true;

    for token in pattern {
        let mut next = vec![false; text.len() + 1];
        match token {
            '%' => {
                let mut reachable = false;
                for (index, slot) in next.iter_mut().enumerate() {
                    reachable |= matches[index];
                    *slot = reachable;
                }
            }
            _ => {
                for (index, character) in text.iter().enumerate() {
                    if matches[index] && (token == '_' || token == *character) {
                        next[index + 1] = true;
                    }
                }
            }
        }
        matches = next;
    }

    matches[text.len()]
}

#[async_trait]
impl PlanRepository for InMemoryAdminStore {
    async fn list_plans(&self) -> AppResult<Vec<Value>> {
        Ok(self
            .state
            .read()
            .await
            .plans
            .iter()
            .cloned()
            .map(Value::Object)
            .collect())
    }

    async fn snapshot_plan(&self, code: &str) -> AppResult<Option<Value>> {
        Ok(self
            .state
            .read()
            .await
            .plans
            .iter()
            .find(|plan| plan_code(plan) == Some(code))
            .cloned()
            .map(Value::Object))
    }

    async fn create_plan(&self, plan: NewPlan) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state
            .plans
            .iter()
            .any(|existing| plan_code(existing) == Some(plan.code.as_str()))
        {
            return Err(AppError::Store(format!(
                "failed to create plan: plan '{}' already exists",
                plan.code
            )));
        }

        let now = timestamp(Utc::now());
        let Value::Object(row) = json!({
            "code": plan.code.as_str(),
            "name": plan.name.as_str(),
            "description": plan.description,
            "limits": plan.limits,
            "features": plan.features,
            "is_active": plan.is_active,
            "created_at": now,
            "updated_at": now,
        }) else {
            return Err(AppError::Internal("plan must serialize to an object".to_owned()));
        };
        state.plans.push(row);

        Ok(())
    }

    async fn update_plan(&self, code: &str, patch: &PlanPatch) -> AppResult<()> {
        let mut state = self.state.write().await;
        let Some(plan) = state
            .plans
            .iter_mut()
            .find(|plan| plan_code(plan) == Some(code))
        else {
            return Err(plan_not_found(code));
        };

        if let Some(name) = &patch.name {
            plan.insert("name".to_owned(), json!(name));
        }
        if let Some(description) = &patch.description {
            let description = if description.is_empty() {
                Value::Null
            } else {
                json!(description)
            };
            plan.insert("description".to_owned(), description);
        }
        if let Some(limits) = &patch.limits {
            plan.insert("limits".to_owned(), limits.clone());
        }
        if let Some(features) = &patch.features {
            plan.insert("features".to_owned(), features.clone());
        }
        if let Some(is_active) = patch.is_active {
            plan.insert("is_active".to_owned(), Value::Bool(is_active));
        }
        plan.insert("updated_at".to_owned(), timestamp(Utc::now()));

        Ok(())
    }

    async fn delete_plan(&self, code: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        let before = state.plans.len();
        state.plans.retain(|plan| plan_code(plan) != Some(code));

        if state.plans.len() == before {
            return Err(plan_not_found(code));
        }

        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for InMemoryAdminStore {
    async fn find_setting(&self, key: &str) -> AppResult<Option<Value>> {
        Ok(self
            .state
            .read()
            .await
            .settings
            .get(key)
            .and_then(|row| row.get("value"))
            .cloned())
    }

    async fn list_settings(&self, pattern: &str) -> AppResult<Vec<Value>> {
        Ok(self
            .state
            .read()
            .await
            .settings
            .iter()
            .filter(|(key, _)| like_matches(pattern, key))
            .map(|(_, row)| Value::Object(row.clone()))
            .collect())
    }

    async fn upsert_settings(
        &self,
        entries: &[SettingEntry],
        updated_by: PrincipalId,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        for entry in entries {
            let Value::Object(row) = json!({
                "key": entry.key.as_str(),
                "value": entry.value,
                "updated_by": updated_by,
                "updated_at": timestamp(updated_at),
            }) else {
                return Err(AppError::Internal(
                    "setting must serialize to an object".to_owned(),
                ));
            };
            state.settings.insert(entry.key.to_string(), row);
        }

        Ok(())
    }
}

#[async_trait]
impl StorageGateway for InMemoryAdminStore {
    async fn list_objects(&self, bucket: &str, prefix: &str, limit: u32) -> AppResult<Vec<Value>> {
        let state = self.state.read().await;
        let Some(objects) = state.storage.get(bucket) else {
            return Err(AppError::Store(format!("bucket '{bucket}' not found")));
        };

        let folder = prefix.trim_matches('/');
        let folder = if folder.is_empty() {
            String::new()
        } else {
            format!("{folder}/")
        };

        let mut names: Vec<(String, bool)> = objects
            .iter()
            .filter_map(|path| path.strip_prefix(folder.as_str()))
            .map(|rest| match rest.split_once('/') {
                Some((directory, _)) => (directory.to_owned(), true),
                None => (rest.to_owned(), false),
            })
            .collect();
        names.dedup();

        Ok(names
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|(name, is_folder)| {
                if is_folder {
                    json!({ "name": name, "id": null })
                } else {
                    json!({ "name": name, "id": format!("{bucket}/{folder}{name}") })
                }
            })
            .collect())
    }

    async fn remove_objects(&self, bucket: &str, paths: &[String]) -> AppResult<()> {
        let mut state = self.state.write().await;
        let Some(objects) = state.storage.get_mut(bucket) else {
            return Err(AppError::Store(format!("bucket '{bucket}' not found")));
        };

        for path in paths {
            objects.remove(path);
        }

        Ok(())
    }
}
