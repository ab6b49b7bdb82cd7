//! In-memory user configuration store (non-persistent).

use super::{ConfigPatch, UserConfig, UserConfigStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryUserConfigStore {
    configs: Arc<RwLock<HashMap<String, UserConfig>>>,
}

impl InMemoryUserConfigStore {
    pub fn new() -> Self {
        Self {
            configs: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryUserConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserConfigStore for InMemoryUserConfigStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserConfig>, String> {
        Ok(self.configs.read().await.get(user_id).cloned())
    }

    async fn set(&self, user_id: &str, patch: ConfigPatch) -> Result<UserConfig, String> {
        let mut configs = self.configs.write().await;
        let config = configs.entry(user_id.to_string()).or_default();
        config.apply(patch);
        Ok(config.clone())
    }

    async fn delete(&self, user_id: &str) -> Result<bool, String> {
        Ok(self.configs.write().await.remove(user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_config::ConfigField;

    #[tokio::test]
    async fn set_creates_lazily_and_merges() {
        let store = InMemoryUserConfigStore::new();
        assert_eq!(store.get("u1").await.unwrap(), None);

        store
            .set("u1", ConfigPatch::single(ConfigField::DevinKey, "dk"))
            .await
            .unwrap();
        store
            .set("u1", ConfigPatch::single(ConfigField::GithubToken, "gt"))
            .await
            .unwrap();

        let config = store.get("u1").await.unwrap().expect("config");
        assert_eq!(config.get(ConfigField::DevinKey), Some("dk"));
        assert_eq!(config.get(ConfigField::GithubToken), Some("gt"));
        assert_eq!(store.get("u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn repeated_write_is_idempotent() {
        let store = InMemoryUserConfigStore::new();
        let first = store
            .set("u1", ConfigPatch::single(ConfigField::GithubRepo, "octo/demo"))
            .await
            .unwrap();
        let second = store
            .set("u1", ConfigPatch::single(ConfigField::GithubRepo, "octo/demo"))
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = InMemoryUserConfigStore::new();
        store
            .set("u1", ConfigPatch::single(ConfigField::AzureKey, "ak"))
            .await
            .unwrap();
        assert!(store.delete("u1").await.unwrap());
        assert!(!store.delete("u1").await.unwrap());
        assert!(!store.is_persistent());
    }
}
