//! JSON file-based user configuration store.

use super::{ConfigPatch, UserConfig, UserConfigStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Serialize, Deserialize, Default)]
struct UserConfigSnapshot {
    users: HashMap<String, UserConfig>,
}

#[derive(Clone)]
pub struct FileUserConfigStore {
    path: PathBuf,
    configs: Arc<RwLock<HashMap<String, UserConfig>>>,
    persist_lock: Arc<Mutex<()>>,
}

impl FileUserConfigStore {
    pub async fn new(path: PathBuf) -> Result<Self, String> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create user config dir: {}", e))?;
        }
        let snapshot = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<UserConfigSnapshot>(&bytes) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!("Failed to parse user config store {}: {}", path.display(), e);
                    UserConfigSnapshot::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                UserConfigSnapshot::default()
            }
            Err(err) => {
                tracing::warn!("Failed to read user config store {}: {}", path.display(), err);
                UserConfigSnapshot::default()
            }
        };

        Ok(Self {
            path,
            configs: Arc::new(RwLock::new(snapshot.users)),
            persist_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<(), String> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = UserConfigSnapshot {
            users: self.configs.read().await.clone(),
        };
        let data = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| format!("Failed to serialize user config store: {}", e))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)
            .await
            .map_err(|e| format!("Failed to write user config store: {}", e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| format!("Failed to finalize user config store: {}", e))?;
        Ok(())
    }
}

#[async_trait]
impl UserConfigStore for FileUserConfigStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserConfig>, String> {
        Ok(self.configs.read().await.get(user_id).cloned())
    }

    async fn set(&self, user_id: &str, patch: ConfigPatch) -> Result<UserConfig, String> {
        let updated = {
            let mut configs = self.configs.write().await;
            let config = configs.entry(user_id.to_string()).or_default();
            config.apply(patch);
            config.clone()
        };
        self.persist().await?;
        Ok(updated)
    }

    async fn delete(&self, user_id: &str) -> Result<bool, String> {
        let existed = self.configs.write().await.remove(user_id).is_some();
        if existed {
            self.persist().await?;
        }
        Ok(existed)
    }
}
