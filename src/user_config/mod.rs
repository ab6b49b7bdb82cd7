//! Per-user configuration storage.
//!
//! Each chat user owns a small record of vendor credentials. Records are
//! created lazily on the first write and merged field by field afterwards.

mod file;
mod memory;

pub use file::FileUserConfigStore;
pub use memory::InMemoryUserConfigStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Credentials and repository settings for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devin_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_openai_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_openai_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repo: Option<String>,
}

/// One settable field of [`UserConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigField {
    #[serde(rename = "devin-key")]
    DevinKey,
    #[serde(rename = "github-token")]
    GithubToken,
    #[serde(rename = "azure-key")]
    AzureKey,
    #[serde(rename = "azure-endpoint")]
    AzureEndpoint,
    #[serde(rename = "github-repo")]
    GithubRepo,
}

impl ConfigField {
    pub const ALL: [ConfigField; 5] = [
        ConfigField::DevinKey,
        ConfigField::GithubToken,
        ConfigField::AzureKey,
        ConfigField::AzureEndpoint,
        ConfigField::GithubRepo,
    ];

    /// Name used by `/config set-<option>` and the `configureAgent` function.
    pub fn option_name(self) -> &'static str {
        match self {
            ConfigField::DevinKey => "devin-key",
            ConfigField::GithubToken => "github-token",
            ConfigField::AzureKey => "azure-key",
            ConfigField::AzureEndpoint => "azure-endpoint",
            ConfigField::GithubRepo => "github-repo",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfigField::DevinKey => "Devin API Key",
            ConfigField::GithubToken => "GitHub Token",
            ConfigField::AzureKey => "Azure OpenAI API Key",
            ConfigField::AzureEndpoint => "Azure OpenAI Endpoint",
            ConfigField::GithubRepo => "GitHub Repository",
        }
    }

    pub fn from_option(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.option_name() == name)
    }

    /// Secrets are masked whenever they are echoed back.
    pub fn is_secret(self) -> bool {
        !matches!(self, ConfigField::AzureEndpoint | ConfigField::GithubRepo)
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.option_name())
    }
}

/// Partial update for a [`UserConfig`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    pub devin_api_key: Option<String>,
    pub github_token: Option<String>,
    pub azure_openai_api_key: Option<String>,
    pub azure_openai_endpoint: Option<String>,
    pub github_repo: Option<String>,
}

impl ConfigPatch {
    pub fn single(field: ConfigField, value: impl Into<String>) -> Self {
        let mut patch = Self::default();
        patch.set(field, value);
        patch
    }

    pub fn set(&mut self, field: ConfigField, value: impl Into<String>) {
        let slot = match field {
            ConfigField::DevinKey => &mut self.devin_api_key,
            ConfigField::GithubToken => &mut self.github_token,
            ConfigField::AzureKey => &mut self.azure_openai_api_key,
            ConfigField::AzureEndpoint => &mut self.azure_openai_endpoint,
            ConfigField::GithubRepo => &mut self.github_repo,
        };
        *slot = Some(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Fields this patch would write.
    pub fn fields(&self) -> Vec<ConfigField> {
        ConfigField::ALL
            .into_iter()
            .filter(|f| match f {
                ConfigField::DevinKey => self.devin_api_key.is_some(),
                ConfigField::GithubToken => self.github_token.is_some(),
                ConfigField::AzureKey => self.azure_openai_api_key.is_some(),
                ConfigField::AzureEndpoint => self.azure_openai_endpoint.is_some(),
                ConfigField::GithubRepo => self.github_repo.is_some(),
            })
            .collect()
    }
}

impl UserConfig {
    pub fn get(&self, field: ConfigField) -> Option<&str> {
        let value = match field {
            ConfigField::DevinKey => &self.devin_api_key,
            ConfigField::GithubToken => &self.github_token,
            ConfigField::AzureKey => &self.azure_openai_api_key,
            ConfigField::AzureEndpoint => &self.azure_openai_endpoint,
            ConfigField::GithubRepo => &self.github_repo,
        };
        crate::util::non_empty(value.as_deref())
    }

    pub fn has(&self, field: ConfigField) -> bool {
        self.get(field).is_some()
    }

    /// Field-level overwrite; fields absent from the patch are kept.
    pub fn apply(&mut self, patch: ConfigPatch) {
        let ConfigPatch {
            devin_api_key,
            github_token,
            azure_openai_api_key,
            azure_openai_endpoint,
            github_repo,
        } = patch;
        if devin_api_key.is_some() {
            self.devin_api_key = devin_api_key;
        }
        if github_token.is_some() {
            self.github_token = github_token;
        }
        if azure_openai_api_key.is_some() {
            self.azure_openai_api_key = azure_openai_api_key;
        }
        if azure_openai_endpoint.is_some() {
            self.azure_openai_endpoint = azure_openai_endpoint;
        }
        if github_repo.is_some() {
            self.github_repo = github_repo;
        }
    }

    /// Value suitable for display: secrets masked, plain fields verbatim.
    pub fn display_value(&self, field: ConfigField) -> Option<String> {
        self.get(field).map(|v| {
            if field.is_secret() {
                crate::util::mask_secret(v)
            } else {
                v.to_string()
            }
        })
    }
}

/// Key-value store of user configuration, keyed by opaque user id.
#[async_trait]
pub trait UserConfigStore: Send + Sync {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserConfig>, String>;

    /// Merge `patch` into the user's record, creating it when absent.
    async fn set(&self, user_id: &str, patch: ConfigPatch) -> Result<UserConfig, String>;

    /// Returns whether a record existed.
    async fn delete(&self, user_id: &str) -> Result<bool, String>;
}

/// Build the store selected by `USER_CONFIG_PATH`.
pub async fn create_user_config_store(
    path: Option<PathBuf>,
) -> Result<Arc<dyn UserConfigStore>, String> {
    match path {
        Some(path) => {
            let store = FileUserConfigStore::new(path).await?;
            tracing::info!("User configuration persisted to {}", store.path().display());
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("User configuration kept in memory");
            Ok(Arc::new(InMemoryUserConfigStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_names_round_trip() {
        for field in ConfigField::ALL {
            assert_eq!(ConfigField::from_option(field.option_name()), Some(field));
        }
        assert_eq!(ConfigField::from_option("DEVIN-KEY"), Some(ConfigField::DevinKey));
        assert_eq!(ConfigField::from_option("replit-key"), None);
    }

    #[test]
    fn apply_overwrites_only_present_fields() {
        let mut config = UserConfig::default();
        config.apply(ConfigPatch::single(ConfigField::DevinKey, "dk-1"));
        config.apply(ConfigPatch::single(ConfigField::GithubRepo, "octo/demo"));
        assert_eq!(config.get(ConfigField::DevinKey), Some("dk-1"));
        assert_eq!(config.get(ConfigField::GithubRepo), Some("octo/demo"));

        config.apply(ConfigPatch::single(ConfigField::DevinKey, "dk-2"));
        assert_eq!(config.get(ConfigField::DevinKey), Some("dk-2"));
        assert_eq!(config.get(ConfigField::GithubRepo), Some("octo/demo"));
    }

    #[test]
    fn display_masks_secrets() {
        let mut config = UserConfig::default();
        config.apply(ConfigPatch::single(ConfigField::GithubToken, "ghp_abcdefghijkl"));
        config.apply(ConfigPatch::single(ConfigField::GithubRepo, "octo/demo"));
        assert_eq!(
            config.display_value(ConfigField::GithubToken).as_deref(),
            Some("ghp_abcd...")
        );
        assert_eq!(
            config.display_value(ConfigField::GithubRepo).as_deref(),
            Some("octo/demo")
        );
        assert_eq!(config.display_value(ConfigField::DevinKey), None);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut config = UserConfig::default();
        config.apply(ConfigPatch::single(ConfigField::DevinKey, "   "));
        assert!(!config.has(ConfigField::DevinKey));
    }

    #[test]
    fn patch_lists_fields() {
        let mut patch = ConfigPatch::default();
        assert!(patch.is_empty());
        patch.set(ConfigField::AzureKey, "k");
        patch.set(ConfigField::GithubToken, "t");
        assert_eq!(
            patch.fields(),
            vec![ConfigField::GithubToken, ConfigField::AzureKey]
        );
    }
}
