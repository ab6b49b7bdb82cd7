use super::{AgentDescriptor, AgentRegistry};
use crate::user_config::{ConfigField, ConfigPatch, UserConfig, UserConfigStore};
use crate::vendor::{
    ClientFactory, Credentials, TaskHandle, TaskRequest, VendorClient, VendorError, VendorKind,
};
use std::sync::Arc;
use thiserror::Error;

fn field_labels(fields: &[ConfigField]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// User-facing failures of a dispatch. None of these abort the process.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Agent with ID \"{0}\" not found")]
    AgentNotFound(String),

    #[error("{} is not configured. Missing: {}", .vendor.display_name(), field_labels(.missing))]
    MissingConfiguration {
        vendor: VendorKind,
        missing: Vec<ConfigField>,
    },

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Vendor(#[from] VendorError),

    #[error("Configuration store error: {0}")]
    Store(String),
}

/// Configuration state of one agent for one user.
#[derive(Debug, Clone)]
pub struct AgentStatus {
    pub agent: &'static AgentDescriptor,
    /// Whether the user has any configuration record at all
    pub has_config: bool,
    pub missing: Vec<ConfigField>,
}

impl AgentStatus {
    pub fn is_ready(&self) -> bool {
        self.has_config && self.missing.is_empty()
    }
}

/// Resolves agents and user credentials into vendor clients.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn UserConfigStore>,
    registry: AgentRegistry,
    factory: Arc<dyn ClientFactory>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn UserConfigStore>, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            store,
            registry: AgentRegistry,
            factory,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// The user's configuration, if any was ever written.
    pub async fn config(&self, user_id: &str) -> Result<Option<UserConfig>, DispatchError> {
        self.store.get(user_id).await.map_err(DispatchError::Store)
    }

    pub async fn update_config(
        &self,
        user_id: &str,
        patch: ConfigPatch,
    ) -> Result<UserConfig, DispatchError> {
        let fields = patch.fields();
        let updated = self
            .store
            .set(user_id, patch)
            .await
            .map_err(DispatchError::Store)?;
        tracing::info!(user_id, ?fields, "Updated user configuration");
        Ok(updated)
    }

    /// Build a client for `vendor`, failing before any network call when a
    /// required credential is missing.
    pub async fn client_for(
        &self,
        user_id: &str,
        vendor: VendorKind,
    ) -> Result<Arc<dyn VendorClient>, DispatchError> {
        let config = self.config(user_id).await?.unwrap_or_default();
        let credentials = Credentials::resolve(vendor, &config)
            .map_err(|missing| DispatchError::MissingConfiguration { vendor, missing })?;
        Ok(self.factory.build(credentials))
    }

    pub fn resolve(&self, agent_id: &str) -> Result<&'static AgentDescriptor, DispatchError> {
        self.registry
            .resolve(agent_id)
            .ok_or_else(|| DispatchError::AgentNotFound(agent_id.trim().to_string()))
    }

    /// Create a task on the vendor behind `agent_id`.
    pub async fn assign(
        &self,
        agent_id: &str,
        user_id: &str,
        task: &str,
    ) -> Result<(&'static AgentDescriptor, TaskHandle), DispatchError> {
        let task = task.trim();
        if task.is_empty() {
            return Err(DispatchError::InvalidInput(
                "Please provide a task description.".to_string(),
            ));
        }
        let agent = self.resolve(agent_id)?;
        let client = self.client_for(user_id, agent.vendor).await?;
        let handle = client.create_task(&TaskRequest::new(task)).await?;
        tracing::info!(agent = agent.id, task_id = %handle.id, "Assigned task");
        Ok((agent, handle))
    }

    pub async fn agent_status(
        &self,
        agent_id: &str,
        user_id: &str,
    ) -> Result<AgentStatus, DispatchError> {
        let agent = self.resolve(agent_id)?;
        let config = self.config(user_id).await?;
        let missing = match &config {
            Some(config) => Credentials::resolve(agent.vendor, config).err().unwrap_or_default(),
            None => agent.vendor.required_fields().to_vec(),
        };
        Ok(AgentStatus {
            agent,
            has_config: config.is_some(),
            missing,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fakes shared by the router, assistant and API tests.

    use super::*;
    use crate::session::SessionData;
    use crate::vendor::{WorkflowRequest, WorkflowRun};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Create(String),
        Status(String),
        Message(String, String),
        Workflow(String),
    }

    /// Fake vendor: records calls, answers from canned values.
    pub struct FakeClient {
        kind: VendorKind,
        calls: Arc<Mutex<Vec<Call>>>,
        status: Option<SessionData>,
        fail: bool,
    }

    #[async_trait]
    impl VendorClient for FakeClient {
        fn kind(&self) -> VendorKind {
            self.kind
        }

        async fn create_task(&self, request: &TaskRequest) -> Result<TaskHandle, VendorError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Create(request.description.clone()));
            if self.fail {
                return Err(VendorError::request(
                    "Failed to create Devin session. Please check your API key.",
                    anyhow::anyhow!("401 Unauthorized"),
                ));
            }
            Ok(TaskHandle {
                id: "s-1".to_string(),
                status: "running".to_string(),
                url: Some("https://app.devin.ai/sessions/s-1".to_string()),
            })
        }

        async fn get_status(&self, task_id: &str) -> Result<SessionData, VendorError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Status(task_id.to_string()));
            Ok(self.status.clone().unwrap_or(SessionData {
                id: Some(task_id.to_string()),
                status: Some("running".to_string()),
                task: Some("write a hello world".to_string()),
                created_at: Some("2024-01-01T00:00:00Z".to_string()),
                ..Default::default()
            }))
        }

        async fn send_message(&self, task_id: &str, message: &str) -> Result<(), VendorError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Message(task_id.to_string(), message.to_string()));
            Ok(())
        }

        async fn dispatch_workflow(
            &self,
            request: &WorkflowRequest,
        ) -> Result<WorkflowRun, VendorError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Workflow(request.task.clone()));
            Ok(WorkflowRun {
                run_id: "run-1".to_string(),
                status: "triggered".to_string(),
            })
        }
    }

    /// Factory that records the credentials it was handed.
    #[derive(Default)]
    pub struct RecordingFactory {
        pub built: Mutex<Vec<Credentials>>,
        pub calls: Arc<Mutex<Vec<Call>>>,
        pub status: Option<SessionData>,
        pub fail: bool,
    }

    impl RecordingFactory {
        pub fn built(&self) -> Vec<Credentials> {
            self.built.lock().unwrap().clone()
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ClientFactory for RecordingFactory {
        fn build(&self, credentials: Credentials) -> Arc<dyn VendorClient> {
            let kind = credentials.kind();
            self.built.lock().unwrap().push(credentials);
            Arc::new(FakeClient {
                kind,
                calls: self.calls.clone(),
                status: self.status.clone(),
                fail: self.fail,
            })
        }
    }
}
