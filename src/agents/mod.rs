//! Agent personas and task dispatch.
//!
//! An agent is a compiled-in persona backed by one vendor. The
//! [`Dispatcher`] resolves a persona, checks the caller's configuration for
//! the vendor's credentials and hands back a ready [`VendorClient`].
//!
//! [`VendorClient`]: crate::vendor::VendorClient

mod dispatch;

pub use dispatch::{AgentStatus, DispatchError, Dispatcher};
#[cfg(test)]
pub(crate) use dispatch::testing;

use crate::vendor::VendorKind;
use serde::Serialize;

/// Static description of one agent persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub vendor: VendorKind,
    pub capabilities: &'static [&'static str],
}

const AGENTS: &[AgentDescriptor] = &[
    AgentDescriptor {
        id: "swe-agent",
        name: "Software Engineering Agent",
        description: "Handles code reviews, bug fixes, and development tasks using Devin",
        vendor: VendorKind::Devin,
        capabilities: &["code-review", "bug-fixing", "feature-development", "testing"],
    },
    AgentDescriptor {
        id: "sre-agent",
        name: "Site Reliability Engineering Agent",
        description: "Manages infrastructure, monitoring, and deployment tasks using Codex",
        vendor: VendorKind::Codex,
        capabilities: &["infrastructure", "monitoring", "deployment", "incident-response"],
    },
    AgentDescriptor {
        id: "qa-agent",
        name: "Quality Assurance Agent",
        description: "Performs testing, validation, and quality checks using GitHub Copilot",
        vendor: VendorKind::Copilot,
        capabilities: &[
            "automated-testing",
            "manual-testing",
            "quality-assurance",
            "validation",
        ],
    },
    AgentDescriptor {
        id: "devops-agent",
        name: "DevOps Agent",
        description: "Handles CI/CD pipelines, automation, and tooling using Codex",
        vendor: VendorKind::Codex,
        capabilities: &["ci-cd", "automation", "tooling", "pipeline-management"],
    },
];

/// Lookup table of the compiled-in agents.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentRegistry;

impl AgentRegistry {
    pub fn list_agents(&self) -> &'static [AgentDescriptor] {
        AGENTS
    }

    pub fn resolve(&self, id: &str) -> Option<&'static AgentDescriptor> {
        let id = id.trim();
        AGENTS.iter().find(|agent| agent.id == id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        AGENTS.iter().map(|agent| agent.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_four_agents() {
        let registry = AgentRegistry;
        assert_eq!(
            registry.ids(),
            vec!["swe-agent", "sre-agent", "qa-agent", "devops-agent"]
        );
    }

    #[test]
    fn resolve_maps_vendor() {
        let registry = AgentRegistry;
        assert_eq!(registry.resolve("swe-agent").unwrap().vendor, VendorKind::Devin);
        assert_eq!(registry.resolve("qa-agent").unwrap().vendor, VendorKind::Copilot);
        assert_eq!(registry.resolve(" devops-agent ").unwrap().vendor, VendorKind::Codex);
        assert!(registry.resolve("replit-agent").is_none());
    }
}
