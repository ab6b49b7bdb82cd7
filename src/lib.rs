//! # AGU Bridge
//!
//! Chat and bot bridge that hands coding tasks to hosted AI agents.
//!
//! Users talk to the bridge from Microsoft Teams (slash commands, Adaptive
//! Card actions and dialogs) or from GitHub Copilot Chat (Copilot Extension
//! functions). Each request is routed to one of four agent personas backed by
//! Devin, the GitHub Copilot coding agent or Codex running in GitHub Actions,
//! using the caller's own stored credentials.
//!
//! ## Request Flow
//!
//! ```text
//!   Teams activity ──► router ──┐
//!                               ├──► agents::Dispatcher ──► vendor client
//!   Copilot request ─► assistant┘          │
//!                                          ▼
//!                                   user_config store
//! ```
//!
//! ## Modules
//! - `api`: HTTP server, Copilot verification and streaming, Bot Framework glue
//! - `router`: slash commands, card actions and dialogs
//! - `assistant`: Copilot Extension functions and intent matching
//! - `agents`: agent registry and dispatch
//! - `vendor`: Devin, Copilot and Codex adapters
//! - `cards`: Adaptive Card builders
//! - `user_config`: per-user credential store

pub mod agents;
pub mod api;
pub mod assistant;
pub mod cards;
pub mod config;
pub mod fixtures;
pub mod router;
pub mod session;
pub mod user_config;
pub mod util;
pub mod vendor;

pub use config::Config;
