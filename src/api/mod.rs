//! HTTP surfaces of the bridge.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /` - Liveness text
//! - `POST /` - GitHub Copilot Extension (signed in production)
//! - `POST /api/messages` - Bot Framework activities from Microsoft Teams

pub mod bot_auth;
pub mod completion;
mod copilot;
mod routes;
pub mod teams;
pub mod types;
pub mod verify;

pub use routes::{app, serve, AppState};
pub use types::*;
