//! Integration layer
//!
//! Wires the realtime client, the audio devices and the view model together.

pub mod config;
pub mod credentials;
pub mod orchestrator;
pub mod session;

pub use config::ConsoleConfig;
pub use credentials::{resolve_api_key, CredentialStore, API_KEY_ENV};
pub use orchestrator::{OrchestratorHandle, SessionCommand, SessionOrchestrator};
pub use session::{SessionState, TurnMode, TurnState};
