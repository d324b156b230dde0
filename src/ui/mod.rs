//! View layer state. Rendering is left to the embedding application.

pub mod state;

pub use state::{ConversationViewModel, SharedViewModel, ViewEvent, VisualizationFrame};
