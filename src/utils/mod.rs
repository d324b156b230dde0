pub mod channels;

pub use channels::{CaptureChannels, CommandChannels, SessionChannels};
