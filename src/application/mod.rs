//! Application layer - Use cases and port interfaces
//!
//! Contains the recording session use case, its progress fan-out and
//! the trait definitions for external system interactions.

pub mod ports;
pub mod progress;
pub mod session;

// Re-export use cases
pub use progress::ProgressNotifier;
pub use session::{SessionController, SessionError};
