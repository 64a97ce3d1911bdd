//! Status observer port

use crate::domain::recording::StatusUpdate;

/// Receiver of session progress updates.
///
/// Called synchronously from the emitting task, so implementations must not block.
pub trait StatusObserver: Send + Sync {
    fn on_status(&self, update: StatusUpdate);
}

impl<F> StatusObserver for F
where
    F: Fn(StatusUpdate) + Send + Sync,
{
    fn on_status(&self, update: StatusUpdate) {
        self(update)
    }
}
