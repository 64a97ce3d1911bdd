//! Progress notifier - single-slot delivery of status updates

use std::sync::{Arc, Mutex, Weak};

use crate::application::ports::StatusObserver;
use crate::domain::recording::StatusUpdate;

/// Delivers each [`StatusUpdate`] to the currently registered observer.
///
/// Holds at most one observer, by weak reference, so the notifier never keeps a
/// listener alive. Registration replaces the previous observer. Updates emitted
/// while no observer is registered are dropped; nothing is buffered or replayed.
#[derive(Default)]
pub struct ProgressNotifier {
    slot: Mutex<Option<Weak<dyn StatusObserver>>>,
}

impl ProgressNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer`, replacing any previous one
    pub fn register<O>(&self, observer: &Arc<O>)
    where
        O: StatusObserver + 'static,
    {
        let weak: Weak<dyn StatusObserver> = Arc::downgrade(observer) as Weak<dyn StatusObserver>;
        *self.lock_slot() = Some(weak);
    }

    /// Remove the registered observer, if any
    pub fn unregister(&self) {
        *self.lock_slot() = None;
    }

    /// Whether a live observer is registered
    pub fn has_observer(&self) -> bool {
        self.lock_slot()
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Deliver `update` synchronously.
    ///
    /// Returns `true` if an observer received it. A registration whose observer
    /// has been dropped is cleared here.
    pub fn emit(&self, update: StatusUpdate) -> bool {
        let observer = {
            let mut slot = self.lock_slot();
            let upgraded = slot.as_ref().map(Weak::upgrade);
            match upgraded {
                Some(Some(observer)) => observer,
                Some(None) => {
                    *slot = None;
                    return false;
                }
                None => return false,
            }
        };

        // Slot lock is released so the observer may re-register from the callback.
        observer.on_status(update);
        true
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<Weak<dyn StatusObserver>>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        updates: Mutex<Vec<StatusUpdate>>,
    }

    impl RecordingObserver {
        fn received(&self) -> Vec<StatusUpdate> {
            self.updates.lock().unwrap().clone()
        }
    }

    impl StatusObserver for RecordingObserver {
        fn on_status(&self, update: StatusUpdate) {
            self.updates.lock().unwrap().push(update);
        }
    }

    #[test]
    fn emit_without_observer_is_dropped() {
        let notifier = ProgressNotifier::new();
        assert!(!notifier.emit(StatusUpdate::new(true, 1)));
        assert!(!notifier.has_observer());
    }

    #[test]
    fn delivers_in_emission_order() {
        let notifier = ProgressNotifier::new();
        let observer = Arc::new(RecordingObserver::default());
        notifier.register(&observer);

        for second in 0..3 {
            assert!(notifier.emit(StatusUpdate::new(true, second)));
        }

        let seconds: Vec<u64> = observer
            .received()
            .iter()
            .map(StatusUpdate::elapsed_seconds)
            .collect();
        assert_eq!(seconds, vec![0, 1, 2]);
    }

    #[test]
    fn registration_is_last_write_wins() {
        let notifier = ProgressNotifier::new();
        let first = Arc::new(RecordingObserver::default());
        let second = Arc::new(RecordingObserver::default());

        notifier.register(&first);
        notifier.emit(StatusUpdate::new(true, 1));
        notifier.register(&second);
        notifier.emit(StatusUpdate::new(true, 2));

        assert_eq!(first.received(), vec![StatusUpdate::new(true, 1)]);
        assert_eq!(second.received(), vec![StatusUpdate::new(true, 2)]);
    }

    #[test]
    fn late_observer_sees_no_replay() {
        let notifier = ProgressNotifier::new();
        notifier.emit(StatusUpdate::new(true, 1));

        let observer = Arc::new(RecordingObserver::default());
        notifier.register(&observer);
        notifier.emit(StatusUpdate::new(true, 2));

        assert_eq!(observer.received(), vec![StatusUpdate::new(true, 2)]);
    }

    #[test]
    fn dropped_observer_is_cleared() {
        let notifier = ProgressNotifier::new();
        let observer = Arc::new(RecordingObserver::default());
        notifier.register(&observer);
        assert!(notifier.has_observer());

        drop(observer);
        assert!(!notifier.has_observer());
        assert!(!notifier.emit(StatusUpdate::new(false, 0)));
    }

    #[test]
    fn unregister_stops_delivery() {
        let notifier = ProgressNotifier::new();
        let observer = Arc::new(RecordingObserver::default());
        notifier.register(&observer);
        notifier.unregister();

        assert!(!notifier.emit(StatusUpdate::new(true, 1)));
        assert!(observer.received().is_empty());
    }

    #[test]
    fn closures_are_observers() {
        let notifier = ProgressNotifier::new();
        let seen = Arc::new(Mutex::new(0u64));
        let sink = Arc::clone(&seen);
        let observer = Arc::new(move |update: StatusUpdate| {
            *sink.lock().unwrap() = update.elapsed_seconds();
        });
        notifier.register(&observer);

        notifier.emit(StatusUpdate::new(true, 7));
        assert_eq!(*seen.lock().unwrap(), 7);
    }
}
