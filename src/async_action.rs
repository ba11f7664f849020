use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Delay before a running action shows its progress indicator, so quick
/// actions finish without flashing one.
pub const DEFAULT_PROGRESS_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOptions {
    pub disable_while_running: bool,
    pub show_progress: bool,
    pub progress_delay: Duration,
}

impl Default for ActionOptions {
    fn default() -> Self {
        Self {
            disable_while_running: true,
            show_progress: true,
            progress_delay: DEFAULT_PROGRESS_DELAY,
        }
    }
}

/// What a control bound to an [`AsyncAction`] should currently display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionState {
    pub disabled: bool,
    pub show_progress: bool,
}

/// Runs in flight. The published [`ActionState`] is derived from these.
#[derive(Debug, Default)]
struct Running {
    disabling: usize,
    showing_progress: usize,
}

#[derive(Debug)]
struct Shared {
    state: watch::Sender<ActionState>,
    running: Mutex<Running>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Running> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, running: &Running) {
        let next = ActionState {
            disabled: running.disabling > 0,
            show_progress: running.showing_progress > 0,
        };
        self.state.send_if_modified(|state| {
            let changed = *state != next;
            *state = next;
            changed
        });
    }
}

/// Runs async work on behalf of a UI control (typically a button), tracking
/// whether the control is disabled and whether a progress indicator is due.
///
/// Clones drive the same control. Overlapping runs keep it disabled until
/// the last of them ends.
#[derive(Debug, Clone)]
pub struct AsyncAction {
    options: ActionOptions,
    shared: Arc<Shared>,
}

impl Default for AsyncAction {
    fn default() -> Self {
        Self::new(ActionOptions::default())
    }
}

impl AsyncAction {
    pub fn new(options: ActionOptions) -> Self {
        let (state, _) = watch::channel(ActionState::default());
        Self {
            options,
            shared: Arc::new(Shared {
                state,
                running: Mutex::new(Running::default()),
            }),
        }
    }

    pub fn options(&self) -> ActionOptions {
        self.options
    }

    pub fn state(&self) -> ActionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ActionState> {
        self.shared.state.subscribe()
    }

    /// Awaits `action`. The progress indicator is raised by a delayed task
    /// that is cancelled when the run ends, whether `action` completes,
    /// panics or this future is dropped.
    pub async fn perform<F, T>(&self, action: F) -> T
    where
        F: Future<Output = T>,
    {
        let mut run = RunGuard::start(self);
        let output = action.await;
        run.completed = true;
        output
    }
}

/// One run of an action. Dropping it undoes everything the run published.
struct RunGuard {
    shared: Arc<Shared>,
    disables: bool,
    progress: Option<JoinHandle<()>>,
    // Both flags are only touched while `shared.running` is locked.
    fired: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    completed: bool,
}

impl RunGuard {
    fn start(action: &AsyncAction) -> Self {
        let shared = Arc::clone(&action.shared);
        let disables = action.options.disable_while_running;
        if disables {
            let mut running = shared.lock();
            running.disabling += 1;
            shared.publish(&running);
        }

        let fired = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let progress = action.options.show_progress.then(|| {
            let shared = Arc::clone(&shared);
            let fired = Arc::clone(&fired);
            let finished = Arc::clone(&finished);
            let delay = action.options.progress_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let mut running = shared.lock();
                if !finished.load(Ordering::Relaxed) {
                    fired.store(true, Ordering::Relaxed);
                    running.showing_progress += 1;
                    shared.publish(&running);
                }
            })
        });

        Self {
            shared,
            disables,
            progress,
            fired,
            finished,
            completed: false,
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.progress.take() {
            handle.abort();
        }
        if !self.completed {
            debug!("Action ended before completing");
        }

        let mut running = self.shared.lock();
        self.finished.store(true, Ordering::Relaxed);
        if self.fired.load(Ordering::Relaxed) {
            running.showing_progress -= 1;
        }
        if self.disables {
            running.disabling -= 1;
        }
        self.shared.publish(&running);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_quick_action_never_shows_progress() {
        let action = AsyncAction::default();
        let mut states = action.subscribe();

        let value = action
            .perform(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                42
            })
            .await;

        assert_eq!(value, 42);
        assert_eq!(action.state(), ActionState::default());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!states.borrow_and_update().show_progress);
        assert_eq!(action.state(), ActionState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_action_shows_progress() {
        let action = AsyncAction::default();
        let observer = action.clone();

        let handle = tokio::spawn(async move {
            action
                .perform(tokio::time::sleep(Duration::from_millis(500)))
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            observer.state(),
            ActionState {
                disabled: true,
                show_progress: false
            }
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            observer.state(),
            ActionState {
                disabled: true,
                show_progress: true
            }
        );

        handle.await.unwrap();
        assert_eq!(observer.state(), ActionState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_options_disable_both() {
        let action = AsyncAction::new(ActionOptions {
            disable_while_running: false,
            show_progress: false,
            ..Default::default()
        });
        let observer = action.clone();

        let handle = tokio::spawn(async move {
            action
                .perform(tokio::time::sleep(Duration::from_millis(500)))
                .await
        });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(observer.state(), ActionState::default());
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_action_resets_state() {
        let action = AsyncAction::default();

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            action.perform(tokio::time::sleep(Duration::from_secs(10))),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(action.state(), ActionState::default());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(action.state(), ActionState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_action_resets_state() {
        let action = AsyncAction::default();
        let observer = action.clone();

        let handle = tokio::spawn(async move {
            action
                .perform(async {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    panic!("action failed");
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(observer.state().show_progress);

        assert!(handle.await.unwrap_err().is_panic());
        assert_eq!(observer.state(), ActionState::default());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(observer.state(), ActionState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_actions_keep_control_disabled() {
        let action = AsyncAction::default();
        let short = action.clone();
        let long = action.clone();

        let short = tokio::spawn(async move {
            short
                .perform(tokio::time::sleep(Duration::from_millis(100)))
                .await
        });
        let long = tokio::spawn(async move {
            long.perform(tokio::time::sleep(Duration::from_millis(500)))
                .await
        });

        short.await.unwrap();
        assert!(action.state().disabled);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            action.state(),
            ActionState {
                disabled: true,
                show_progress: true
            }
        );

        long.await.unwrap();
        assert_eq!(action.state(), ActionState::default());
    }
}
