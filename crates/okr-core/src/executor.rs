use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::config::CoordinatorConfig;
use crate::lifetime::MountLifetime;
use crate::notify::Notifier;
use crate::processing::{Generation, ProcessingState};

// ---------------------------------------------------------------------------
// ActionOptions
// ---------------------------------------------------------------------------

/// Per-call feedback and timing for [`ActionExecutor::execute`].
///
/// Unset fields fall back to the executor's [`CoordinatorConfig`].
#[derive(Debug, Clone, Default)]
pub struct ActionOptions {
    pub success_message: Option<String>,
    pub error_message: Option<String>,
    pub delay: Option<Duration>,
}

impl ActionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

// ---------------------------------------------------------------------------
// ActionOutcome
// ---------------------------------------------------------------------------

/// How an executed action ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome<T> {
    Completed(T),
    /// The action ran and failed; carries the error's display text.
    Failed(String),
    /// Another action was in flight, so this one never ran.
    Dropped,
}

impl<T> ActionOutcome<T> {
    /// Collapse to the value-or-nothing view: failures and drops both
    /// become `None`.
    pub fn into_option(self) -> Option<T> {
        match self {
            ActionOutcome::Completed(value) => Some(value),
            ActionOutcome::Failed(_) | ActionOutcome::Dropped => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ActionOutcome::Failed(_))
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, ActionOutcome::Dropped)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionOutcome<U> {
        match self {
            ActionOutcome::Completed(value) => ActionOutcome::Completed(f(value)),
            ActionOutcome::Failed(message) => ActionOutcome::Failed(message),
            ActionOutcome::Dropped => ActionOutcome::Dropped,
        }
    }
}

// ---------------------------------------------------------------------------
// ActionExecutor
// ---------------------------------------------------------------------------

/// Runs asynchronous actions behind the shared processing flag.
///
/// At most one action per executor is in flight; a call made while another
/// is running returns [`ActionOutcome::Dropped`] without invoking its action.
/// Success and failure are reported through the [`Notifier`], never as an
/// error to the caller.
#[derive(Clone)]
pub struct ActionExecutor {
    state: ProcessingState,
    notifier: Arc<dyn Notifier>,
    config: CoordinatorConfig,
}

impl ActionExecutor {
    pub fn new(state: ProcessingState, notifier: Arc<dyn Notifier>, config: CoordinatorConfig) -> Self {
        Self {
            state,
            notifier,
            config,
        }
    }

    /// Executor with its own processing state bound to `lifetime`.
    pub fn with_lifetime(
        lifetime: MountLifetime,
        notifier: Arc<dyn Notifier>,
        config: CoordinatorConfig,
    ) -> Self {
        let state = ProcessingState::from_config(lifetime, &config);
        Self::new(state, notifier, config)
    }

    pub fn is_processing(&self) -> bool {
        self.state.is_processing()
    }

    pub fn state(&self) -> &ProcessingState {
        &self.state
    }

    pub fn lifetime(&self) -> &MountLifetime {
        self.state.lifetime()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run `action` and report how it ended.
    ///
    /// The processing flag is cleared `delay` after settlement, including
    /// when this future is dropped before the action settles.
    pub async fn execute<F, Fut, T, E>(&self, action: F, options: ActionOptions) -> ActionOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let delay = options
            .delay
            .unwrap_or_else(|| self.config.trailing_delay());

        let Some(generation) = self.state.try_begin() else {
            debug!("action execution blocked - already processing");
            return ActionOutcome::Dropped;
        };
        let _finish = FinishOnDrop {
            state: &self.state,
            generation,
            delay,
        };

        debug!(
            generation,
            has_success_message = options.success_message.is_some(),
            delay_ms = delay.as_millis() as u64,
            "action execution started"
        );

        match action().await {
            Ok(value) => {
                debug!(generation, "action completed successfully");
                if let Some(message) = options.success_message.as_deref() {
                    if self.lifetime().is_mounted() {
                        self.notifier.success(message);
                    }
                }
                ActionOutcome::Completed(value)
            }
            Err(err) => {
                error!(generation, error = %err, "error executing action");
                if self.lifetime().is_mounted() {
                    let message = options
                        .error_message
                        .as_deref()
                        .unwrap_or(&self.config.default_error_message);
                    self.notifier.error(message);
                }
                ActionOutcome::Failed(err.to_string())
            }
        }
    }

    /// Value-or-nothing form of [`execute`](Self::execute): `None` covers
    /// both failures and dropped calls.
    pub async fn execute_action<F, Fut, T, E>(&self, action: F, options: ActionOptions) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.execute(action, options).await.into_option()
    }
}

/// Schedules the trailing clear however `execute` exits.
struct FinishOnDrop<'a> {
    state: &'a ProcessingState,
    generation: Generation,
    delay: Duration,
}

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.state.finish_after(self.generation, self.delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ERROR_MESSAGE;
    use crate::notify::{NotificationKind, RecordingNotifier};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn executor() -> (ActionExecutor, RecordingNotifier) {
        let notifier = RecordingNotifier::new();
        let executor = ActionExecutor::with_lifetime(
            MountLifetime::new(),
            Arc::new(notifier.clone()),
            CoordinatorConfig::default(),
        );
        (executor, notifier)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn success_returns_value_and_notifies() {
        let (executor, notifier) = executor();

        let result = executor
            .execute_action(
                || async { Ok::<_, String>(42) },
                ActionOptions::new().success_message("ok"),
            )
            .await;

        assert_eq!(result, Some(42));
        assert_eq!(notifier.messages(NotificationKind::Success), vec!["ok"]);
        assert_eq!(notifier.len(), 1);

        // Flag is held for the trailing delay, then released.
        assert!(executor.is_processing());
        sleep_ms(301).await;
        assert!(!executor.is_processing());
    }

    #[tokio::test(start_paused = true)]
    async fn success_without_message_is_silent() {
        let (executor, notifier) = executor();
        let result = executor
            .execute_action(|| async { Ok::<_, String>("done") }, ActionOptions::new())
            .await;
        assert_eq!(result, Some("done"));
        assert!(notifier.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_returns_none_with_default_error_message() {
        let (executor, notifier) = executor();

        let outcome = executor
            .execute(
                || async { Err::<i32, _>(std::io::Error::other("x")) },
                ActionOptions::new(),
            )
            .await;

        assert_eq!(outcome, ActionOutcome::Failed("x".to_string()));
        assert_eq!(
            notifier.messages(NotificationKind::Error),
            vec![DEFAULT_ERROR_MESSAGE]
        );
        assert_eq!(notifier.len(), 1);

        sleep_ms(301).await;
        assert!(!executor.is_processing());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_uses_caller_error_message() {
        let (executor, notifier) = executor();
        let result = executor
            .execute_action(
                || async { Err::<(), _>("nope") },
                ActionOptions::new().error_message("could not save"),
            )
            .await;
        assert_eq!(result, None);
        assert_eq!(notifier.messages(NotificationKind::Error), vec!["could not save"]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_call_is_dropped_without_running() {
        let (executor, notifier) = executor();
        let invoked = Arc::new(AtomicUsize::new(0));

        let first = {
            let executor = executor.clone();
            let invoked = Arc::clone(&invoked);
            tokio::spawn(async move {
                executor
                    .execute_action(
                        move || async move {
                            invoked.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_secs(2)).await;
                            Ok::<_, String>("first")
                        },
                        ActionOptions::new().success_message("first done"),
                    )
                    .await
            })
        };

        // Let the first action start.
        sleep_ms(10).await;
        assert!(executor.is_processing());

        let second_invoked = Arc::clone(&invoked);
        let second = executor
            .execute(
                move || async move {
                    second_invoked.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>("second")
                },
                ActionOptions::new().success_message("second done"),
            )
            .await;

        assert!(second.is_dropped());
        assert_eq!(invoked.load(Ordering::SeqCst), 1);

        let first = first.await.unwrap();
        assert_eq!(first, Some("first"));
        assert_eq!(notifier.messages(NotificationKind::Success), vec!["first done"]);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_delay_controls_release() {
        let (executor, _) = executor();
        executor
            .execute_action(
                || async { Ok::<_, String>(()) },
                ActionOptions::new().delay(Duration::from_millis(50)),
            )
            .await;
        sleep_ms(49).await;
        assert!(executor.is_processing());
        sleep_ms(2).await;
        assert!(!executor.is_processing());
    }

    #[tokio::test(start_paused = true)]
    async fn never_settling_action_is_reset_by_safety_timeout() {
        let (executor, notifier) = executor();
        let task = {
            let executor = executor.clone();
            tokio::spawn(async move {
                executor
                    .execute_action(
                        || std::future::pending::<Result<(), String>>(),
                        ActionOptions::new().delay(Duration::from_millis(10_000)),
                    )
                    .await
            })
        };

        sleep_ms(4999).await;
        assert!(executor.is_processing());
        sleep_ms(2).await;
        assert!(!executor.is_processing());
        assert!(notifier.is_empty());

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_call_still_releases_the_flag() {
        let (executor, _) = executor();
        let result = tokio::time::timeout(
            Duration::from_millis(100),
            executor.execute_action(
                || std::future::pending::<Result<(), String>>(),
                ActionOptions::new(),
            ),
        )
        .await;
        assert!(result.is_err());
        assert!(executor.is_processing());

        sleep_ms(301).await;
        assert!(!executor.is_processing());
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_during_flight_suppresses_notifications_and_reset() {
        let (executor, notifier) = executor();
        let task = {
            let executor = executor.clone();
            tokio::spawn(async move {
                executor
                    .execute_action(
                        || async {
                            tokio::time::sleep(Duration::from_millis(500)).await;
                            Ok::<_, String>(7)
                        },
                        ActionOptions::new().success_message("saved"),
                    )
                    .await
            })
        };

        sleep_ms(10).await;
        executor.lifetime().unmount();

        // The action itself still completes and yields its value.
        assert_eq!(task.await.unwrap(), Some(7));
        sleep_ms(6000).await;
        assert!(notifier.is_empty());
        assert!(executor.is_processing());
    }

    #[test]
    fn outcome_projection_conflates_failure_and_drop() {
        assert_eq!(ActionOutcome::Completed(1).into_option(), Some(1));
        assert_eq!(ActionOutcome::<i32>::Failed("e".into()).into_option(), None);
        assert_eq!(ActionOutcome::<i32>::Dropped.into_option(), None);
        assert_eq!(ActionOutcome::Completed(2).map(|v| v * 2), ActionOutcome::Completed(4));
    }
}
