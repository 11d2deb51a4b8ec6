pub mod activity;
pub mod config;
pub mod demo;
pub mod objective;
pub mod token;

use okr_core::ActionOutcome;

pub(crate) fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}

/// Turn a handler outcome into a CLI result. The failure itself was already
/// reported through the notifier.
pub(crate) fn require<T>(outcome: ActionOutcome<T>, what: &str) -> anyhow::Result<T> {
    match outcome {
        ActionOutcome::Completed(value) => Ok(value),
        ActionOutcome::Failed(reason) => anyhow::bail!("{what} failed: {reason}"),
        ActionOutcome::Dropped => anyhow::bail!("{what} skipped: another action is in flight"),
    }
}
