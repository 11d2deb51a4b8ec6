use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::CoordinatorConfig;
use crate::lifetime::MountLifetime;

// ---------------------------------------------------------------------------
// PendingActionId
// ---------------------------------------------------------------------------

/// Per-invocation key: `<operation>-<entityId>-<timestampMillis>`, or
/// `<operation>-<timestampMillis>` when the operation has no target entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingActionId(String);

impl PendingActionId {
    /// Key stamped with the current wall-clock time.
    pub fn new(operation: &str, entity_id: Option<&str>) -> Self {
        Self::at(operation, entity_id, chrono::Utc::now().timestamp_millis())
    }

    pub fn at(operation: &str, entity_id: Option<&str>, timestamp_millis: i64) -> Self {
        match entity_id {
            Some(entity) => Self(format!("{operation}-{entity}-{timestamp_millis}")),
            None => Self(format!("{operation}-{timestamp_millis}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PendingActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PendingActionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PendingActionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Registry {
    pending: HashSet<PendingActionId>,
    /// One live timer per entry (safety or completion), tagged with a ticket
    /// so a superseded timer cannot remove a re-armed entry.
    timers: HashMap<PendingActionId, (u64, JoinHandle<()>)>,
    next_ticket: u64,
}

impl Registry {
    fn replace_timer(&mut self, id: &PendingActionId) -> u64 {
        if let Some((_, timer)) = self.timers.remove(id) {
            timer.abort();
        }
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.next_ticket
    }

    fn abort_timers(&mut self) {
        for (_, (_, timer)) in self.timers.drain() {
            timer.abort();
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.abort_timers();
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy)]
enum Expiry {
    Safety,
    Completed,
}

// ---------------------------------------------------------------------------
// PendingActions
// ---------------------------------------------------------------------------

/// Keyed set of in-flight action ids.
///
/// Entries are removed a grace delay after completion, or by a safety
/// timeout if completion is never reported. Writes are ignored after the
/// owning [`MountLifetime`] is unmounted.
#[derive(Debug, Clone)]
pub struct PendingActions {
    registry: Arc<Mutex<Registry>>,
    lifetime: MountLifetime,
    safety_timeout: Duration,
}

impl PendingActions {
    pub fn new(lifetime: MountLifetime, safety_timeout: Duration) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            lifetime,
            safety_timeout,
        }
    }

    pub fn from_config(lifetime: MountLifetime, config: &CoordinatorConfig) -> Self {
        Self::new(lifetime, config.safety_timeout())
    }

    pub fn is_action_pending(&self, id: &PendingActionId) -> bool {
        lock(&self.registry).pending.contains(id)
    }

    pub fn pending_actions_count(&self) -> usize {
        lock(&self.registry).pending.len()
    }

    pub fn any_actions_pending(&self) -> bool {
        !lock(&self.registry).pending.is_empty()
    }

    pub fn mark_action_pending(&self, id: PendingActionId) {
        if !self.lifetime.is_mounted() {
            return;
        }
        debug!(action = %id, "marking action as pending");
        let mut registry = lock(&self.registry);
        let ticket = registry.replace_timer(&id);
        registry.pending.insert(id.clone());
        if let Some(timer) = self.arm(id.clone(), ticket, self.safety_timeout, Expiry::Safety) {
            registry.timers.insert(id, (ticket, timer));
        }
    }

    /// Remove `id` once `delay` has elapsed. Cancels its safety timeout.
    pub fn mark_action_completed(&self, id: &PendingActionId, delay: Duration) {
        if !self.lifetime.is_mounted() {
            return;
        }
        let mut registry = lock(&self.registry);
        let ticket = registry.replace_timer(id);
        if delay.is_zero() || tokio::runtime::Handle::try_current().is_err() {
            debug!(action = %id, "marking action as completed");
            registry.pending.remove(id);
            return;
        }
        if let Some(timer) = self.arm(id.clone(), ticket, delay, Expiry::Completed) {
            registry.timers.insert(id.clone(), (ticket, timer));
        }
    }

    /// Register `id` and return a guard that marks it completed with
    /// `delay` when dropped.
    pub fn track(&self, id: PendingActionId, delay: Duration) -> PendingGuard<'_> {
        self.mark_action_pending(id.clone());
        PendingGuard {
            actions: self,
            id,
            delay,
        }
    }

    /// Abort every timer. Entries stay as they are.
    pub fn dispose(&self) {
        lock(&self.registry).abort_timers();
    }

    fn arm(
        &self,
        id: PendingActionId,
        ticket: u64,
        after: Duration,
        expiry: Expiry,
    ) -> Option<JoinHandle<()>> {
        if tokio::runtime::Handle::try_current().is_err() {
            return None;
        }
        let weak: Weak<Mutex<Registry>> = Arc::downgrade(&self.registry);
        let lifetime = self.lifetime.clone();
        Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if !lifetime.is_mounted() {
                return;
            }
            let Some(registry) = weak.upgrade() else {
                return;
            };
            let mut registry = lock(&registry);
            match registry.timers.get(&id) {
                Some((current, _)) if *current == ticket => {}
                _ => return,
            }
            match expiry {
                Expiry::Safety => warn!(action = %id, "safety timeout triggered for action"),
                Expiry::Completed => debug!(action = %id, "marking action as completed"),
            }
            registry.pending.remove(&id);
            registry.timers.remove(&id);
        }))
    }
}

/// Marks its action completed when dropped.
pub struct PendingGuard<'a> {
    actions: &'a PendingActions,
    id: PendingActionId,
    delay: Duration,
}

impl PendingGuard<'_> {
    pub fn id(&self) -> &PendingActionId {
        &self.id
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.actions.mark_action_completed(&self.id, self.delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PendingActions {
        PendingActions::new(MountLifetime::new(), Duration::from_millis(5000))
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[test]
    fn id_embeds_operation_entity_and_timestamp() {
        let id = PendingActionId::at("updateActivity", Some("a1"), 1_700_000_000_000);
        assert_eq!(id.as_str(), "updateActivity-a1-1700000000000");
        let id = PendingActionId::at("addObjective", None, 42);
        assert_eq!(id.to_string(), "addObjective-42");
    }

    #[tokio::test(start_paused = true)]
    async fn pending_until_completion_delay_elapses() {
        let actions = registry();
        let id = PendingActionId::from("deleteActivity-a1-1");

        actions.mark_action_pending(id.clone());
        assert!(actions.is_action_pending(&id));
        assert_eq!(actions.pending_actions_count(), 1);
        assert!(actions.any_actions_pending());

        actions.mark_action_completed(&id, Duration::from_millis(300));
        sleep_ms(299).await;
        assert!(actions.is_action_pending(&id));
        sleep_ms(2).await;
        assert!(!actions.is_action_pending(&id));
        assert!(!actions.any_actions_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_entry_is_removed_by_safety_timeout() {
        let actions = registry();
        let id = PendingActionId::from("addActivity-o1-1");
        actions.mark_action_pending(id.clone());

        sleep_ms(4999).await;
        assert!(actions.is_action_pending(&id));
        sleep_ms(2).await;
        assert!(!actions.is_action_pending(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn completion_cancels_the_safety_timeout() {
        let actions = registry();
        let id = PendingActionId::from("addActivity-o1-2");
        actions.mark_action_pending(id.clone());
        sleep_ms(4900).await;

        actions.mark_action_completed(&id, Duration::from_millis(300));
        // Safety deadline (5000) passes; the completion timer (5200) decides.
        sleep_ms(200).await;
        assert!(actions.is_action_pending(&id));
        sleep_ms(101).await;
        assert!(!actions.is_action_pending(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn counts_independent_entries() {
        let actions = registry();
        let a = PendingActionId::from("updateActivity-a-1");
        let b = PendingActionId::from("updateActivity-b-1");
        actions.mark_action_pending(a.clone());
        actions.mark_action_pending(b.clone());
        assert_eq!(actions.pending_actions_count(), 2);

        actions.mark_action_completed(&a, Duration::ZERO);
        assert_eq!(actions.pending_actions_count(), 1);
        assert!(actions.is_action_pending(&b));
    }

    #[tokio::test(start_paused = true)]
    async fn guard_completes_on_drop() {
        let actions = registry();
        let id = PendingActionId::from("deleteObjective-o1-1");
        {
            let guard = actions.track(id.clone(), Duration::from_millis(300));
            assert_eq!(guard.id(), &id);
            assert!(actions.is_action_pending(&id));
        }
        assert!(actions.is_action_pending(&id));
        sleep_ms(301).await;
        assert!(!actions.is_action_pending(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_freezes_the_registry() {
        let actions = registry();
        let id = PendingActionId::from("addObjective-1");
        actions.mark_action_pending(id.clone());
        actions.lifetime.unmount();

        actions.mark_action_completed(&id, Duration::ZERO);
        sleep_ms(6000).await;
        assert!(actions.is_action_pending(&id));

        actions.mark_action_pending(PendingActionId::from("addObjective-2"));
        assert_eq!(actions.pending_actions_count(), 1);
    }
}
