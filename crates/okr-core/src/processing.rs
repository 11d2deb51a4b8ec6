use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::CoordinatorConfig;
use crate::lifetime::MountLifetime;

/// Identifies one flight of the processing flag.
///
/// Every `false -> true` transition bumps the generation, so a trailing clear
/// scheduled by an earlier flight cannot reset a later one.
pub type Generation = u64;

// ---------------------------------------------------------------------------
// Inner
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Inner {
    is_processing: bool,
    started_at: Option<Instant>,
    generation: Generation,
    safety_timer: Option<JoinHandle<()>>,
    trailing_timers: Vec<JoinHandle<()>>,
}

impl Inner {
    fn clear(&mut self) {
        self.is_processing = false;
        self.started_at = None;
        if let Some(timer) = self.safety_timer.take() {
            timer.abort();
        }
    }

    fn abort_timers(&mut self) {
        if let Some(timer) = self.safety_timer.take() {
            timer.abort();
        }
        for timer in self.trailing_timers.drain(..) {
            timer.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.abort_timers();
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// ProcessingState
// ---------------------------------------------------------------------------

/// Single source of truth for "is a mutation currently in flight".
///
/// Setting the flag arms a safety timer that forcibly resets it if nobody
/// clears it in time, so a hung action cannot leave the dashboard disabled.
/// All writes are suppressed once the owning [`MountLifetime`] is unmounted.
///
/// Cloning is cheap and every clone observes the same flag. Timers are owned
/// by the state and aborted on [`dispose`](Self::dispose) or when the last
/// clone is dropped.
#[derive(Debug, Clone)]
pub struct ProcessingState {
    inner: Arc<Mutex<Inner>>,
    lifetime: MountLifetime,
    safety_timeout: Duration,
}

impl ProcessingState {
    pub fn new(lifetime: MountLifetime, safety_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            lifetime,
            safety_timeout,
        }
    }

    pub fn from_config(lifetime: MountLifetime, config: &CoordinatorConfig) -> Self {
        Self::new(lifetime, config.safety_timeout())
    }

    pub fn is_processing(&self) -> bool {
        lock(&self.inner).is_processing
    }

    /// How long the current flight has lasted, if one is in progress.
    pub fn processing_since(&self) -> Option<Duration> {
        lock(&self.inner).started_at.map(|started| started.elapsed())
    }

    pub fn generation(&self) -> Generation {
        lock(&self.inner).generation
    }

    pub fn lifetime(&self) -> &MountLifetime {
        &self.lifetime
    }

    /// Raw setter. `true` starts a flight and arms the safety timer (no-op if
    /// one is already running); `false` ends it and disarms the timer.
    pub fn set_processing(&self, value: bool) {
        if !self.lifetime.is_mounted() {
            return;
        }
        let mut inner = lock(&self.inner);
        if value {
            if !inner.is_processing {
                self.begin_locked(&mut inner);
            }
        } else {
            inner.clear();
        }
    }

    /// Atomically claim the flag.
    ///
    /// Returns `None` when another flight is already in progress. After
    /// unmount the flag is left untouched and the current generation is
    /// returned, so the caller can still run its action.
    pub fn try_begin(&self) -> Option<Generation> {
        let mut inner = lock(&self.inner);
        if inner.is_processing {
            return None;
        }
        if !self.lifetime.is_mounted() {
            return Some(inner.generation);
        }
        Some(self.begin_locked(&mut inner))
    }

    /// Clear the flag if it still belongs to `generation`.
    pub fn finish(&self, generation: Generation) -> bool {
        if !self.lifetime.is_mounted() {
            return false;
        }
        let mut inner = lock(&self.inner);
        if inner.generation != generation || !inner.is_processing {
            return false;
        }
        inner.clear();
        true
    }

    /// Clear the flag for `generation` once `delay` has elapsed.
    pub fn finish_after(&self, generation: Generation, delay: Duration) {
        if delay.is_zero() || tokio::runtime::Handle::try_current().is_err() {
            self.finish(generation);
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let lifetime = self.lifetime.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !lifetime.is_mounted() {
                return;
            }
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut inner = lock(&inner);
            if inner.generation == generation && inner.is_processing {
                debug!(generation, "resetting processing state after action");
                inner.clear();
            }
        });

        let mut inner = lock(&self.inner);
        inner.trailing_timers.retain(|timer| !timer.is_finished());
        inner.trailing_timers.push(handle);
    }

    /// Abort every owned timer. The flag keeps its current value.
    pub fn dispose(&self) {
        lock(&self.inner).abort_timers();
    }

    fn begin_locked(&self, inner: &mut Inner) -> Generation {
        inner.generation = inner.generation.wrapping_add(1);
        inner.is_processing = true;
        inner.started_at = Some(Instant::now());
        if let Some(timer) = inner.safety_timer.take() {
            timer.abort();
        }
        inner.safety_timer = self.arm_safety_timer(inner.generation);
        debug!(generation = inner.generation, "processing started");
        inner.generation
    }

    fn arm_safety_timer(&self, generation: Generation) -> Option<JoinHandle<()>> {
        // Without a runtime there is nothing to drive the timer (sync callers).
        if tokio::runtime::Handle::try_current().is_err() {
            return None;
        }
        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        let lifetime = self.lifetime.clone();
        let timeout = self.safety_timeout;
        Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if !lifetime.is_mounted() {
                return;
            }
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut inner = lock(&inner);
            if inner.generation != generation || !inner.is_processing {
                return;
            }
            let stuck_for = inner
                .started_at
                .map(|started| started.elapsed())
                .unwrap_or(timeout);
            warn!(
                generation,
                stuck_ms = stuck_for.as_millis() as u64,
                "safety timeout triggered - processing state was stuck for {:.1} seconds",
                stuck_for.as_secs_f64()
            );
            inner.is_processing = false;
            inner.started_at = None;
            // This task is the safety timer; dropping its own handle detaches it.
            inner.safety_timer = None;
        }))
    }
}
