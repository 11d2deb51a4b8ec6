use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "is the owning view still mounted" signal.
///
/// Every coordinator component holds a clone and checks it before writing
/// state or emitting notifications. Unmounting is one-way.
#[derive(Debug, Clone)]
pub struct MountLifetime {
    mounted: Arc<AtomicBool>,
}

impl MountLifetime {
    pub fn new() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }
}

impl Default for MountLifetime {
    fn default() -> Self {
        Self::new()
    }
}
