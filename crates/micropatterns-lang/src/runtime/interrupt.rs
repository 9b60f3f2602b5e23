use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation token. Clones share one flag, so a host can keep
/// a handle and request interruption while generation or rendering runs.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self { Self::default() }

    pub fn request(&self) { self.0.store(true, Ordering::Relaxed); }

    pub fn is_requested(&self) -> bool { self.0.load(Ordering::Relaxed) }

    pub fn clear(&self) { self.0.store(false, Ordering::Relaxed); }
}
