//! Host-facing interaction state.

use lyon::math::{point, Point};
use std::sync::{Arc, RwLock};

/// What the surrounding UI may know about the effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionSnapshot {
    /// True only for genuine input within the last two seconds.
    pub is_active: bool,
    /// Lead opacity while active, otherwise zero.
    pub intensity: f32,
    /// UV position of the pointer (or the lead when inactive).
    pub position: Point,
}

impl Default for InteractionSnapshot {
    fn default() -> Self {
        Self {
            is_active: false,
            intensity: 0.0,
            position: point(0.5, 0.5),
        }
    }
}

/// Shared handle the frame loop publishes into and unrelated UI reads from.
///
/// Cloning yields another handle to the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<InteractionSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: InteractionSnapshot) {
        match self.inner.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    pub fn get(&self) -> InteractionSnapshot {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
