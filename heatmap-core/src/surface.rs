//! Boundary with the host map surface.
//!
//! The host owns display objects and decides which tiles to fetch; the engine
//! only tells it when an overlay appears, changes or goes away.

use crate::types::OverlayId;
use log::trace;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Host-side handle of a displayed overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// A map surface that displays tile overlays.
pub trait MapSurface: Send + Sync {
    /// Start displaying overlay `id` at `z_index`.
    fn attach(&self, id: OverlayId, z_index: i32) -> SurfaceHandle;

    /// Discard every displayed tile of `handle` and fetch them again.
    fn clear_tile_cache(&self, handle: SurfaceHandle);

    /// Stop displaying `handle`.
    fn detach(&self, handle: SurfaceHandle);
}

/// Surface for headless use: hands out handles and ignores signals.
#[derive(Debug, Default)]
pub struct NullSurface {
    next: AtomicU64,
}

impl NullSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MapSurface for NullSurface {
    fn attach(&self, id: OverlayId, _z_index: i32) -> SurfaceHandle {
        let handle = SurfaceHandle(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        trace!("Attached {} as {}", id, handle);
        handle
    }

    fn clear_tile_cache(&self, handle: SurfaceHandle) {
        trace!("Tile cache clear requested for {}", handle);
    }

    fn detach(&self, handle: SurfaceHandle) {
        trace!("Detached {}", handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_surface_handles_are_unique() {
        let surface = NullSurface::new();
        let a = surface.attach(OverlayId(1), 0);
        let b = surface.attach(OverlayId(2), 0);
        assert_ne!(a, b);
        surface.clear_tile_cache(a);
        surface.detach(a);
        assert_eq!(b.to_string(), "surface#2");
    }
}
