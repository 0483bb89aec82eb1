//! Minimal host surface: the CLI "displays" overlays by logging what a map would do.

use heatmap_core::{MapSurface, OverlayId, SurfaceHandle};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct LogSurface {
    next: AtomicU64,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MapSurface for LogSurface {
    fn attach(&self, id: OverlayId, z_index: i32) -> SurfaceHandle {
        let handle = SurfaceHandle(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        log::debug!("Displaying {} as {} at z-index {}", id, handle, z_index);
        handle
    }

    fn clear_tile_cache(&self, handle: SurfaceHandle) {
        log::debug!("Re-requesting visible tiles of {}", handle);
    }

    fn detach(&self, handle: SurfaceHandle) {
        log::debug!("Removed {} from display", handle);
    }
}
