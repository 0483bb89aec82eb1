//! Overlay registry: id → overlay, plus the surface handle displaying it.

use crate::bitmap::Bitmap;
use crate::config::{HeatmapConfig, HeatmapUpdate};
use crate::error::{HeatmapError, HeatmapResult};
use crate::overlay::HeatmapOverlay;
use crate::surface::{MapSurface, NullSurface, SurfaceHandle};
use crate::types::{Epoch, OverlayId, TileKey, WeightedPoint, ZoomLevel};
use log::{debug, info};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Entries {
    live: HashMap<OverlayId, Arc<HeatmapOverlay>>,
    /// Ids that were issued and later removed.
    retired: HashSet<OverlayId>,
}

/// Owns every overlay shown on one map surface.
///
/// Ids are issued from a counter and never reused, so an id that was removed
/// keeps answering `OverlayRemoved` instead of reaching a newer overlay.
pub struct OverlayRegistry {
    surface: Arc<dyn MapSurface>,
    entries: RwLock<Entries>,
    next_id: AtomicU64,
}

impl OverlayRegistry {
    pub fn new(surface: Arc<dyn MapSurface>) -> Self {
        Self {
            surface,
            entries: RwLock::new(Entries::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registry backed by a [`NullSurface`].
    pub fn headless() -> Self {
        Self::new(Arc::new(NullSurface::new()))
    }

    /// Build an overlay and attach it to the surface.
    pub fn add(&self, points: Vec<WeightedPoint>, config: HeatmapConfig) -> HeatmapResult<OverlayId> {
        let id = OverlayId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let overlay = Arc::new(HeatmapOverlay::new(id, points, config)?);

        let mut entries = self.entries.write();
        let z_index = entries.live.len() as i32;
        let handle = self.surface.attach(id, z_index);
        overlay.bind_surface(Arc::clone(&self.surface), handle);
        entries.live.insert(id, overlay);
        drop(entries);

        info!("Added overlay {} as {}", id, handle);
        Ok(id)
    }

    pub fn lookup(&self, id: OverlayId) -> HeatmapResult<Arc<HeatmapOverlay>> {
        let entries = self.entries.read();
        match entries.live.get(&id) {
            Some(overlay) => Ok(Arc::clone(overlay)),
            None if entries.retired.contains(&id) => Err(HeatmapError::OverlayRemoved(id)),
            None => Err(HeatmapError::NotFound(id)),
        }
    }

    /// Dispose the overlay and detach it from the surface.
    pub fn remove(&self, id: OverlayId) -> HeatmapResult<()> {
        let overlay = {
            let mut entries = self.entries.write();
            match entries.live.remove(&id) {
                Some(overlay) => {
                    entries.retired.insert(id);
                    overlay
                }
                None if entries.retired.contains(&id) => return Err(HeatmapError::OverlayRemoved(id)),
                None => return Err(HeatmapError::NotFound(id)),
            }
        };
        if overlay.dispose().is_err() {
            debug!("Overlay {} was already disposed", id);
        }
        info!("Removed overlay {}", id);
        Ok(())
    }

    /// Tile-provider contract for the surface.
    pub fn request_tile(&self, id: OverlayId, zoom: ZoomLevel, x: u32, y: u32) -> HeatmapResult<Arc<Bitmap>> {
        self.lookup(id)?.request_tile(TileKey::new(zoom, x, y))
    }

    pub fn update(&self, id: OverlayId, update: HeatmapUpdate) -> HeatmapResult<Epoch> {
        self.lookup(id)?.apply(update)
    }

    pub fn surface_handle(&self, id: OverlayId) -> HeatmapResult<SurfaceHandle> {
        self.lookup(id)?.surface_handle().ok_or(HeatmapError::OverlayRemoved(id))
    }

    /// Live ids in ascending order.
    pub fn ids(&self) -> Vec<OverlayId> {
        let mut ids: Vec<_> = self.entries.read().live.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.read().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().live.is_empty()
    }

    /// Remove every live overlay.
    pub fn clear(&self) {
        let drained: Vec<_> = {
            let mut entries = self.entries.write();
            let drained: Vec<_> = entries.live.drain().collect();
            for (id, _) in &drained {
                entries.retired.insert(*id);
            }
            drained
        };
        for (id, overlay) in drained {
            if overlay.dispose().is_err() {
                debug!("Overlay {} was already disposed", id);
            }
            info!("Removed overlay {}", id);
        }
    }
}

impl Drop for OverlayRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
