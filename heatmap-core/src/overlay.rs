/*!
# Heatmap Overlay

Controller tying one data set, one configuration and one tile cache together.

Everything a render needs lives in an immutable [`RenderSnapshot`]. Mutators
build a complete replacement under the write lock, bump the cache epoch and
swap it in; tile requests clone the current snapshot and render without
holding any lock. A render that raced a mutation is rejected by the cache's
epoch check instead of being stored.
*/

use crate::bitmap::Bitmap;
use crate::cache::{CacheStats, RenderedTile, TileCache};
use crate::config::{HeatmapConfig, HeatmapUpdate, MaxIntensity};
use crate::error::{HeatmapError, HeatmapResult};
use crate::gradient::Gradient;
use crate::index::SpatialIndex;
use crate::intensity::MaxIntensityTable;
use crate::raster::DensityRasterizer;
use crate::surface::{MapSurface, SurfaceHandle};
use crate::types::{Epoch, OverlayId, TileKey, WeightedPoint, ZoomLevel};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Immutable render state for one epoch.
#[derive(Debug)]
pub struct RenderSnapshot {
    epoch: Epoch,
    config: HeatmapConfig,
    index: Arc<SpatialIndex>,
    rasterizer: DensityRasterizer,
    max_intensity: MaxIntensityTable,
    blank: Arc<Bitmap>,
}

impl RenderSnapshot {
    fn new(
        epoch: Epoch,
        config: HeatmapConfig,
        index: Arc<SpatialIndex>,
        max_intensity: MaxIntensityTable,
    ) -> Self {
        let rasterizer = DensityRasterizer::new(&config);
        let blank = Arc::new(Bitmap::transparent(config.tile_size, config.tile_size));
        Self {
            epoch,
            config,
            index,
            rasterizer,
            max_intensity,
            blank,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn max_intensity_at(&self, zoom: ZoomLevel) -> f64 {
        self.max_intensity.at(zoom)
    }

    /// Render `key` from this snapshot. Tiles without nearby points share one
    /// transparent bitmap.
    pub fn render(&self, key: TileKey) -> Arc<Bitmap> {
        let bounds = key.world_bounds();
        let padding = self.rasterizer.padding(&bounds);
        let samples: Vec<_> = self.index.query_wrapped(&bounds, padding).collect();
        if samples.is_empty() {
            return Arc::clone(&self.blank);
        }

        let max = self.max_intensity.at(key.zoom);
        let bitmap = self.rasterizer.render(&bounds, samples.iter().copied(), max);
        debug!(
            "Rendered tile {} from {} points (epoch {}, max intensity {:.3})",
            key,
            samples.len(),
            self.epoch,
            max
        );
        Arc::new(bitmap)
    }
}

struct SurfaceBinding {
    surface: Arc<dyn MapSurface>,
    handle: SurfaceHandle,
}

/// A heatmap layer served to a map surface as tiles.
pub struct HeatmapOverlay {
    id: OverlayId,
    /// `None` once the overlay has been disposed.
    state: RwLock<Option<Arc<RenderSnapshot>>>,
    cache: TileCache,
    binding: Mutex<Option<SurfaceBinding>>,
}

impl std::fmt::Debug for HeatmapOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeatmapOverlay")
            .field("id", &self.id)
            .field("epoch", &self.cache.epoch())
            .field("removed", &self.is_removed())
            .finish()
    }
}

impl HeatmapOverlay {
    /// Validate `config`, index `points` and build the first snapshot.
    pub fn new(id: OverlayId, points: Vec<WeightedPoint>, config: HeatmapConfig) -> HeatmapResult<Self> {
        config.validate()?;
        let index = Arc::new(SpatialIndex::build(&points)?);
        let max_intensity = MaxIntensityTable::resolve(&config, &index);

        let cache = TileCache::new();
        let snapshot = RenderSnapshot::new(cache.epoch(), config, index, max_intensity);
        info!("Created overlay {} with {} points", id, snapshot.index.len());

        Ok(Self {
            id,
            state: RwLock::new(Some(Arc::new(snapshot))),
            cache,
            binding: Mutex::new(None),
        })
    }

    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub(crate) fn bind_surface(&self, surface: Arc<dyn MapSurface>, handle: SurfaceHandle) {
        *self.binding.lock() = Some(SurfaceBinding { surface, handle });
    }

    pub fn surface_handle(&self) -> Option<SurfaceHandle> {
        self.binding.lock().as_ref().map(|b| b.handle)
    }

    /// Current snapshot, or `OverlayRemoved`.
    pub fn snapshot(&self) -> HeatmapResult<Arc<RenderSnapshot>> {
        self.state.read().clone().ok_or(HeatmapError::OverlayRemoved(self.id))
    }

    /// Apply every field of `update` or none of them.
    ///
    /// A non-empty update always moves to a new epoch, even when the values
    /// are unchanged. Returns the epoch in effect afterwards.
    pub fn apply(&self, update: HeatmapUpdate) -> HeatmapResult<Epoch> {
        let mut state = self.state.write();
        let current = state.clone().ok_or(HeatmapError::OverlayRemoved(self.id))?;
        if update.is_empty() {
            return Ok(current.epoch);
        }

        let config = update.merged_config(&current.config).map_err(|e| {
            warn!("Rejected update for overlay {}: {}", self.id, e);
            e
        })?;
        let index = match &update.data {
            Some(points) => Arc::new(SpatialIndex::build(points).map_err(|e| {
                warn!("Rejected data set for overlay {}: {}", self.id, e);
                e
            })?),
            None => Arc::clone(&current.index),
        };
        let max_intensity = if update.data.is_some() || update.radius.is_some() || update.max_intensity.is_some() {
            MaxIntensityTable::resolve(&config, &index)
        } else {
            current.max_intensity.clone()
        };

        // Writers are serialized by the lock, so the next bump lands on `next`.
        let next = self.cache.epoch() + 1;
        let snapshot = Arc::new(RenderSnapshot::new(next, config, index, max_intensity));

        let epoch = self.cache.invalidate_all();
        debug_assert_eq!(epoch, next);
        if update.data.is_some() {
            info!("Overlay {} now has {} points (epoch {})", self.id, snapshot.index.len(), epoch);
        }
        *state = Some(snapshot);
        drop(state);

        self.signal_redraw();
        Ok(epoch)
    }

    pub fn set_radius(&self, radius: u32) -> HeatmapResult<Epoch> {
        self.apply(HeatmapUpdate::default().radius(radius))
    }

    pub fn set_gradient(&self, gradient: Gradient) -> HeatmapResult<Epoch> {
        self.apply(HeatmapUpdate::default().gradient(gradient))
    }

    pub fn set_opacity(&self, opacity: f64) -> HeatmapResult<Epoch> {
        self.apply(HeatmapUpdate::default().opacity(opacity))
    }

    pub fn set_max_intensity(&self, max_intensity: MaxIntensity) -> HeatmapResult<Epoch> {
        self.apply(HeatmapUpdate::default().max_intensity(max_intensity))
    }

    /// Replace the whole data set.
    pub fn set_data(&self, points: Vec<WeightedPoint>) -> HeatmapResult<Epoch> {
        self.apply(HeatmapUpdate::default().data(points))
    }

    /// Tile-provider entry point. Always yields a bitmap for an in-range key,
    /// fully transparent when no point is close enough to the tile.
    pub fn request_tile(&self, key: TileKey) -> HeatmapResult<Arc<Bitmap>> {
        let snapshot = self.snapshot()?;
        key.validate().map_err(|e| {
            warn!("Overlay {} asked for {}", self.id, e);
            e
        })?;

        if let Some(tile) = self.cache.get(&key) {
            return Ok(tile.bitmap);
        }

        let bitmap = snapshot.render(key);
        self.cache
            .put(RenderedTile::new(key, Arc::clone(&bitmap), snapshot.epoch));
        Ok(bitmap)
    }

    /// Release index and cache and detach from the surface. Every later call
    /// fails with `OverlayRemoved`. Reached through [`OverlayRegistry::remove`].
    ///
    /// [`OverlayRegistry::remove`]: crate::registry::OverlayRegistry::remove
    pub(crate) fn dispose(&self) -> HeatmapResult<()> {
        let released = self.state.write().take();
        if released.is_none() {
            return Err(HeatmapError::OverlayRemoved(self.id));
        }
        self.cache.invalidate_all();
        if let Some(binding) = self.binding.lock().take() {
            binding.surface.detach(binding.handle);
        }
        info!("Disposed overlay {}", self.id);
        Ok(())
    }

    pub fn is_removed(&self) -> bool {
        self.state.read().is_none()
    }

    pub fn config(&self) -> HeatmapResult<HeatmapConfig> {
        Ok(self.snapshot()?.config.clone())
    }

    pub fn epoch(&self) -> HeatmapResult<Epoch> {
        Ok(self.snapshot()?.epoch)
    }

    pub fn point_count(&self) -> HeatmapResult<usize> {
        Ok(self.snapshot()?.index.len())
    }

    pub fn max_intensity_at(&self, zoom: ZoomLevel) -> HeatmapResult<f64> {
        Ok(self.snapshot()?.max_intensity_at(zoom))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn signal_redraw(&self) {
        if let Some(binding) = self.binding.lock().as_ref() {
            binding.surface.clear_tile_cache(binding.handle);
        }
    }
}
