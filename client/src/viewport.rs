use icewatch_shared::projection::{lon_lat_to_world, world_to_lon_lat, wrap_lon};

use crate::config::{INITIAL_ZOOM, MAX_ZOOM};

/// Pan/zoom transform from zoom-0 Web Mercator world pixels to screen pixels.
///
/// `scale` is `2^zoom`: at zoom 0 the whole world is one 256px tile.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

const MIN_SCALE: f64 = 1.0;
const ZOOM_SENSITIVITY: f64 = 0.001;

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: INITIAL_ZOOM.exp2(),
        }
    }
}

fn max_scale() -> f64 {
    MAX_ZOOM.exp2()
}

impl Viewport {
    pub fn zoom(&self) -> f64 {
        self.scale.log2()
    }

    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (
            wx * self.scale + self.offset_x,
            wy * self.scale + self.offset_y,
        )
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.offset_x) / self.scale,
            (sy - self.offset_y) / self.scale,
        )
    }

    pub fn lon_lat_to_screen(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (wx, wy) = lon_lat_to_world(lon, lat);
        self.world_to_screen(wx, wy)
    }

    pub fn screen_to_lon_lat(&self, sx: f64, sy: f64) -> [f64; 2] {
        let (wx, wy) = self.screen_to_world(sx, sy);
        let [lon, lat] = world_to_lon_lat(wx, wy);
        [wrap_lon(lon), lat]
    }

    /// Zoom toward a focus point (screen coordinates).
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        let factor = (-delta * ZOOM_SENSITIVITY).exp();
        let new_scale = (self.scale * factor).clamp(MIN_SCALE, max_scale());
        let ratio = new_scale / self.scale;

        // Keep the point under the cursor fixed.
        self.offset_x = screen_x - (screen_x - self.offset_x) * ratio;
        self.offset_y = screen_y - (screen_y - self.offset_y) * ratio;
        self.scale = new_scale;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Put `[lon, lat]` in the middle of a `width` x `height` canvas.
    pub fn center_on(&mut self, lon: f64, lat: f64, zoom: f64, width: f64, height: f64) {
        self.scale = zoom.exp2().clamp(MIN_SCALE, max_scale());
        let (wx, wy) = lon_lat_to_world(lon, lat);
        self.offset_x = width / 2.0 - wx * self.scale;
        self.offset_y = height / 2.0 - wy * self.scale;
    }

    pub fn center_lon_lat(&self, width: f64, height: f64) -> [f64; 2] {
        self.screen_to_lon_lat(width / 2.0, height / 2.0)
    }

    /// Integer zoom whose raster tiles best match the current scale.
    pub fn tile_zoom(&self) -> u32 {
        self.zoom().round().clamp(0.0, MAX_ZOOM) as u32
    }

    /// World-pixel rectangle covered by a `width` x `height` canvas.
    pub fn visible_world(&self, width: f64, height: f64) -> ((f64, f64), (f64, f64)) {
        (self.screen_to_world(0.0, 0.0), self.screen_to_world(width, height))
    }
}
