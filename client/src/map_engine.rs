use std::f64::consts::TAU;

use icewatch_shared::FeatureCollection;
use icewatch_shared::layers::{IceOverlays, LayerStack};
use icewatch_shared::projection::wrap_lon;
use icewatch_shared::route::{RoutePins, point_along};
use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::colors::circle_fill;
use crate::tiles::{TileCache, TileKey, visible_tiles};
use crate::viewport::Viewport;

const BACKGROUND: &str = "#0c0e17";
const ROUTE_TRAIL: &str = "rgba(226, 224, 216, 0.35)";
const ROUTE_PROGRESS: &str = "#f5c542";
const START_PIN: &str = "#4bff9a";
const END_PIN: &str = "#ff9f43";

/// What the route overlay asks the map to draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RouteLayer {
    pub pins: RoutePins,
    pub path: Vec<[f64; 2]>,
    pub progress: f64,
}

/// Canvas map: raster basemap, the two ice point layers and the route layer.
///
/// Owned by one map view; the route overlay only touches [`RouteLayer`].
pub(crate) struct MapEngine {
    canvas: HtmlCanvasElement,
    ctx: Option<CanvasRenderingContext2d>,
    layers: LayerStack,
    overlays: IceOverlays,
    route: RouteLayer,
    tiles: TileCache,
}

impl MapEngine {
    pub fn new(canvas: HtmlCanvasElement, tiles: TileCache) -> Self {
        Self {
            canvas,
            ctx: None,
            layers: LayerStack::default(),
            overlays: IceOverlays::default(),
            route: RouteLayer::default(),
            tiles,
        }
    }

    pub fn sync_historical(&mut self, ice: Option<&FeatureCollection>, prediction_active: bool) {
        self.overlays
            .sync_historical(&mut self.layers, ice, prediction_active);
    }

    pub fn sync_predicted(&mut self, predicted: Option<&FeatureCollection>) {
        self.overlays.sync_predicted(&mut self.layers, predicted);
    }

    /// Replace pins and path. A new path restarts from zero progress.
    pub fn set_route(&mut self, pins: RoutePins, path: &[[f64; 2]]) {
        if self.route.path != path {
            self.route.path = path.to_vec();
            self.route.progress = 0.0;
        }
        self.route.pins = pins;
    }

    pub fn set_route_progress(&mut self, progress: f64) {
        self.route.progress = progress.clamp(0.0, 1.0);
    }

    pub fn tiles_mut(&mut self) -> &mut TileCache {
        &mut self.tiles
    }

    /// CSS size of the map container, once laid out.
    pub fn measure(&self) -> Option<(f64, f64)> {
        let parent = self.canvas.parent_element()?;
        let (w, h) = (parent.client_width(), parent.client_height());
        (w > 0 && h > 0).then(|| (f64::from(w), f64::from(h)))
    }

    fn context(&mut self, dpr: f64) -> Option<CanvasRenderingContext2d> {
        if self.ctx.is_none() {
            let ctx = self
                .canvas
                .get_context("2d")
                .ok()
                .flatten()
                .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())?;
            // Draw in CSS pixels.
            ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();
            self.ctx = Some(ctx);
        }
        self.ctx.clone()
    }

    /// Draw one frame. Returns basemap tiles that still need fetching.
    pub fn paint(&mut self, vp: &Viewport) -> Vec<(TileKey, String)> {
        let Some((w, h)) = self.measure() else {
            return Vec::new();
        };
        let dpr = web_sys::window()
            .map(|window| window.device_pixel_ratio())
            .unwrap_or(1.0)
            .max(1.0);
        let pw = (w * dpr).round() as u32;
        let ph = (h * dpr).round() as u32;
        if self.canvas.width() != pw || self.canvas.height() != ph {
            self.canvas.set_width(pw);
            self.canvas.set_height(ph);
            // Resizing resets the 2D context state.
            self.ctx = None;
        }
        let Some(ctx) = self.context(dpr) else {
            return Vec::new();
        };

        ctx.set_fill_style_str(BACKGROUND);
        ctx.fill_rect(0.0, 0.0, w, h);

        let wanted = visible_tiles(vp, w, h);
        self.draw_tiles(&ctx, vp, &wanted, w, h);
        self.draw_circle_layers(&ctx, vp, w, h);
        self.draw_route(&ctx, vp);

        self.tiles.claim(wanted)
    }

    fn draw_tiles(
        &self,
        ctx: &CanvasRenderingContext2d,
        vp: &Viewport,
        keys: &[TileKey],
        w: f64,
        h: f64,
    ) {
        for &key in keys {
            let Some(image) = self.tiles.image(key) else {
                continue;
            };
            let (x1, y1, x2, y2) = key.world_bounds();
            let (sx, sy) = vp.world_to_screen(x1, y1);
            let (ex, ey) = vp.world_to_screen(x2, y2);
            // Floor/ceil so neighbouring tiles overlap instead of seaming.
            let sx = sx.floor();
            let sy = sy.floor();
            let sw = ex.ceil() - sx;
            let sh = ey.ceil() - sy;
            if sx + sw < 0.0 || sy + sh < 0.0 || sx > w || sy > h {
                continue;
            }
            ctx.draw_image_with_html_image_element_and_dw_and_dh(image, sx, sy, sw, sh)
                .ok();
        }
    }

    fn draw_circle_layers(&self, ctx: &CanvasRenderingContext2d, vp: &Viewport, w: f64, h: f64) {
        for (layer, positions) in self.layers.drawable() {
            let radius = layer.style.radius;
            ctx.set_fill_style_str(&circle_fill(&layer.style));
            ctx.begin_path();
            for &[lon, lat] in positions {
                let (sx, sy) = vp.lon_lat_to_screen(lon, lat);
                if sx < -radius || sy < -radius || sx > w + radius || sy > h + radius {
                    continue;
                }
                ctx.move_to(sx + radius, sy);
                ctx.arc(sx, sy, radius, 0.0, TAU).ok();
            }
            ctx.fill();
        }
    }

    fn draw_route(&self, ctx: &CanvasRenderingContext2d, vp: &Viewport) {
        let RouteLayer {
            pins,
            path,
            progress,
        } = &self.route;

        if path.len() >= 2 {
            ctx.set_line_width(2.0);
            ctx.set_stroke_style_str(ROUTE_TRAIL);
            let dash = js_sys::Array::of2(&JsValue::from_f64(6.0), &JsValue::from_f64(4.0));
            ctx.set_line_dash(&dash).ok();
            trace_polyline(ctx, vp, path);
            ctx.stroke();
            ctx.set_line_dash(&js_sys::Array::new()).ok();

            if *progress > 0.0 {
                let travelled = travelled_prefix(path, *progress);
                ctx.set_line_width(3.0);
                ctx.set_stroke_style_str(ROUTE_PROGRESS);
                trace_polyline(ctx, vp, &travelled);
                ctx.stroke();
                if let Some(&[lon, lat]) = travelled.last() {
                    fill_dot(ctx, vp, [lon, lat], 5.0, ROUTE_PROGRESS);
                }
            }
        }

        if let Some(start) = pins.start() {
            fill_dot(ctx, vp, start, 6.0, START_PIN);
        }
        if let Some(end) = pins.end() {
            fill_dot(ctx, vp, end, 6.0, END_PIN);
        }
    }
}

fn trace_polyline(ctx: &CanvasRenderingContext2d, vp: &Viewport, path: &[[f64; 2]]) {
    ctx.begin_path();
    let mut prev_lon: Option<f64> = None;
    for &[lon, lat] in path {
        // Unwrap across the antimeridian so the line does not span the world.
        let lon = prev_lon.map_or(lon, |prev| prev + wrap_lon(lon - prev));
        let (sx, sy) = vp.lon_lat_to_screen(lon, lat);
        if prev_lon.is_none() {
            ctx.move_to(sx, sy);
        } else {
            ctx.line_to(sx, sy);
        }
        prev_lon = Some(lon);
    }
}

fn fill_dot(ctx: &CanvasRenderingContext2d, vp: &Viewport, [lon, lat]: [f64; 2], r: f64, color: &str) {
    let (sx, sy) = vp.lon_lat_to_screen(lon, lat);
    ctx.set_fill_style_str(color);
    ctx.begin_path();
    ctx.arc(sx, sy, r, 0.0, TAU).ok();
    ctx.fill();
}

/// Vertices covered at `progress`, ending at the interpolated head.
fn travelled_prefix(path: &[[f64; 2]], progress: f64) -> Vec<[f64; 2]> {
    let Some(head) = point_along(path, progress) else {
        return Vec::new();
    };
    let whole = (progress.clamp(0.0, 1.0) * (path.len().saturating_sub(1)) as f64).floor() as usize;
    let mut prefix: Vec<[f64; 2]> = path.iter().take(whole + 1).copied().collect();
    if prefix.last() != Some(&head) {
        prefix.push(head);
    }
    prefix
}

/// Shared handle to the map engine. Copyable into effects, callbacks and
/// async tasks; empty before the canvas mounts and after teardown.
#[derive(Clone, Copy)]
pub(crate) struct MapHandle {
    engine: StoredValue<Option<MapEngine>, LocalStorage>,
    revision: RwSignal<u64>,
}

impl MapHandle {
    pub fn new() -> Self {
        Self {
            engine: StoredValue::new_local(None),
            revision: RwSignal::new(0),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.engine
            .try_with_value(Option::is_some)
            .unwrap_or(false)
    }

    /// Install `engine` unless one is already attached.
    pub fn attach(&self, engine: MapEngine) -> bool {
        self.engine
            .try_update_value(|slot| {
                if slot.is_some() {
                    return false;
                }
                *slot = Some(engine);
                true
            })
            .unwrap_or(false)
    }

    pub fn release(&self) {
        self.engine.try_update_value(|slot| slot.take());
    }

    /// Subscribe the current reactive scope to engine changes.
    pub fn track(&self) {
        self.revision.track();
    }

    /// Mutate the engine and schedule a repaint.
    pub fn update<R>(&self, f: impl FnOnce(&mut MapEngine) -> R) -> Option<R> {
        let result = self
            .engine
            .try_update_value(|slot| slot.as_mut().map(f))
            .flatten();
        if result.is_some() {
            self.revision.try_update(|n| *n = n.wrapping_add(1));
        }
        result
    }

    /// Engine access from the render loop itself; does not request a repaint.
    pub fn paint_with<R>(&self, f: impl FnOnce(&mut MapEngine) -> R) -> Option<R> {
        self.engine
            .try_update_value(|slot| slot.as_mut().map(f))
            .flatten()
    }
}
