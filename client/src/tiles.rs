#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::collections::HashMap;

use icewatch_shared::projection::{TILE_SIZE, tile_range};
use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

use crate::config::BASEMAP_STYLE;
use crate::map_engine::MapHandle;
use crate::viewport::Viewport;

/// Basemap images requested at once; the rest wait for a later repaint.
const TILE_CONCURRENCY: usize = 6;
const ONLOAD_HANDLE_KEY: &str = "__icewatchTileOnload";
const ONERROR_HANDLE_KEY: &str = "__icewatchTileOnerror";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TileKey {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    /// Zoom-0 world rectangle `(x1, y1, x2, y2)` of this tile.
    pub fn world_bounds(self) -> (f64, f64, f64, f64) {
        let size = TILE_SIZE / f64::from(1u32 << self.z);
        let x1 = f64::from(self.x) * size;
        let y1 = f64::from(self.y) * size;
        (x1, y1, x1 + size, y1 + size)
    }
}

enum TileSlot {
    Pending,
    Ready(HtmlImageElement),
    Failed,
}

/// Raster basemap tiles keyed by `(z, x, y)`.
///
/// Failed tiles are remembered and never retried for the lifetime of the map.
pub(crate) struct TileCache {
    token: &'static str,
    slots: HashMap<TileKey, TileSlot>,
}

impl TileCache {
    pub fn new(token: &'static str) -> Self {
        Self {
            token,
            slots: HashMap::new(),
        }
    }

    pub fn image(&self, key: TileKey) -> Option<&HtmlImageElement> {
        match self.slots.get(&key) {
            Some(TileSlot::Ready(image)) => Some(image),
            _ => None,
        }
    }

    fn in_flight(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, TileSlot::Pending))
            .count()
    }

    /// Mark up to the free request budget of `wanted` as pending and return
    /// them with their URLs. Known tiles are skipped.
    pub fn claim(
        &mut self,
        wanted: impl IntoIterator<Item = TileKey>,
    ) -> Vec<(TileKey, String)> {
        let budget = TILE_CONCURRENCY.saturating_sub(self.in_flight());
        let mut claimed = Vec::new();
        for key in wanted {
            if claimed.len() >= budget {
                break;
            }
            if self.slots.contains_key(&key) {
                continue;
            }
            self.slots.insert(key, TileSlot::Pending);
            claimed.push((key, tile_url(self.token, key)));
        }
        claimed
    }

    pub fn resolve(&mut self, key: TileKey, image: Option<HtmlImageElement>) {
        let slot = match image {
            Some(image) => TileSlot::Ready(image),
            None => TileSlot::Failed,
        };
        self.slots.insert(key, slot);
    }
}

pub(crate) fn tile_url(token: &str, key: TileKey) -> String {
    format!(
        "https://api.mapbox.com/styles/v1/{BASEMAP_STYLE}/tiles/256/{}/{}/{}@2x?access_token={token}",
        key.z, key.x, key.y
    )
}

/// Tiles covering the canvas at the viewport's tile zoom, nearest to the
/// canvas center first.
pub(crate) fn visible_tiles(vp: &Viewport, width: f64, height: f64) -> Vec<TileKey> {
    let z = vp.tile_zoom();
    let (min, max) = vp.visible_world(width, height);
    let world_edge = TILE_SIZE;
    if max.0 < 0.0 || max.1 < 0.0 || min.0 > world_edge || min.1 > world_edge {
        return Vec::new();
    }
    let (x0, y0, x1, y1) = tile_range(z, min, max);
    let center = vp.screen_to_world(width / 2.0, height / 2.0);

    let mut keys: Vec<TileKey> = (y0..=y1)
        .flat_map(|y| (x0..=x1).map(move |x| TileKey { z, x, y }))
        .collect();
    keys.sort_by(|a, b| {
        distance_sq_to(*a, center)
            .total_cmp(&distance_sq_to(*b, center))
            .then_with(|| (a.y, a.x).cmp(&(b.y, b.x)))
    });
    keys
}

fn distance_sq_to(key: TileKey, (cx, cy): (f64, f64)) -> f64 {
    let (x1, y1, x2, y2) = key.world_bounds();
    let dx = (x1 + x2) * 0.5 - cx;
    let dy = (y1 + y2) * 0.5 - cy;
    dx * dx + dy * dy
}

pub(crate) fn load_tiles(map: MapHandle, jobs: Vec<(TileKey, String)>) {
    for (key, url) in jobs {
        load_tile(map, key, &url);
    }
}

fn load_tile(map: MapHandle, key: TileKey, src: &str) {
    let img = match HtmlImageElement::new() {
        Ok(img) => img,
        Err(_) => {
            map.update(|engine| engine.tiles_mut().resolve(key, None));
            return;
        }
    };

    let img_for_load = img.clone();
    let onload = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_load);
        let img_for_decode = img_for_load.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let _ = JsFuture::from(img_for_decode.decode()).await;
            map.update(|engine| engine.tiles_mut().resolve(key, Some(img_for_decode)));
        });
    });

    let img_for_error = img.clone();
    let onerror = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_error);
        web_sys::console::warn_1(
            &format!("basemap tile {}/{}/{} failed to load", key.z, key.x, key.y).into(),
        );
        map.update(|engine| engine.tiles_mut().resolve(key, None));
    });

    let onload_js = onload.into_js_value();
    let onerror_js = onerror.into_js_value();
    img.set_onload(Some(onload_js.unchecked_ref()));
    img.set_onerror(Some(onerror_js.unchecked_ref()));
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONLOAD_HANDLE_KEY),
        &onload_js,
    );
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONERROR_HANDLE_KEY),
        &onerror_js,
    );
    img.set_src(src);
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}
