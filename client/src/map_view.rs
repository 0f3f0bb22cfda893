use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use icewatch_shared::{FeatureCollection, RouteControls, RouteStatus};
use leptos::ev;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent};

use crate::config::{INITIAL_CENTER, INITIAL_ZOOM, map_token};
use crate::date_context::DateContext;
use crate::map_engine::{MapEngine, MapHandle};
use crate::render_loop::RenderScheduler;
use crate::route_overlay::{MapClick, RouteOverlay};
use crate::tiles::{self, TileCache};
use crate::viewport::Viewport;

/// Wheel events closer together than this count as one zoom gesture.
const WHEEL_SETTLE_MS: u32 = 150;
/// Pointer travel below this is a click, not a pan.
const CLICK_SLOP_PX: f64 = 5.0;

fn center_label([lon, lat]: [f64; 2]) -> String {
    format!("📍 {lat:.4}, {lon:.4}")
}

fn touch_distance(t0: &web_sys::Touch, t1: &web_sys::Touch) -> f64 {
    let dx = f64::from(t1.client_x() - t0.client_x());
    let dy = f64::from(t1.client_y() - t0.client_y());
    (dx * dx + dy * dy).sqrt()
}

/// The ice map: basemap, one of the two ice layers, and the route overlay.
///
/// A non-empty `predicted_data` replaces the historical layer while it lasts.
#[component]
pub fn MapView(
    #[prop(into)] predicted_data: Signal<Option<FeatureCollection>>,
    on_route_status_change: Callback<RouteStatus>,
    on_route_controls_change: Callback<RouteControls>,
) -> impl IntoView {
    let Some(token) = map_token() else {
        web_sys::console::error_1(
            &"Map access token is missing; build with ICEWATCH_MAP_TOKEN set".into(),
        );
        return view! { <div style="position: absolute; inset: 0; background: #0c0e17;" /> }
            .into_any();
    };
    let Some(ctx) = use_context::<DateContext>() else {
        web_sys::console::error_1(&"MapView rendered outside DateContext".into());
        return ().into_any();
    };

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let map = MapHandle::new();
    let viewport = RwSignal::new(Viewport::default());
    let is_map_loaded = RwSignal::new(false);
    let center_position = RwSignal::new(None::<[f64; 2]>);
    let clicks = RwSignal::new(None::<MapClick>);

    let centered = Rc::new(Cell::new(false));
    let update_center = move || {
        let Some((w, h)) = map.paint_with(|engine| engine.measure()).flatten() else {
            return;
        };
        let center = viewport.with_untracked(|vp| vp.center_lon_lat(w, h));
        center_position.try_set(Some(center));
    };

    let scheduler = Rc::new(RenderScheduler::new({
        let centered = centered.clone();
        move || {
            let jobs = map
                .paint_with(|engine| {
                    let (w, h) = engine.measure()?;
                    if !centered.replace(true) {
                        let [lon, lat] = INITIAL_CENTER;
                        viewport.update_untracked(|vp| vp.center_on(lon, lat, INITIAL_ZOOM, w, h));
                    }
                    viewport.try_with_untracked(|vp| engine.paint(vp))
                })
                .flatten();
            if let Some(jobs) = jobs {
                if center_position.get_untracked().is_none() {
                    update_center();
                }
                tiles::load_tiles(map, jobs);
            }
            false
        }
    }));

    // Construct the engine once the canvas exists.
    Effect::new({
        let scheduler = scheduler.clone();
        move || {
            let Some(canvas_el) = canvas_ref.get() else {
                return;
            };
            if map.is_attached() {
                return;
            }
            let canvas: &HtmlCanvasElement = &canvas_el;
            let engine = MapEngine::new(canvas.clone(), TileCache::new(token));
            if map.attach(engine) {
                is_map_loaded.set(true);
                scheduler.mark_dirty();
            }
        }
    });

    Effect::new({
        let scheduler = scheduler.clone();
        move || {
            viewport.track();
            map.track();
            scheduler.mark_dirty();
        }
    });

    // Historical layer, suppressed while a prediction is shown.
    Effect::new(move || {
        is_map_loaded.track();
        let prediction_active = predicted_data.with(Option::is_some);
        ctx.data
            .with(|ice| map.update(|engine| engine.sync_historical(ice.as_ref(), prediction_active)));
    });

    Effect::new(move || {
        is_map_loaded.track();
        predicted_data.with(|predicted| map.update(|engine| engine.sync_predicted(predicted.as_ref())));
    });

    let resize_handle = window_event_listener(ev::resize, {
        let scheduler = scheduler.clone();
        move |_| scheduler.mark_dirty()
    });

    on_cleanup(move || {
        resize_handle.remove();
        map.release();
        is_map_loaded.try_set(false);
    });

    // --- Input handlers ---

    let local_point = move |client_x: f64, client_y: f64| {
        canvas_ref
            .get_untracked()
            .map(|el| {
                let rect = el.get_bounding_client_rect();
                (client_x - rect.left(), client_y - rect.top())
            })
            .unwrap_or((client_x, client_y))
    };

    let is_dragging = Rc::new(Cell::new(false));
    let drag_start = Rc::new(Cell::new((0.0f64, 0.0f64)));
    let last_pos = Rc::new(Cell::new((0.0f64, 0.0f64)));
    let pinch_dist = Rc::new(Cell::new(0.0f64));
    let wheel_settle: Rc<RefCell<Option<Timeout>>> = Rc::new(RefCell::new(None));
    let click_seq = Rc::new(Cell::new(0u64));

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let delta = e.delta_y();
        let x = f64::from(e.offset_x());
        let y = f64::from(e.offset_y());
        viewport.update(|vp| vp.zoom_at(delta, x, y));
        // Restarting the timeout drops the previous one.
        *wheel_settle.borrow_mut() = Some(Timeout::new(WHEEL_SETTLE_MS, update_center));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start = drag_start.clone();
        let last_pos = last_pos.clone();
        move |e: PointerEvent| {
            let pos = (f64::from(e.client_x()), f64::from(e.client_y()));
            is_dragging.set(true);
            drag_start.set(pos);
            last_pos.set(pos);

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_pos = last_pos.clone();
        move |e: PointerEvent| {
            if !is_dragging.get() {
                return;
            }
            let (x, y) = (f64::from(e.client_x()), f64::from(e.client_y()));
            let (lx, ly) = last_pos.replace((x, y));
            viewport.update(|vp| vp.pan(x - lx, y - ly));
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            if !is_dragging.replace(false) {
                return;
            }
            update_center();

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    let on_click = {
        let drag_start = drag_start.clone();
        move |e: MouseEvent| {
            let (x, y) = (f64::from(e.client_x()), f64::from(e.client_y()));
            let (sx, sy) = drag_start.get();
            if (x - sx).abs() >= CLICK_SLOP_PX || (y - sy).abs() >= CLICK_SLOP_PX {
                return;
            }
            let (lx, ly) = local_point(x, y);
            let lon_lat = viewport.with_untracked(|vp| vp.screen_to_lon_lat(lx, ly));
            let seq = click_seq.get().wrapping_add(1);
            click_seq.set(seq);
            clicks.set(Some(MapClick { seq, lon_lat }));
        }
    };

    let on_touch_start = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() != 2 {
                return;
            }
            e.prevent_default();
            let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                return;
            };
            pinch_dist.set(touch_distance(&t0, &t1));
        }
    };

    let on_touch_move = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() != 2 {
                return;
            }
            e.prevent_default();
            let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                return;
            };
            let new_dist = touch_distance(&t0, &t1);
            let old_dist = pinch_dist.replace(new_dist);
            if old_dist > 0.0 {
                let (mx, my) = local_point(
                    f64::from(t0.client_x() + t1.client_x()) / 2.0,
                    f64::from(t0.client_y() + t1.client_y()) / 2.0,
                );
                let delta = -(new_dist - old_dist) * 2.0;
                viewport.update(|vp| vp.zoom_at(delta, mx, my));
            }
        }
    };

    let on_touch_end = move |_: web_sys::TouchEvent| {
        if pinch_dist.replace(0.0) > 0.0 {
            update_center();
        }
    };

    view! {
        <div style="position: absolute; inset: 0; overflow: hidden; background: #0c0e17;">
            <div
                style="position: absolute; inset: 0;"
                on:wheel=on_wheel
                on:pointerdown=on_pointer_down
                on:pointermove=on_pointer_move
                on:pointerup=on_pointer_up
                on:click=on_click
                on:touchstart=on_touch_start
                on:touchmove=on_touch_move
                on:touchend=on_touch_end
            >
                <canvas
                    node_ref=canvas_ref
                    style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
                />
            </div>

            <div
                style:display=move || if ctx.loading.get() { "flex" } else { "none" }
                style="position: absolute; inset: 0; align-items: center; justify-content: center; background: rgba(12, 14, 23, 0.45); color: #e2e0d8; font-family: 'JetBrains Mono', monospace; font-size: 0.8rem; pointer-events: none; z-index: 5;"
            >
                "Loading data…"
            </div>

            <div
                style:display=move || if center_position.with(Option::is_some) { "block" } else { "none" }
                style="position: absolute; left: 16px; bottom: 84px; z-index: 5; background: rgba(19, 21, 31, 0.92); border: 1px solid #282c3e; border-radius: 4px; padding: 3px 8px; color: #9a9590; font-family: 'JetBrains Mono', monospace; font-size: 0.65rem; pointer-events: none;"
            >
                {move || center_position.get().map(center_label).unwrap_or_default()}
            </div>

            <RouteOverlay
                map=map
                is_map_loaded=is_map_loaded
                clicks=clicks
                on_status_change=on_route_status_change
                on_controls_change=on_route_controls_change
            />
        </div>
    }
    .into_any()
}
