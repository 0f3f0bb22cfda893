use std::cell::Cell;

use icewatch_shared::request::RequestGate;
use icewatch_shared::route::{RoutePins, animation_progress};
use icewatch_shared::{RouteControls, RouteStatus};
use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use wasm_bindgen_futures::spawn_local;

use crate::api;
use crate::map_engine::MapHandle;
use crate::render_loop::RenderScheduler;

const ROUTE_ANIMATION_MS: f64 = 4000.0;

thread_local! {
    static NEXT_OWNER: Cell<u64> = const { Cell::new(1) };
}

fn next_owner_id() -> u64 {
    NEXT_OWNER.with(|next| {
        let id = next.get();
        next.set(id.wrapping_add(1));
        id
    })
}

/// A click on the map that was not part of a pan, in map coordinates.
/// `seq` distinguishes two clicks on the same spot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MapClick {
    pub seq: u64,
    pub lon_lat: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClearRequest {
    pub owner: u64,
    pub seq: u64,
}

/// Page-wide channel through which panels ask a route overlay to drop its
/// pins. Only the overlay whose id matches `owner` reacts.
#[derive(Clone, Copy)]
pub(crate) struct RouteClearChannel(pub RwSignal<Option<ClearRequest>>);

impl RouteClearChannel {
    pub fn new() -> Self {
        Self(RwSignal::new(None))
    }

    pub fn request(&self, owner: u64) {
        self.0.update(|slot| {
            let seq = slot.map_or(1, |prev| prev.seq.wrapping_add(1));
            *slot = Some(ClearRequest { owner, seq });
        });
    }
}

fn animate_label(status: RouteStatus) -> &'static str {
    match status {
        RouteStatus::Requesting => "Routing…",
        RouteStatus::Animating => "Animating…",
        RouteStatus::Done => "Replay route",
        RouteStatus::Error => "Retry route",
        RouteStatus::Idle | RouteStatus::Ready => "Animate route",
    }
}

/// Map clicks are ignored while a route is being fetched or drawn.
fn accepts_clicks(status: RouteStatus) -> bool {
    !matches!(status, RouteStatus::Requesting | RouteStatus::Animating)
}

/// Two-pin route simulation drawn on top of the map.
///
/// The overlay only touches the engine's route layer.
#[component]
pub fn RouteOverlay(
    map: MapHandle,
    #[prop(into)] is_map_loaded: Signal<bool>,
    #[prop(into)] clicks: Signal<Option<MapClick>>,
    on_status_change: Callback<RouteStatus>,
    on_controls_change: Callback<RouteControls>,
) -> impl IntoView {
    let owner = next_owner_id();
    let pins = RwSignal::new(RoutePins::default());
    let path = RwSignal::new(Vec::<[f64; 2]>::new());
    let progress = RwSignal::new(0.0_f64);
    let status = RwSignal::new(RouteStatus::Idle);
    let distance_km = RwSignal::new(None::<f64>);
    let gate = StoredValue::new(RequestGate::default());
    let animation: StoredValue<Option<RenderScheduler>, LocalStorage> = StoredValue::new_local(None);

    let stop_animation = move || {
        animation.try_update_value(|slot| slot.take());
    };

    Effect::new(move || {
        let Some(click) = clicks.get() else {
            return;
        };
        if !accepts_clicks(status.get_untracked()) {
            return;
        }
        stop_animation();
        pins.update(|p| p.place(click.lon_lat));
        path.set(Vec::new());
        progress.set(0.0);
        distance_km.set(None);
        let ready = pins.with_untracked(|p| p.endpoints().is_some());
        status.set(if ready {
            RouteStatus::Ready
        } else {
            RouteStatus::Idle
        });
    });

    let clear = move || {
        gate.update_value(RequestGate::cancel);
        stop_animation();
        pins.update(RoutePins::clear);
        path.set(Vec::new());
        progress.set(0.0);
        distance_km.set(None);
        status.set(RouteStatus::Idle);
    };

    if let Some(channel) = use_context::<RouteClearChannel>() {
        Effect::new(move || {
            if channel.0.get().is_some_and(|req| req.owner == owner) {
                clear();
            }
        });
    }

    let start_animation = move || {
        let started = js_sys::Date::now();
        let scheduler = RenderScheduler::new(move || {
            let p = animation_progress(started, js_sys::Date::now(), ROUTE_ANIMATION_MS);
            if progress.try_set(p).is_some() {
                return false;
            }
            if p >= 1.0 {
                status.try_set(RouteStatus::Done);
                return false;
            }
            true
        });
        scheduler.mark_dirty();
        animation.set_value(Some(scheduler));
        status.set(RouteStatus::Animating);
    };

    let animate = move |_| {
        let Some((start, end)) = pins.with_untracked(RoutePins::endpoints) else {
            return;
        };
        if !accepts_clicks(status.get_untracked()) {
            return;
        }
        let Some(ticket) = gate.try_update_value(RequestGate::begin).flatten() else {
            return;
        };
        stop_animation();
        progress.set(0.0);
        status.set(RouteStatus::Requesting);

        spawn_local(async move {
            let result = api::request_route(start, end).await;
            if gate.try_update_value(|g| g.finish(ticket)) != Some(true) {
                return;
            }
            match result {
                Ok(resp) => {
                    distance_km.set(Some(resp.distance_km));
                    path.set(resp.path);
                    start_animation();
                }
                Err(e) => {
                    web_sys::console::warn_1(&format!("route request failed: {e}").into());
                    status.set(RouteStatus::Error);
                }
            }
        });
    };

    // Publish state upward.
    Effect::new(move || {
        let has_markers = pins.with(RoutePins::has_markers);
        on_controls_change.run(RouteControls { has_markers, owner });
    });
    Effect::new(move || on_status_change.run(status.get()));

    // Mirror into the engine's route layer, again once the map attaches.
    Effect::new(move || {
        is_map_loaded.track();
        let current = pins.get();
        path.with(|path| map.update(|engine| engine.set_route(current, path)));
    });
    Effect::new(move || {
        is_map_loaded.track();
        let p = progress.get();
        map.update(|engine| engine.set_route_progress(p));
    });

    on_cleanup(move || {
        gate.try_update_value(RequestGate::cancel);
        animation.try_update_value(|slot| slot.take());
    });

    let can_animate = move || {
        pins.with(|p| p.endpoints().is_some()) && accepts_clicks(status.get())
    };
    let show_button = move || pins.with(|p| p.endpoints().is_some());

    view! {
        <div
            style:display=move || if show_button() { "flex" } else { "none" }
            style="position: absolute; top: 16px; left: 50%; transform: translateX(-50%); z-index: 10; align-items: center; gap: 8px; font-family: 'JetBrains Mono', monospace;"
        >
            <button
                type="button"
                disabled=move || !can_animate()
                style="background: #f5c542; border: none; border-radius: 6px; color: #0c0e17; font-size: 0.72rem; font-weight: 700; padding: 6px 14px; cursor: pointer;"
                on:click=animate
            >
                {move || animate_label(status.get())}
            </button>
            {move || {
                distance_km
                    .get()
                    .map(|km| {
                        view! {
                            <span style="background: rgba(19, 21, 31, 0.92); border: 1px solid #282c3e; border-radius: 4px; padding: 4px 8px; color: #e2e0d8; font-size: 0.65rem;">
                                {format!("{km:.0} km")}
                            </span>
                        }
                    })
            }}
        </div>
    }
}
