use icewatch_shared::route::merge_route_controls;
use icewatch_shared::{FeatureCollection, RouteControls, RouteStatus};
use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crate::chatbot::FloatingChatbot;
use crate::date_context::DateContext;
use crate::map_view::MapView;
use crate::predict_panel::PredictIcePanel;
use crate::route_overlay::RouteClearChannel;
use crate::route_tools::RouteToolsPanel;
use crate::slider::DateSlider;
use crate::stats_panel::RightStatsPanel;

fn set_loading_step(step: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    if let Some(step_el) = document.get_element_by_id("app-loading-step") {
        step_el.set_text_content(Some(step));
    }
}

fn remove_loading_shell() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    if let Some(shell) = document.get_element_by_id("app-loading-shell") {
        shell.remove();
    }
}

/// Current value of the `<input>` that fired `e`, or empty.
pub(crate) fn input_value(e: &web_sys::Event) -> String {
    e.target()
        .and_then(|target| target.dyn_into::<web_sys::HtmlInputElement>().ok())
        .map(|input| input.value())
        .unwrap_or_default()
}

/// Collapsible card used by the left tool stack.
#[component]
pub(crate) fn ToolSection(
    title: &'static str,
    #[prop(optional)] open: bool,
    children: Children,
) -> impl IntoView {
    let is_open = RwSignal::new(open);

    view! {
        <section style="background: rgba(19, 21, 31, 0.92); border: 1px solid #282c3e; border-radius: 8px; overflow: hidden;">
            <button
                type="button"
                aria-expanded=move || is_open.get().to_string()
                style="width: 100%; display: flex; justify-content: space-between; align-items: center; background: none; border: none; padding: 9px 12px; color: #e2e0d8; font-family: 'JetBrains Mono', monospace; font-size: 0.7rem; text-transform: uppercase; letter-spacing: 0.1em; cursor: pointer;"
                on:click=move |_| is_open.update(|v| *v = !*v)
            >
                {title}
                <span style="color: #5a5860;">{move || if is_open.get() { "−" } else { "+" }}</span>
            </button>
            <div
                style:display=move || if is_open.get() { "block" } else { "none" }
                style="padding: 0 12px 12px;"
            >
                {children()}
            </div>
        </section>
    }
}

/// Root component. Provides the date context and mounts the page.
#[component]
pub fn App() -> impl IntoView {
    set_loading_step("Fetching available dates");
    let ctx = DateContext::provide();

    Effect::new(move || {
        if !ctx.loading.get() || ctx.available_dates.with(|d| !d.is_empty()) {
            remove_loading_shell();
        }
    });

    view! { <HomePage /> }
}

/// Composition root: owns route state and the active prediction, and threads
/// them between the map and the panels.
#[component]
pub fn HomePage() -> impl IntoView {
    let route_status = RwSignal::new(RouteStatus::Idle);
    let route_controls = RwSignal::new(RouteControls::default());
    let predicted_data = RwSignal::new(None::<FeatureCollection>);
    provide_context(RouteClearChannel::new());

    let handle_route_status_change = Callback::new(move |status: RouteStatus| {
        if route_status.get_untracked() != status {
            route_status.set(status);
        }
    });
    let handle_route_controls_change = Callback::new(move |next: RouteControls| {
        route_controls.maybe_update(|current| merge_route_controls(current, next));
    });
    let handle_predicted = Callback::new(move |value: Option<FeatureCollection>| {
        predicted_data.set(value);
    });

    view! {
        <main style="position: relative; width: 100vw; height: 100vh; overflow: hidden; background: #0c0e17; color: #e2e0d8;">
            <MapView
                predicted_data=predicted_data
                on_route_status_change=handle_route_status_change
                on_route_controls_change=handle_route_controls_change
            />
            <div style="position: absolute; top: 16px; left: 16px; z-index: 10; width: 240px; display: flex; flex-direction: column; gap: 10px;">
                <RouteToolsPanel route_status=route_status route_controls=route_controls />
                <PredictIcePanel on_predicted=handle_predicted />
            </div>
            <RightStatsPanel predicted_data=predicted_data />
            <DateSlider />
            <FloatingChatbot />
        </main>
    }
}
