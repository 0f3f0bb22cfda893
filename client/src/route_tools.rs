use icewatch_shared::route::{clear_disabled, route_status_label};
use icewatch_shared::{RouteControls, RouteStatus};
use leptos::prelude::*;

use crate::app::ToolSection;
use crate::route_overlay::RouteClearChannel;

/// Route status and the "Clear pins" action. Pure view over state owned by
/// the page; clearing goes through the overlay's clear channel.
#[component]
pub fn RouteToolsPanel(
    #[prop(into)] route_status: Signal<RouteStatus>,
    #[prop(into)] route_controls: Signal<RouteControls>,
) -> impl IntoView {
    let channel = use_context::<RouteClearChannel>();

    let label = move || route_status_label(route_status.get(), &route_controls.get());
    let disabled = move || clear_disabled(route_status.get(), &route_controls.get());
    let on_clear = move |_| {
        let Some(channel) = channel else {
            return;
        };
        channel.request(route_controls.get_untracked().owner);
    };

    view! {
        <ToolSection title="Route Tools" open=true>
            <p style="margin: 0 0 8px; color: #9a9590; font-size: 0.72rem; line-height: 1.4;">
                {label}
            </p>
            <button
                type="button"
                disabled=disabled
                style="width: 100%; background: #1a1d2a; border: 1px solid #3a3f5c; border-radius: 4px; color: #e2e0d8; font-size: 0.72rem; padding: 6px 0; cursor: pointer;"
                on:click=on_clear
            >
                "Clear pins"
            </button>
        </ToolSection>
    }
}
