use icewatch_shared::{AvailableDates, FeatureCollection};
use leptos::prelude::*;

use crate::date_context::DateContext;

/// What the right-hand panel shows for the layer currently on the map.
#[derive(Debug, Clone, PartialEq)]
struct LayerSummary {
    layer: &'static str,
    points: usize,
    mean_probability: Option<f64>,
}

/// The predicted layer wins whenever it is present, mirroring the map.
fn summarize(
    historical: Option<&FeatureCollection>,
    predicted: Option<&FeatureCollection>,
) -> Option<LayerSummary> {
    let (layer, fc) = match (predicted, historical) {
        (Some(fc), _) => ("Predicted", fc),
        (None, Some(fc)) => ("Historical", fc),
        (None, None) => return None,
    };
    Some(LayerSummary {
        layer,
        points: fc.positions().count(),
        mean_probability: fc.mean_property("pred_prob"),
    })
}

fn date_range(dates: &AvailableDates) -> Option<String> {
    Some(format!("{} → {}", dates.first()?, dates.last()?))
}

fn stat_row(label: &'static str, value: String) -> impl IntoView {
    view! {
        <div style="display: flex; justify-content: space-between; gap: 12px; padding: 3px 0;">
            <span style="color: #5a5860;">{label}</span>
            <span style="color: #e2e0d8; font-variant-numeric: tabular-nums;">{value}</span>
        </div>
    }
}

#[component]
pub fn RightStatsPanel(#[prop(into)] predicted_data: Signal<Option<FeatureCollection>>) -> impl IntoView {
    let Some(ctx) = use_context::<DateContext>() else {
        return ().into_any();
    };

    let summary = Memo::new(move |_| {
        predicted_data.with(|predicted| ctx.data.with(|ice| summarize(ice.as_ref(), predicted.as_ref())))
    });

    view! {
        <div style="position: absolute; top: 16px; right: 16px; z-index: 10; width: 220px; background: rgba(19, 21, 31, 0.92); border: 1px solid #282c3e; border-radius: 8px; padding: 10px 12px; font-family: 'JetBrains Mono', monospace; font-size: 0.68rem;">
            <div style="margin-bottom: 6px; color: #9a9590; font-size: 0.62rem; text-transform: uppercase; letter-spacing: 0.12em;">
                "Ice Stats"
            </div>
            {move || stat_row("Date", ctx.iso_date.get())}
            {move || {
                summary
                    .get()
                    .map(|s| {
                        view! {
                            {stat_row("Layer", s.layer.to_string())}
                            {stat_row("Points", s.points.to_string())}
                            {s
                                .mean_probability
                                .map(|p| stat_row("Mean prob.", format!("{p:.2}")))}
                        }
                    })
            }}
            {move || {
                ctx.available_dates
                    .with(|dates| date_range(dates).map(|range| stat_row("Range", range)))
            }}
            {move || {
                ctx.error
                    .get()
                    .map(|error| view! { <div style="margin-top: 6px; color: #ff6b6b;">{error}</div> })
            }}
        </div>
    }
    .into_any()
}
