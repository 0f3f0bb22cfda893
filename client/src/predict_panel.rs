use icewatch_shared::FeatureCollection;
use icewatch_shared::predict::{
    PredictForm, PredictSession, Settled, THRESHOLD_STEP, parse_number_input,
    prediction_error_message, tomorrow,
};
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::api;
use crate::app::{ToolSection, input_value};

const INPUT_STYLE: &str = "width: 100%; box-sizing: border-box; background: #1a1d2a; border: 1px solid #282c3e; border-radius: 4px; color: #e2e0d8; font-family: 'JetBrains Mono', monospace; font-size: 0.72rem; padding: 4px 6px; outline: none;";
const LABEL_STYLE: &str = "display: block; margin: 6px 0 3px; color: #5a5860; font-size: 0.62rem; text-transform: uppercase; letter-spacing: 0.08em;";

/// Form for a modelled ice extent on a future date.
///
/// Each settled request forwards its result through `on_predicted`: the
/// collection on success, `None` on failure or "Clear".
#[component]
pub fn PredictIcePanel(on_predicted: Callback<Option<FeatureCollection>>) -> impl IntoView {
    let today = chrono::Utc::now().date_naive();
    let min_date = tomorrow(today);
    let form = RwSignal::new(PredictForm::new(today));
    let session = RwSignal::new(PredictSession::default());

    let busy = move || session.with(PredictSession::is_predicting);

    let on_submit = move |e: web_sys::SubmitEvent| {
        e.prevent_default();
        let Some(ticket) = session.try_update(PredictSession::begin).flatten() else {
            return;
        };
        let request = form.get_untracked();
        spawn_local(async move {
            let result = api::predict_ice_extent(&request)
                .await
                .map_err(|e| {
                    web_sys::console::warn_1(&format!("prediction failed: {e}").into());
                    prediction_error_message(e.status())
                });
            let Some(settled) = session.try_update(|s| s.settle(ticket, result)) else {
                return;
            };
            if let Settled::Forward(value) = settled {
                on_predicted.run(value);
            }
        });
    };

    let on_clear = move |_| {
        if busy() {
            return;
        }
        on_predicted.run(None);
    };

    on_cleanup(move || {
        session.try_update(PredictSession::cancel);
    });

    view! {
        <ToolSection title="Predict Ice">
            <form on:submit=on_submit>
                <label style=LABEL_STYLE>"Date"</label>
                <input
                    type="date"
                    min=min_date
                    style=INPUT_STYLE
                    prop:value=move || form.with(|f| f.date.clone())
                    on:input=move |e| {
                        let value = input_value(&e);
                        form.update(|f| f.date = value);
                    }
                />
                <label style=LABEL_STYLE>"Radius (km)"</label>
                <input
                    type="number"
                    min="0"
                    step="1"
                    style=INPUT_STYLE
                    prop:value=move || form.with(|f| f.radius_km.to_string())
                    on:input=move |e| {
                        let value = parse_number_input(&input_value(&e));
                        form.update(|f| f.radius_km = value);
                    }
                />
                <label style=LABEL_STYLE>"Threshold"</label>
                <input
                    type="number"
                    min="0"
                    max="1"
                    step=THRESHOLD_STEP.to_string()
                    style=INPUT_STYLE
                    prop:value=move || form.with(|f| f.threshold.to_string())
                    on:input=move |e| {
                        let value = parse_number_input(&input_value(&e));
                        form.update(|f| f.threshold = value);
                    }
                />
                <div style="display: flex; gap: 6px; margin-top: 10px;">
                    <button
                        type="submit"
                        disabled=busy
                        style="flex: 1; background: #4bd7ff; border: none; border-radius: 4px; color: #0c0e17; font-size: 0.72rem; font-weight: 700; padding: 6px 0; cursor: pointer;"
                    >
                        {move || if busy() { "Predicting…" } else { "Predict" }}
                    </button>
                    <button
                        type="button"
                        disabled=busy
                        style="flex: 1; background: #1a1d2a; border: 1px solid #3a3f5c; border-radius: 4px; color: #e2e0d8; font-size: 0.72rem; padding: 6px 0; cursor: pointer;"
                        on:click=on_clear
                    >
                        "Clear"
                    </button>
                </div>
                {move || {
                    session
                        .with(|s| s.error().map(str::to_string))
                        .map(|error| {
                            view! {
                                <div style="margin-top: 8px; color: #ff6b6b; font-size: 0.7rem;">
                                    {error}
                                </div>
                            }
                        })
                }}
            </form>
        </ToolSection>
    }
}
