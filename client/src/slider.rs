use icewatch_shared::slider::{DateScrubber, value_label};
use leptos::prelude::*;

use crate::app::input_value;
use crate::calendar::Calendar;
use crate::date_context::DateContext;

fn parse_index(raw: &str) -> usize {
    raw.trim().parse().unwrap_or(0)
}

/// Bottom bar: a range input over the available dates plus the calendar.
///
/// The selected date only changes on release; while dragging just the value
/// bubble follows the thumb.
#[component]
pub fn DateSlider() -> impl IntoView {
    let Some(ctx) = use_context::<DateContext>() else {
        web_sys::console::error_1(&"DateSlider rendered outside DateContext".into());
        return ().into_any();
    };
    let scrubber = RwSignal::new(DateScrubber::default());

    let active_index = Memo::new(move |_| {
        let current = ctx.iso_date.get();
        let pending = scrubber.get();
        ctx.available_dates
            .with(|dates| pending.active_index(dates, &current))
    });
    let is_empty = move || ctx.available_dates.with(|d| d.is_empty());
    let max_index = move || ctx.available_dates.with(|d| d.max_index());
    let label = move || ctx.available_dates.with(|d| value_label(d, active_index.get()));
    let years = move || ctx.available_dates.with(|d| d.year_labels());

    // Bubble position as a fraction of the track.
    let bubble_left = move || {
        let max = max_index();
        let pct = if max == 0 {
            0.0
        } else {
            active_index.get() as f64 / max as f64 * 100.0
        };
        format!("{pct:.2}%")
    };

    let on_input = move |e: web_sys::Event| {
        let index = parse_index(&input_value(&e));
        ctx.available_dates
            .with_untracked(|dates| scrubber.update(|s| s.drag(dates, index)));
    };

    let on_change = move |e: web_sys::Event| {
        let index = parse_index(&input_value(&e));
        let current = ctx.iso_date.get_untracked();
        let next = ctx.available_dates.with_untracked(|dates| {
            let mut committed = None;
            scrubber.update(|s| committed = s.commit(dates, &current, index));
            committed
        });
        if let Some(iso) = next {
            ctx.set_date_from_iso(&iso);
        }
    };

    view! {
        <div style="position: absolute; left: 16px; right: 16px; bottom: 16px; z-index: 10; display: flex; align-items: center; gap: 10px; background: rgba(19, 21, 31, 0.92); border: 1px solid #282c3e; border-radius: 8px; padding: 10px 14px; font-family: 'JetBrains Mono', monospace;">
            <span style="color: #5a5860; flex-shrink: 0; font-size: 0.65rem;">
                {move || years().0}
            </span>
            <div style="position: relative; flex: 1; min-width: 0;">
                <span
                    style:left=bubble_left
                    style:display=move || if is_empty() { "none" } else { "block" }
                    style="position: absolute; bottom: 22px; transform: translateX(-50%); background: #1a1d2a; border: 1px solid #3a3f5c; border-radius: 4px; padding: 2px 6px; color: #e2e0d8; font-size: 0.65rem; white-space: nowrap; pointer-events: none;"
                >
                    {label}
                </span>
                <input
                    type="range"
                    aria-label="Date"
                    style="width: 100%;"
                    min="0"
                    max=move || max_index().to_string()
                    step="1"
                    prop:value=move || active_index.get().to_string()
                    disabled=is_empty
                    on:input=on_input
                    on:change=on_change
                />
            </div>
            <span style="color: #5a5860; flex-shrink: 0; font-size: 0.65rem;">
                {move || years().1}
            </span>
            <Calendar />
        </div>
    }
    .into_any()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_index_reads_as_zero() {
        assert_eq!(parse_index("7"), 7);
        assert_eq!(parse_index(" 3 "), 3);
        assert_eq!(parse_index(""), 0);
        assert_eq!(parse_index("-1"), 0);
    }
}
