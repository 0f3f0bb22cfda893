use chrono::{Datelike, NaiveDate};
use icewatch_shared::calendar::{
    CalendarRules, StagedSelection, first_of_month, month_grid, shift_month,
};
use icewatch_shared::parse_iso_date;
use leptos::prelude::*;

use crate::date_context::DateContext;

const WEEKDAYS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

/// Where a calendar reads its date and sends the chosen one.
///
/// Built from explicit props when given, else from [`DateContext`]; with
/// neither, the calendar is standalone and nothing is disabled.
#[derive(Clone, Copy)]
pub(crate) struct DateBinding {
    pub iso_date: Signal<String>,
    pub available_dates: Signal<Option<Vec<String>>>,
    pub on_change: Option<Callback<String>>,
}

impl DateBinding {
    pub fn resolve(
        value: Option<Signal<String>>,
        on_change: Option<Callback<String>>,
        available_dates: Option<Signal<Vec<String>>>,
        context: Option<DateContext>,
    ) -> Self {
        let iso_date = match (value, context) {
            (Some(value), _) => value,
            (None, Some(ctx)) => ctx.iso_date.into(),
            (None, None) => Signal::derive(String::new),
        };
        let available_dates = match (available_dates, context) {
            (Some(list), _) => Signal::derive(move || Some(list.get())),
            (None, Some(ctx)) => {
                Signal::derive(move || Some(ctx.available_dates.with(|d| d.as_slice().to_vec())))
            }
            (None, None) => Signal::derive(|| None),
        };
        let on_change = on_change.or_else(|| {
            context.map(|ctx| Callback::new(move |iso: String| ctx.set_date_from_iso(&iso)))
        });
        Self {
            iso_date,
            available_dates,
            on_change,
        }
    }
}

fn month_title(month_start: NaiveDate) -> String {
    month_start.format("%B %Y").to_string()
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Popover date picker. Stages a day locally and commits it on "Go".
#[component]
pub fn Calendar(
    #[prop(optional, into)] value: Option<Signal<String>>,
    #[prop(optional)] on_change: Option<Callback<String>>,
    #[prop(optional, into)] prop_min_date: Option<String>,
    #[prop(optional, into)] available_dates: Option<Signal<Vec<String>>>,
) -> impl IntoView {
    let binding = DateBinding::resolve(
        value,
        on_change,
        available_dates,
        use_context::<DateContext>(),
    );

    let is_open = RwSignal::new(false);
    let staged = RwSignal::new(StagedSelection::default());
    let visible_month = RwSignal::new(first_of_month(today()));

    let rules = Signal::derive(move || {
        binding
            .available_dates
            .with(|list| CalendarRules::new(list.as_deref(), prop_min_date.as_deref()))
    });
    let has_dates = move || {
        binding
            .available_dates
            .with(|list| list.as_ref().is_some_and(|l| !l.is_empty()))
    };

    // Follow the externally selected date.
    Effect::new(move || {
        let iso = binding.iso_date.get();
        staged.update(|s| s.sync_external(&iso));
        if let Some(date) = parse_iso_date(&iso) {
            visible_month.set(first_of_month(date));
        }
    });

    let go = move |_| {
        let Some(iso) = staged.with_untracked(StagedSelection::commit) else {
            return;
        };
        if let Some(on_change) = binding.on_change {
            on_change.run(iso);
        }
        is_open.set(false);
    };

    let grid = move || {
        let rules = rules.get();
        let selected = staged.with(StagedSelection::staged);
        month_grid(visible_month.get())
            .into_iter()
            .map(|day| {
                let date = day.date;
                let selectable = rules.is_selectable(date);
                let is_selected = selected == Some(date);
                let color = if is_selected {
                    "#0c0e17"
                } else if !selectable {
                    "#3a3f5c"
                } else if day.in_month {
                    "#e2e0d8"
                } else {
                    "#5a5860"
                };
                let background = if is_selected { "#4bd7ff" } else { "transparent" };
                view! {
                    <button
                        type="button"
                        disabled=!selectable
                        style:color=color
                        style:background=background
                        style="border: none; border-radius: 4px; padding: 4px 0; font-size: 0.7rem; cursor: pointer; font-variant-numeric: tabular-nums;"
                        on:click=move |_| staged.update(|s| s.stage(date))
                    >
                        {date.day()}
                    </button>
                }
            })
            .collect::<Vec<_>>()
    };

    view! {
        <div style="position: relative; flex-shrink: 0;">
            <button
                type="button"
                aria-label="Open date picker"
                disabled=move || !has_dates()
                style="background: #1a1d2a; border: 1px solid #282c3e; border-radius: 6px; color: #e2e0d8; padding: 6px 10px; cursor: pointer;"
                on:click=move |_| is_open.update(|open| *open = !*open)
            >
                "📅"
            </button>
            <div
                style:display=move || if is_open.get() { "block" } else { "none" }
                style="position: absolute; bottom: 44px; right: 0; width: 240px; background: #13151f; border: 1px solid #282c3e; border-radius: 8px; padding: 10px; box-shadow: 0 8px 24px rgba(0, 0, 0, 0.45); z-index: 20;"
            >
                <div style="display: flex; align-items: center; justify-content: space-between; margin-bottom: 8px;">
                    <button
                        type="button"
                        aria-label="Previous month"
                        disabled=move || !rules.with(|r| r.can_go_to_previous_month(visible_month.get()))
                        style="background: none; border: none; color: #9a9590; cursor: pointer;"
                        on:click=move |_| visible_month.update(|m| *m = shift_month(*m, false))
                    >
                        "‹"
                    </button>
                    <span style="font-size: 0.75rem; color: #e2e0d8;">
                        {move || month_title(visible_month.get())}
                    </span>
                    <button
                        type="button"
                        aria-label="Next month"
                        disabled=move || !rules.with(|r| r.can_go_to_next_month(visible_month.get()))
                        style="background: none; border: none; color: #9a9590; cursor: pointer;"
                        on:click=move |_| visible_month.update(|m| *m = shift_month(*m, true))
                    >
                        "›"
                    </button>
                </div>
                <div style="display: grid; grid-template-columns: repeat(7, 1fr); gap: 2px; text-align: center;">
                    {WEEKDAYS
                        .iter()
                        .map(|d| view! { <span style="font-size: 0.62rem; color: #5a5860;">{*d}</span> })
                        .collect::<Vec<_>>()}
                    {grid}
                </div>
                <button
                    type="button"
                    disabled=move || staged.with(|s| s.staged().is_none())
                    style="margin-top: 8px; width: 100%; background: #4bd7ff; border: none; border-radius: 4px; color: #0c0e17; font-weight: 700; padding: 6px 0; cursor: pointer;"
                    on:click=go
                >
                    "Go"
                </button>
            </div>
        </div>
    }
}
