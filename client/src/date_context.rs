use icewatch_shared::{AvailableDates, FeatureCollection, IceExtentResponse, parse_iso_date};
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::api::{self, FetchError};

/// Selected date, the dates that have data, and the historical layer for the
/// selected date. Provided once at the app root.
#[derive(Clone, Copy)]
pub(crate) struct DateContext {
    pub iso_date: RwSignal<String>,
    pub available_dates: RwSignal<AvailableDates>,
    pub data: RwSignal<Option<FeatureCollection>>,
    pub loading: RwSignal<bool>,
    pub error: RwSignal<Option<String>>,
    fetch_nonce: RwSignal<u64>,
}

impl DateContext {
    pub fn provide() -> Self {
        let ctx = Self {
            iso_date: RwSignal::new(String::new()),
            available_dates: RwSignal::new(AvailableDates::default()),
            data: RwSignal::new(None),
            loading: RwSignal::new(true),
            error: RwSignal::new(None),
            fetch_nonce: RwSignal::new(0),
        };
        provide_context(ctx);

        ctx.load_available_dates();

        Effect::new(move || {
            let iso = ctx.iso_date.get();
            if !iso.is_empty() {
                ctx.fetch_extent(iso);
            }
        });

        ctx
    }

    /// Select `iso` (`YYYY-MM-DD`). Malformed input is ignored.
    pub fn set_date_from_iso(&self, iso: &str) {
        if parse_iso_date(iso).is_none() {
            web_sys::console::warn_1(&format!("ignoring malformed date {iso:?}").into());
            return;
        }
        if self.iso_date.with_untracked(|current| current == iso) {
            return;
        }
        self.iso_date.set(iso.to_string());
    }

    fn load_available_dates(self) {
        spawn_local(async move {
            match api::fetch_available_dates().await {
                Ok(resp) => {
                    let dates = AvailableDates::new(resp.dates);
                    let initial = self
                        .iso_date
                        .with_untracked(|current| initial_date(&dates, current));
                    self.available_dates.set(dates);
                    match initial {
                        Some(iso) => self.iso_date.set(iso),
                        None => self.loading.set(false),
                    }
                }
                Err(e) => {
                    web_sys::console::warn_1(&format!("available dates fetch failed: {e}").into());
                    self.error
                        .set(Some(format!("Could not load available dates ({e})")));
                    self.loading.set(false);
                }
            }
        });
    }

    /// Fetch the historical layer for `iso`. Responses for a date that is no
    /// longer selected are dropped.
    fn fetch_extent(self, iso: String) {
        let nonce = self.fetch_nonce.get_untracked().wrapping_add(1);
        self.fetch_nonce.set(nonce);
        self.loading.set(true);

        spawn_local(async move {
            let result = api::fetch_ice_extent(&iso).await;
            if let Err(e) = &result {
                web_sys::console::warn_1(&format!("ice extent fetch for {iso} failed: {e}").into());
            }
            match settle_extent(self.fetch_nonce.try_get_untracked(), nonce, &iso, result) {
                ExtentUpdate::Stale => return,
                ExtentUpdate::Loaded(fc) => {
                    self.data.set(Some(fc));
                    self.error.set(None);
                }
                ExtentUpdate::Failed(message) => {
                    // The old layer belongs to another date.
                    self.data.set(None);
                    self.error.set(Some(message));
                }
            }
            self.loading.set(false);
        });
    }
}

#[derive(Debug, PartialEq)]
enum ExtentUpdate {
    /// A newer fetch was started, or the context is gone.
    Stale,
    Loaded(FeatureCollection),
    Failed(String),
}

fn settle_extent(
    current_nonce: Option<u64>,
    nonce: u64,
    iso: &str,
    result: Result<IceExtentResponse, FetchError>,
) -> ExtentUpdate {
    if current_nonce != Some(nonce) {
        return ExtentUpdate::Stale;
    }
    match result {
        Ok(resp) => ExtentUpdate::Loaded(resp.feature_collection),
        Err(e) => ExtentUpdate::Failed(format!("No ice data for {iso} ({e})")),
    }
}

/// Date to select once the available set arrives: the latest one, unless the
/// current selection is already a member.
fn initial_date(dates: &AvailableDates, current: &str) -> Option<String> {
    if !current.is_empty() && dates.contains(current) {
        return None;
    }
    dates.last().map(str::to_string)
}
