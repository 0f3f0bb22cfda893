use crate::dates::{AvailableDates, format_iso_date, parse_iso_date};

/// Index-based scrubber state over an [`AvailableDates`] list.
///
/// While dragging, only `pending` moves so the label can follow the thumb;
/// the selected date changes on [`DateScrubber::commit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateScrubber {
    pending: Option<usize>,
}

impl DateScrubber {
    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    /// Index the thumb should show: the drag position, else the current date.
    pub fn active_index(&self, dates: &AvailableDates, current_iso: &str) -> usize {
        self.pending.unwrap_or_else(|| dates.index_of(current_iso))
    }

    pub fn drag(&mut self, dates: &AvailableDates, index: usize) {
        if dates.is_empty() {
            return;
        }
        self.pending = Some(index);
    }

    /// Finish a drag at `index`. Returns the date to select, or `None` when it
    /// equals the current date (or the list is empty).
    pub fn commit(
        &mut self,
        dates: &AvailableDates,
        current_iso: &str,
        index: usize,
    ) -> Option<String> {
        self.pending = None;
        let iso = dates.date_at_clamped(index)?;
        (iso != current_iso).then(|| iso.to_string())
    }
}

/// Label for the value bubble above the slider thumb.
pub fn value_label(dates: &AvailableDates, index: usize) -> String {
    dates
        .as_slice()
        .get(index)
        .and_then(|iso| parse_iso_date(iso))
        .map(format_iso_date)
        .unwrap_or_default()
}
