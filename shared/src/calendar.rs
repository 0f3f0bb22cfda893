use std::collections::HashSet;

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::dates::{format_iso_date, parse_iso_date};

/// Weeks shown by the month grid regardless of month length.
pub const GRID_WEEKS: usize = 6;

/// Which days a date picker may select.
///
/// Without an available-dates list (standalone mode) nothing is disabled and
/// the lower bound comes from an optional fallback minimum.
#[derive(Debug, Clone, Default)]
pub struct CalendarRules {
    available: Option<HashSet<String>>,
    min: Option<NaiveDate>,
    max: Option<NaiveDate>,
}

impl CalendarRules {
    pub fn new(available: Option<&[String]>, fallback_min: Option<&str>) -> Self {
        match available {
            Some(list) if !list.is_empty() => {
                let min = list.iter().min().and_then(|d| parse_iso_date(d));
                let max = list.iter().max().and_then(|d| parse_iso_date(d));
                Self {
                    available: Some(list.iter().cloned().collect()),
                    min,
                    max,
                }
            }
            _ => Self {
                available: None,
                min: fallback_min.and_then(parse_iso_date),
                max: None,
            },
        }
    }

    pub fn min_date(&self) -> Option<NaiveDate> {
        self.min
    }

    pub fn max_date(&self) -> Option<NaiveDate> {
        self.max
    }

    pub fn should_disable_date(&self, date: NaiveDate) -> bool {
        match &self.available {
            None => false,
            Some(set) => !set.contains(&format_iso_date(date)),
        }
    }

    /// Whether a day is outside bounds or disabled.
    pub fn is_selectable(&self, date: NaiveDate) -> bool {
        let above_min = self.min.is_none_or(|min| date >= min);
        let below_max = self.max.is_none_or(|max| date <= max);
        above_min && below_max && !self.should_disable_date(date)
    }

    pub fn can_go_to_previous_month(&self, month_start: NaiveDate) -> bool {
        self.min
            .is_none_or(|min| first_of_month(min) < first_of_month(month_start))
    }

    pub fn can_go_to_next_month(&self, month_start: NaiveDate) -> bool {
        self.max
            .is_none_or(|max| first_of_month(max) > first_of_month(month_start))
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn shift_month(month_start: NaiveDate, forward: bool) -> NaiveDate {
    let start = first_of_month(month_start);
    let shifted = if forward {
        start.checked_add_months(Months::new(1))
    } else {
        start.checked_sub_months(Months::new(1))
    };
    shifted.unwrap_or(start)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDay {
    pub date: NaiveDate,
    pub in_month: bool,
}

/// Fixed six-week grid (Sunday first) covering the month of `month_start`,
/// padded with days of the neighbouring months.
pub fn month_grid(month_start: NaiveDate) -> Vec<GridDay> {
    let start = first_of_month(month_start);
    let lead = u64::from(start.weekday().num_days_from_sunday());
    let grid_start = start.checked_sub_days(Days::new(lead)).unwrap_or(start);
    grid_start
        .iter_days()
        .take(GRID_WEEKS * 7)
        .map(|date| GridDay {
            date,
            in_month: date.month() == start.month() && date.year() == start.year(),
        })
        .collect()
}

/// Local, uncommitted selection of the picker. Committed on "Go".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedSelection {
    staged: Option<NaiveDate>,
}

impl StagedSelection {
    pub fn staged(&self) -> Option<NaiveDate> {
        self.staged
    }

    pub fn stage(&mut self, date: NaiveDate) {
        self.staged = Some(date);
    }

    /// Follow an externally changed date (e.g. moved by the slider).
    pub fn sync_external(&mut self, iso: &str) {
        if let Some(date) = parse_iso_date(iso) {
            self.staged = Some(date);
        }
    }

    /// ISO date to hand to the date setter, if anything is staged.
    pub fn commit(&self) -> Option<String> {
        self.staged.map(format_iso_date)
    }
}
