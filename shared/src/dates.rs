use chrono::{Datelike, NaiveDate};

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a strict zero-padded `YYYY-MM-DD` string.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT).ok()
}

/// Format a calendar date as `YYYY-MM-DD` from its own (UTC) components.
pub fn format_iso_date(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Extract the first 8-digit `YYYYMMDD` token of a file stem as an ISO date.
pub fn date_token_to_iso(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    bytes.windows(8).enumerate().find_map(|(start, window)| {
        if !window.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let token = &stem[start..start + 8];
        let iso = format!("{}-{}-{}", &token[..4], &token[4..6], &token[6..8]);
        parse_iso_date(&iso).map(|_| iso)
    })
}

/// The ordered set of dates for which historical data exists.
///
/// Always ascending and unique; plain string order is chronological because
/// every entry is a zero-padded ISO date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableDates {
    dates: Vec<String>,
}

impl AvailableDates {
    pub fn new<I, S>(dates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dates: Vec<String> = dates.into_iter().map(Into::into).collect();
        dates.sort();
        dates.dedup();
        Self { dates }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn contains(&self, iso: &str) -> bool {
        self.dates
            .binary_search_by(|date| date.as_str().cmp(iso))
            .is_ok()
    }

    pub fn first(&self) -> Option<&str> {
        self.dates.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.dates.last().map(String::as_str)
    }

    /// Largest valid slider index; 0 for an empty set.
    pub fn max_index(&self) -> usize {
        self.dates.len().saturating_sub(1)
    }

    /// Position of `iso` in the set, or 0 when it is not (yet) present.
    pub fn index_of(&self, iso: &str) -> usize {
        self.dates
            .binary_search_by(|date| date.as_str().cmp(iso))
            .unwrap_or(0)
    }

    /// Date at `index` after clamping into `[0, len - 1]`.
    pub fn date_at_clamped(&self, index: usize) -> Option<&str> {
        if self.dates.is_empty() {
            return None;
        }
        self.dates
            .get(index.min(self.max_index()))
            .map(String::as_str)
    }

    /// Four-digit year labels for both ends of the range.
    pub fn year_labels(&self) -> (String, String) {
        let year = |d: Option<&str>| d.and_then(|d| d.get(..4)).unwrap_or("").to_string();
        (year(self.first()), year(self.last()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn january() -> AvailableDates {
        AvailableDates::new((1..=10).map(|d| format!("2020-01-{d:02}")))
    }

    #[test]
    fn parse_rejects_unpadded_and_invalid_dates() {
        assert!(parse_iso_date("2024-06-01").is_some());
        assert!(parse_iso_date("2024-6-01").is_none());
        assert!(parse_iso_date("2024-02-30").is_none());
        assert!(parse_iso_date("20240601").is_none());
        assert!(parse_iso_date("abcd-ef-gh").is_none());
    }

    #[test]
    fn format_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(987, 3, 4).expect("valid date");
        assert_eq!(format_iso_date(date), "0987-03-04");
    }

    #[test]
    fn date_token_extraction() {
        assert_eq!(
            date_token_to_iso("N_20200115_extent_v3.0").as_deref(),
            Some("2020-01-15")
        );
        assert_eq!(date_token_to_iso("extent_v3"), None);
        assert_eq!(date_token_to_iso("99999999_x"), None);
    }

    #[test]
    fn new_sorts_and_deduplicates() {
        let dates = AvailableDates::new(["2021-03-01", "2020-01-01", "2021-03-01"]);
        assert_eq!(dates.as_slice(), ["2020-01-01", "2021-03-01"]);
    }

    #[test]
    fn index_of_round_trips_every_member() {
        let dates = january();
        for (i, d) in dates.as_slice().iter().enumerate() {
            assert_eq!(dates.index_of(d), i);
            assert_eq!(dates.date_at_clamped(dates.index_of(d)), Some(d.as_str()));
        }
    }

    #[test]
    fn index_of_missing_date_clamps_to_zero() {
        assert_eq!(january().index_of("1999-01-01"), 0);
        assert_eq!(january().index_of(""), 0);
    }

    #[test]
    fn date_at_clamped_clamps_to_last() {
        assert_eq!(january().date_at_clamped(99), Some("2020-01-10"));
        assert_eq!(AvailableDates::default().date_at_clamped(0), None);
    }

    #[test]
    fn empty_set_has_zero_max_index() {
        let empty = AvailableDates::default();
        assert_eq!(empty.max_index(), 0);
        assert_eq!(empty.year_labels(), (String::new(), String::new()));
    }

    #[test]
    fn year_labels_use_range_ends() {
        let dates = AvailableDates::new(["2019-12-31", "2024-01-01"]);
        assert_eq!(
            dates.year_labels(),
            ("2019".to_string(), "2024".to_string())
        );
    }
}
