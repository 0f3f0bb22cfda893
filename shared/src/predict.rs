use chrono::{Days, NaiveDate};

use crate::api::IcePredictionResponse;
use crate::dates::format_iso_date;
use crate::geojson::FeatureCollection;
use crate::request::{RequestGate, Ticket};

pub const DEFAULT_RADIUS_KM: f64 = 500.0;
pub const DEFAULT_THRESHOLD: f64 = 0.5;
pub const THRESHOLD_STEP: f64 = 0.01;

/// Earliest date the prediction form accepts.
pub fn tomorrow(today: NaiveDate) -> String {
    format_iso_date(today.checked_add_days(Days::new(1)).unwrap_or(today))
}

pub fn prediction_error_message(status: Option<u16>) -> String {
    match status {
        Some(code) => format!("Prediction request failed ({code})"),
        None => "Prediction request failed (network)".to_string(),
    }
}

/// Numeric input value; blank or unparsable input reads as zero.
pub fn parse_number_input(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictForm {
    pub date: String,
    pub radius_km: f64,
    pub threshold: f64,
}

impl PredictForm {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            date: tomorrow(today),
            radius_km: DEFAULT_RADIUS_KM,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// What to hand to the page once a prediction call settles.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    /// The response belongs to a cancelled request and must not be applied.
    Stale,
    Forward(Option<FeatureCollection>),
}

/// Busy/error state of the prediction panel.
#[derive(Debug, Clone, Default)]
pub struct PredictSession {
    gate: RequestGate,
    error: Option<String>,
}

impl PredictSession {
    pub fn is_predicting(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin(&mut self) -> Option<Ticket> {
        let ticket = self.gate.begin()?;
        self.error = None;
        Some(ticket)
    }

    pub fn settle(
        &mut self,
        ticket: Ticket,
        result: Result<IcePredictionResponse, String>,
    ) -> Settled {
        if !self.gate.finish(ticket) {
            return Settled::Stale;
        }
        match result {
            Ok(response) => Settled::Forward(Some(response.feature_collection)),
            Err(message) => {
                self.error = Some(message);
                Settled::Forward(None)
            }
        }
    }

    pub fn cancel(&mut self) {
        self.gate.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::Feature;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 31).expect("valid date")
    }

    #[test]
    fn form_defaults() {
        let form = PredictForm::new(today());
        assert_eq!(form.date, "2024-06-01");
        assert_eq!(form.radius_km, 500.0);
        assert_eq!(form.threshold, 0.5);
    }

    #[test]
    fn success_forwards_collection_once_without_error() {
        let fc = FeatureCollection::new(vec![Feature::point(0.0, 85.0, Default::default())]);
        let mut session = PredictSession::default();
        let mut forwarded = Vec::new();

        let ticket = session.begin().expect("request starts");
        assert!(session.is_predicting());
        let response = IcePredictionResponse {
            date: "2024-06-01".to_string(),
            radius_km: 500.0,
            threshold: 0.5,
            feature_collection: fc.clone(),
        };
        if let Settled::Forward(value) = session.settle(ticket, Ok(response)) {
            forwarded.push(value);
        }

        assert_eq!(forwarded, vec![Some(fc)]);
        assert_eq!(session.error(), None);
        assert!(!session.is_predicting());
    }

    #[test]
    fn failure_forwards_none_and_clears_busy() {
        let mut session = PredictSession::default();
        let ticket = session.begin().expect("request starts");
        let settled = session.settle(ticket, Err(prediction_error_message(Some(500))));
        assert_eq!(settled, Settled::Forward(None));
        assert!(!session.is_predicting());
        assert_eq!(session.error(), Some("Prediction request failed (500)"));
    }

    #[test]
    fn new_request_clears_previous_error() {
        let mut session = PredictSession::default();
        let ticket = session.begin().expect("request starts");
        session.settle(ticket, Err("boom".to_string()));
        session.begin().expect("request starts");
        assert_eq!(session.error(), None);
    }

    #[test]
    fn cancelled_request_is_stale() {
        let mut session = PredictSession::default();
        let ticket = session.begin().expect("request starts");
        session.cancel();
        assert_eq!(session.settle(ticket, Err("late".to_string())), Settled::Stale);
        assert_eq!(session.error(), None);
    }

    #[test]
    fn number_input_parsing() {
        assert_eq!(parse_number_input(" 250 "), 250.0);
        assert_eq!(parse_number_input(""), 0.0);
        assert_eq!(parse_number_input("abc"), 0.0);
        assert_eq!(parse_number_input("0.35"), 0.35);
    }
}
