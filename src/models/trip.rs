#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    #[default]
    OneWay,
    RoundTrip,
}

impl TripType {
    pub fn label(&self) -> &'static str {
        match self {
            TripType::OneWay => "One way",
            TripType::RoundTrip => "Round trip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    Resolved,
    #[default]
    Manual,
}

impl DistanceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceSource::Resolved => "resolved",
            DistanceSource::Manual => "manual",
        }
    }
}

/// An intermediate stop; order in the vector is visiting order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub address: String,
    pub datetime: String,
}

impl Stop {
    pub fn is_blank(&self) -> bool {
        self.address.trim().is_empty() && self.datetime.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceLeg {
    pub from: String,
    pub to: String,
    pub miles: f64,
}

/// Outcome of distance resolution for one submission. `one_way_miles`
/// already includes the manual extra-miles adjustment.
#[derive(Debug, Clone)]
pub struct ResolvedDistance {
    pub one_way_miles: f64,
    pub source: DistanceSource,
    pub legs: Vec<DistanceLeg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub state: String,
    pub county: String,
    pub department: String,
    pub citing_officer: String,
    pub ticket_number: String,
}

impl Ticket {
    /// Builds a ticket only when at least one field carries content.
    pub fn from_fields(
        state: &str,
        county: &str,
        department: &str,
        citing_officer: &str,
        ticket_number: &str,
    ) -> Option<Self> {
        let fields = [state, county, department, citing_officer, ticket_number];
        if fields.iter().all(|field| field.trim().is_empty()) {
            return None;
        }
        Some(Self {
            state: state.trim().to_string(),
            county: county.trim().to_string(),
            department: department.trim().to_string(),
            citing_officer: citing_officer.trim().to_string(),
            ticket_number: ticket_number.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TripCosts {
    #[serde(default)]
    pub gas: f64,
    #[serde(default)]
    pub food: f64,
    #[serde(default)]
    pub tolls: f64,
    #[serde(default)]
    pub tickets: Vec<Ticket>,
}

impl TripCosts {
    pub fn extras_total(&self) -> f64 {
        self.gas + self.food + self.tolls
    }
}

/// Replacement values for a trip's cost record. Gas/food/tolls overwrite
/// the stored values; a ticket, when present, is appended.
#[derive(Debug, Clone, Default)]
pub struct CostUpdate {
    pub gas: f64,
    pub food: f64,
    pub tolls: f64,
    pub ticket: Option<Ticket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    /// Amendment key, generated at creation. `created_at` is for display
    /// and sorting only; two trips may share a timestamp.
    #[serde(default = "generate_trip_id")]
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub trip_type: TripType,
    pub start_address: String,
    pub end_address: String,
    pub start_datetime: String,
    pub arrival_datetime: String,
    pub stops: Vec<Stop>,
    pub irs_business_rate: f64,
    pub one_way_miles: f64,
    pub total_miles: f64,
    pub reimbursement: f64,
    pub distance_source: DistanceSource,
    pub distance_legs: Vec<DistanceLeg>,
    #[serde(default)]
    pub costs: TripCosts,
}

fn generate_trip_id() -> String {
    Uuid::new_v4().to_string()
}

/// A trip creation request, before distance resolution.
#[derive(Debug, Clone, Default)]
pub struct TripSubmission {
    pub trip_type: TripType,
    pub start_address: String,
    pub end_address: String,
    pub start_datetime: String,
    pub arrival_datetime: String,
    pub stops: Vec<Stop>,
    pub manual_one_way_miles: f64,
    pub manual_stop_miles: f64,
}

impl TripSubmission {
    /// Caller-level checks that must pass before a trip reaches the ledger.
    pub fn validate(&self, one_way_miles: f64) -> Result<(), AppError> {
        if self.start_address.trim().is_empty() || self.end_address.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Start and End address are required.".into(),
            ));
        }
        if one_way_miles <= 0.0 {
            return Err(AppError::BadRequest(
                "Miles must be greater than 0 (enter manual miles or configure ORS_API_KEY)."
                    .into(),
            ));
        }
        Ok(())
    }
}

impl Trip {
    /// Assembles a persistable trip from a validated submission.
    ///
    /// The rate is frozen into the record; later rate changes never touch
    /// existing trips. Rounding to two decimals happens here, once per
    /// output, so multi-leg totals do not accumulate rounding error.
    pub fn from_submission(
        submission: TripSubmission,
        resolved: ResolvedDistance,
        rate: f64,
    ) -> Self {
        let one_way = resolved.one_way_miles;
        let total = match submission.trip_type {
            TripType::RoundTrip => one_way * 2.0,
            TripType::OneWay => one_way,
        };

        Self {
            id: generate_trip_id(),
            created_at: Utc::now(),
            trip_type: submission.trip_type,
            start_address: submission.start_address,
            end_address: submission.end_address,
            start_datetime: submission.start_datetime,
            arrival_datetime: submission.arrival_datetime,
            stops: submission.stops,
            irs_business_rate: rate,
            one_way_miles: round2(one_way),
            total_miles: round2(total),
            reimbursement: round2(total * rate),
            distance_source: resolved.source,
            distance_legs: resolved.legs,
            costs: TripCosts::default(),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual(miles: f64) -> ResolvedDistance {
        ResolvedDistance {
            one_way_miles: miles,
            source: DistanceSource::Manual,
            legs: Vec::new(),
        }
    }

    fn submission(trip_type: TripType) -> TripSubmission {
        TripSubmission {
            trip_type,
            start_address: "1 Main St".into(),
            end_address: "9 Oak Ave".into(),
            ..TripSubmission::default()
        }
    }

    #[test]
    fn one_way_reimbursement() {
        let trip = Trip::from_submission(submission(TripType::OneWay), manual(11.5), 0.70);
        assert_eq!(trip.one_way_miles, 11.5);
        assert_eq!(trip.total_miles, 11.5);
        assert_eq!(trip.reimbursement, 8.05);
    }

    #[test]
    fn round_trip_doubles_total() {
        let trip = Trip::from_submission(submission(TripType::RoundTrip), manual(10.0), 0.70);
        assert_eq!(trip.total_miles, 20.0);
        assert_eq!(trip.reimbursement, 14.0);
    }

    #[test]
    fn rounding_applies_once_at_output() {
        // Unrounded one-way total from legs; the doubled total and the
        // reimbursement are computed from the raw value, not from the
        // already-rounded one_way_miles.
        let resolved = ResolvedDistance {
            one_way_miles: 10.006,
            source: DistanceSource::Resolved,
            legs: vec![DistanceLeg {
                from: "A".into(),
                to: "B".into(),
                miles: 10.006,
            }],
        };
        let trip = Trip::from_submission(submission(TripType::RoundTrip), resolved, 0.70);
        assert_eq!(trip.one_way_miles, 10.01);
        assert_eq!(trip.total_miles, 20.01);
        // 20.012 * 0.70 = 14.0084 -> 14.01, not round2(20.01 * 0.70) = 14.01
        // and not 2 * round2(10.006 * 0.70).
        assert_eq!(trip.reimbursement, 14.01);
    }

    #[test]
    fn validation_rejects_missing_addresses() {
        let mut sub = submission(TripType::OneWay);
        sub.start_address = "  ".into();
        let err = sub.validate(5.0).unwrap_err();
        assert!(err.to_string().contains("Start and End address"));
    }

    #[test]
    fn validation_rejects_non_positive_miles() {
        let sub = submission(TripType::OneWay);
        assert!(sub.validate(0.0).is_err());
        assert!(sub.validate(-1.0).is_err());
        assert!(sub.validate(0.01).is_ok());
    }

    #[test]
    fn ticket_requires_at_least_one_field() {
        assert!(Ticket::from_fields("", " ", "", "", "").is_none());
        let ticket = Ticket::from_fields("", "", "", "", "T-100").unwrap();
        assert_eq!(ticket.ticket_number, "T-100");
        assert_eq!(ticket.state, "");
    }

    #[test]
    fn trips_without_id_get_one_on_load() {
        let raw = r#"{
            "created_at": "2025-01-05T12:00:00Z",
            "trip_type": "one_way",
            "start_address": "A",
            "end_address": "B",
            "start_datetime": "",
            "arrival_datetime": "",
            "stops": [],
            "irs_business_rate": 0.7,
            "one_way_miles": 4.0,
            "total_miles": 4.0,
            "reimbursement": 2.8,
            "distance_source": "manual",
            "distance_legs": []
        }"#;
        let trip: Trip = serde_json::from_str(raw).unwrap();
        assert!(!trip.id.is_empty());
        assert_eq!(trip.costs.tickets.len(), 0);
    }
}
