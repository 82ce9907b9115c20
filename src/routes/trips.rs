use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppError,
    models::trip::{Stop, Trip, TripSubmission, TripType},
    routes::{format_timestamp, money},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/mileage", get(mileage_form).post(mileage_submit))
        .route("/api/trips", get(api_trips))
}

#[derive(Clone)]
struct TripRow {
    created_at: String,
    trip_type: &'static str,
    route: String,
    stop_count: usize,
    total_miles: String,
    reimbursement: String,
    source: &'static str,
    extra_costs: String,
    ticket_count: usize,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    trips: Vec<TripRow>,
    saved: bool,
}

#[derive(Deserialize)]
struct IndexParams {
    saved: Option<String>,
}

async fn index(
    State(state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut trips = state.store.load().await?;
    trips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let rows = trips.into_iter().map(trip_row).collect();
    Ok(AskamaTemplateResponse::into_response(IndexTemplate {
        trips: rows,
        saved: params.saved.is_some(),
    }))
}

fn trip_row(trip: Trip) -> TripRow {
    TripRow {
        created_at: format_timestamp(trip.created_at),
        trip_type: trip.trip_type.label(),
        route: format!("{} → {}", trip.start_address, trip.end_address),
        stop_count: trip.stops.len(),
        total_miles: format!("{:.2}", trip.total_miles),
        reimbursement: money(trip.reimbursement),
        source: trip.distance_source.as_str(),
        extra_costs: money(trip.costs.extras_total()),
        ticket_count: trip.costs.tickets.len(),
    }
}

#[derive(Template)]
#[template(path = "mileage.html")]
struct MileageTemplate {
    rate: String,
    routing_enabled: bool,
    stop_slots: Vec<u8>,
    show_error: bool,
    error_message: String,
}

impl MileageTemplate {
    fn new(rate: f64, routing_enabled: bool) -> Self {
        Self {
            rate: format!("{rate:.2}"),
            routing_enabled,
            stop_slots: (1..=5).collect(),
            show_error: false,
            error_message: String::new(),
        }
    }
}

async fn mileage_form(State(state): State<AppState>) -> impl IntoResponse {
    let rate = state.rates.current_rate().await;
    AskamaTemplateResponse::into_response(MileageTemplate::new(
        rate,
        state.resolver.routing_enabled(),
    ))
}

#[derive(Deserialize)]
struct MileageForm {
    trip_type: Option<String>,
    start_address: Option<String>,
    end_address: Option<String>,
    start_datetime: Option<String>,
    arrival_datetime: Option<String>,
    stop_1_address: Option<String>,
    stop_1_datetime: Option<String>,
    stop_2_address: Option<String>,
    stop_2_datetime: Option<String>,
    stop_3_address: Option<String>,
    stop_3_datetime: Option<String>,
    stop_4_address: Option<String>,
    stop_4_datetime: Option<String>,
    stop_5_address: Option<String>,
    stop_5_datetime: Option<String>,
    manual_one_way_miles: Option<String>,
    manual_stop_miles: Option<String>,
}

impl MileageForm {
    fn into_submission(self) -> TripSubmission {
        let trip_type = match self.trip_type.as_deref() {
            Some("round_trip") => TripType::RoundTrip,
            _ => TripType::OneWay,
        };

        let stop_fields = [
            (self.stop_1_address, self.stop_1_datetime),
            (self.stop_2_address, self.stop_2_datetime),
            (self.stop_3_address, self.stop_3_datetime),
            (self.stop_4_address, self.stop_4_datetime),
            (self.stop_5_address, self.stop_5_datetime),
        ];
        let stops = stop_fields
            .into_iter()
            .map(|(address, datetime)| Stop {
                address: trimmed(address),
                datetime: trimmed(datetime),
            })
            .filter(|stop| !stop.is_blank())
            .collect();

        TripSubmission {
            trip_type,
            start_address: trimmed(self.start_address),
            end_address: trimmed(self.end_address),
            start_datetime: trimmed(self.start_datetime),
            arrival_datetime: trimmed(self.arrival_datetime),
            stops,
            manual_one_way_miles: parse_amount(self.manual_one_way_miles.as_deref()),
            manual_stop_miles: parse_amount(self.manual_stop_miles.as_deref()),
        }
    }
}

async fn mileage_submit(
    State(state): State<AppState>,
    Form(form): Form<MileageForm>,
) -> Result<Response, AppError> {
    // The rate is fetched per submission and frozen into the record.
    let rate = state.rates.current_rate().await;
    let submission = form.into_submission();

    let resolved = state
        .resolver
        .resolve(
            &submission.start_address,
            &submission.stops,
            &submission.end_address,
            submission.manual_one_way_miles,
            submission.manual_stop_miles,
        )
        .await;

    match submission.validate(resolved.one_way_miles) {
        Ok(()) => {
            let trip = Trip::from_submission(submission, resolved, rate);
            state.store.append(trip).await?;
            Ok(Redirect::to("/?saved=1").into_response())
        }
        Err(AppError::BadRequest(message)) => Ok(render_mileage_error(&state, rate, message)),
        Err(err) => Err(err),
    }
}

fn render_mileage_error(state: &AppState, rate: f64, message: String) -> Response {
    let mut template = MileageTemplate::new(rate, state.resolver.routing_enabled());
    template.show_error = true;
    template.error_message = message;
    (
        StatusCode::BAD_REQUEST,
        AskamaTemplateResponse::into_response(template),
    )
        .into_response()
}

/// Raw ledger in storage (append) order, for a future richer front-end.
async fn api_trips(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let trips = state.store.load().await?;
    Ok(Json(json!({ "trips": trips })))
}

pub(crate) fn trimmed(input: Option<String>) -> String {
    input.map(|value| value.trim().to_string()).unwrap_or_default()
}

/// Missing or unparseable numbers become 0.0; a bad number never rejects
/// the submission.
pub(crate) fn parse_amount(input: Option<&str>) -> f64 {
    input
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0.0)
}
