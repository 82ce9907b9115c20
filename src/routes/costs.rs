use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::trip::{CostUpdate, Ticket, Trip},
    routes::{
        format_timestamp, money,
        trips::{parse_amount, trimmed},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/costs", get(costs_form).post(costs_submit))
}

#[derive(Clone)]
struct CostRow {
    id: String,
    label: String,
    gas: String,
    food: String,
    tolls: String,
    ticket_count: usize,
}

#[derive(Template)]
#[template(path = "costs.html")]
struct CostsTemplate {
    trips: Vec<CostRow>,
    updated: bool,
    show_error: bool,
    error_message: String,
}

#[derive(Deserialize)]
struct CostsParams {
    updated: Option<String>,
}

async fn costs_form(
    State(state): State<AppState>,
    Query(params): Query<CostsParams>,
) -> Result<impl IntoResponse, AppError> {
    let trips = load_rows(&state).await?;
    Ok(AskamaTemplateResponse::into_response(CostsTemplate {
        trips,
        updated: params.updated.is_some(),
        show_error: false,
        error_message: String::new(),
    }))
}

#[derive(Deserialize)]
struct CostsForm {
    trip_id: Option<String>,
    gas: Option<String>,
    food: Option<String>,
    tolls: Option<String>,
    ticket_state: Option<String>,
    ticket_county: Option<String>,
    ticket_department: Option<String>,
    ticket_officer: Option<String>,
    ticket_number: Option<String>,
}

async fn costs_submit(
    State(state): State<AppState>,
    Form(form): Form<CostsForm>,
) -> Result<Response, AppError> {
    let trip_id = trimmed(form.trip_id);
    let update = CostUpdate {
        gas: parse_amount(form.gas.as_deref()),
        food: parse_amount(form.food.as_deref()),
        tolls: parse_amount(form.tolls.as_deref()),
        ticket: Ticket::from_fields(
            form.ticket_state.as_deref().unwrap_or(""),
            form.ticket_county.as_deref().unwrap_or(""),
            form.ticket_department.as_deref().unwrap_or(""),
            form.ticket_officer.as_deref().unwrap_or(""),
            form.ticket_number.as_deref().unwrap_or(""),
        ),
    };

    if state.store.amend_costs(&trip_id, update).await? {
        Ok(Redirect::to("/costs?updated=1").into_response())
    } else {
        let trips = load_rows(&state).await?;
        Ok((
            StatusCode::NOT_FOUND,
            AskamaTemplateResponse::into_response(CostsTemplate {
                trips,
                updated: false,
                show_error: true,
                error_message: "Trip not found.".into(),
            }),
        )
            .into_response())
    }
}

async fn load_rows(state: &AppState) -> Result<Vec<CostRow>, AppError> {
    let mut trips = state.store.load().await?;
    trips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(trips.into_iter().map(cost_row).collect())
}

fn cost_row(trip: Trip) -> CostRow {
    CostRow {
        id: trip.id.clone(),
        label: format!(
            "{} — {} → {}",
            format_timestamp(trip.created_at),
            trip.start_address,
            trip.end_address
        ),
        gas: money(trip.costs.gas),
        food: money(trip.costs.food),
        tolls: money(trip.costs.tolls),
        ticket_count: trip.costs.tickets.len(),
    }
}
