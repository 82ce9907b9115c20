pub mod costs;
pub mod trips;

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::services::ServeDir;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(trips::router())
        .merge(costs::router())
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

pub(crate) fn money(amount: f64) -> String {
    format!("${amount:.2}")
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}
