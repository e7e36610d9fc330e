use crate::state::AppState;
use axum::Router;

pub mod calc;
pub mod handlers;

pub use calc::{compute, AqiCategory, AqiError};

pub fn router() -> Router<AppState> {
    handlers::aqi_routes()
}
