//! Proxy over the OpenWeather API for the front-end pages.

use crate::state::AppState;
use axum::Router;

pub mod client;
pub mod handlers;
pub mod types;

pub use client::{OpenWeatherClient, WeatherError};

pub fn router() -> Router<AppState> {
    handlers::weather_routes()
}
