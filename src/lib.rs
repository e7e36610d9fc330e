//! Weather insights backend: credential service, AQI calculator and an
//! OpenWeather proxy behind one axum router.

pub mod app;
pub mod aqi;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod state;
pub mod weather;
