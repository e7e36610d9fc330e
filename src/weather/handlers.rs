use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    error::AppError,
    extract::ApiQuery,
    state::AppState,
    weather::types::{AirQualityReport, CurrentWeather, Forecast, Location},
};

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    #[serde(default)]
    pub city: String,
}

pub fn weather_routes() -> Router<AppState> {
    Router::new()
        .route("/weather", get(current))
        .route("/forecast", get(forecast))
        .route("/air-quality", get(air_quality))
        .route("/location", get(location))
}

#[instrument(skip(state))]
pub async fn current(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<CityQuery>,
) -> Result<Json<CurrentWeather>, AppError> {
    Ok(Json(state.weather.current(&q.city).await?))
}

#[instrument(skip(state))]
pub async fn forecast(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<CityQuery>,
) -> Result<Json<Forecast>, AppError> {
    Ok(Json(state.weather.forecast(&q.city).await?))
}

#[instrument(skip(state))]
pub async fn air_quality(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<CityQuery>,
) -> Result<Json<AirQualityReport>, AppError> {
    Ok(Json(state.weather.air_quality(&q.city).await?))
}

#[instrument(skip(state))]
pub async fn location(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<CityQuery>,
) -> Result<Json<Location>, AppError> {
    Ok(Json(state.weather.locate(&q.city).await?))
}
