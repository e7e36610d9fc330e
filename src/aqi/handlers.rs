use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    aqi::calc::{compute, AqiCategory},
    error::AppError,
    extract::ApiQuery,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct AqiQuery {
    pub pm25: f64,
}

#[derive(Debug, Serialize)]
pub struct AqiResponse {
    pub aqi: u32,
    pub category: AqiCategory,
    pub label: &'static str,
}

pub fn aqi_routes() -> Router<AppState> {
    Router::new().route("/aqi", get(get_aqi))
}

#[instrument]
pub async fn get_aqi(ApiQuery(q): ApiQuery<AqiQuery>) -> Result<Json<AqiResponse>, AppError> {
    let aqi = compute(q.pm25)?;
    debug!(pm25 = q.pm25, aqi = aqi.value, "aqi computed");
    Ok(Json(AqiResponse {
        aqi: aqi.value,
        category: aqi.category,
        label: aqi.category.label(),
    }))
}
