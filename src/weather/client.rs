//! OpenWeather API client.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::aqi;
use crate::config::WeatherConfig;
use crate::weather::types::{
    group_by_day, AirQualityReport, Coordinates, CurrentWeather, Forecast, Location, OwCurrent,
    OwForecast, OwGeo, OwPollution,
};

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Please enter a city name")]
    InvalidCity,
    #[error("City not found")]
    CityNotFound,
    #[error("Weather service is not configured")]
    NotConfigured,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather service returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenWeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, WeatherError> {
        self.api_key.as_deref().ok_or(WeatherError::NotConfigured)
    }

    fn city(city: &str) -> Result<&str, WeatherError> {
        let city = city.trim();
        if city.is_empty() {
            Err(WeatherError::InvalidCity)
        } else {
            Ok(city)
        }
    }

    /// Current conditions for `city`, metric units.
    #[instrument(skip(self))]
    pub async fn current(&self, city: &str) -> Result<CurrentWeather, WeatherError> {
        let city = Self::city(city)?;
        let key = self.api_key()?;
        let raw: OwCurrent = self
            .get_json(
                "/data/2.5/weather",
                &[("q", city), ("appid", key), ("units", "metric")],
            )
            .await?;
        Ok(raw.into_current())
    }

    /// 5-day / 3-hour forecast for `city`, grouped by day.
    #[instrument(skip(self))]
    pub async fn forecast(&self, city: &str) -> Result<Forecast, WeatherError> {
        let city = Self::city(city)?;
        let key = self.api_key()?;
        let raw: OwForecast = self
            .get_json(
                "/data/2.5/forecast",
                &[("q", city), ("appid", key), ("units", "metric")],
            )
            .await?;
        let days = group_by_day(raw.list);
        debug!(days = days.len(), "forecast grouped");
        Ok(Forecast {
            city: raw.city.name,
            days,
        })
    }

    /// Best geocoding match for `city`.
    #[instrument(skip(self))]
    pub async fn locate(&self, city: &str) -> Result<Location, WeatherError> {
        let city = Self::city(city)?;
        let key = self.api_key()?;
        Ok(self.geocode(city, key).await?.into())
    }

    /// Geocodes `city`, fetches current pollution and scores it from PM2.5.
    #[instrument(skip(self))]
    pub async fn air_quality(&self, city: &str) -> Result<AirQualityReport, WeatherError> {
        let city = Self::city(city)?;
        let key = self.api_key()?;
        let place = self.geocode(city, key).await?;

        let lat = place.lat.to_string();
        let lon = place.lon.to_string();
        let pollution: OwPollution = self
            .get_json(
                "/data/2.5/air_pollution",
                &[("lat", lat.as_str()), ("lon", lon.as_str()), ("appid", key)],
            )
            .await?;

        let components = pollution
            .list
            .into_iter()
            .next()
            .map(|item| item.components)
            .ok_or_else(|| WeatherError::Parse("empty pollution list".into()))?;
        let pm25 = components
            .get("pm2_5")
            .copied()
            .ok_or_else(|| WeatherError::Parse("missing pm2_5".into()))?;
        let score = aqi::compute(pm25).map_err(|e| WeatherError::Parse(e.to_string()))?;

        Ok(AirQualityReport {
            city: place.name,
            coords: Coordinates {
                lat: place.lat,
                lon: place.lon,
            },
            components,
            aqi: score.value,
            category: score.category,
            label: score.category.label(),
        })
    }

    async fn geocode(&self, city: &str, key: &str) -> Result<OwGeo, WeatherError> {
        let places: Vec<OwGeo> = self
            .get_json("/geo/1.0/direct", &[("q", city), ("limit", "1"), ("appid", key)])
            .await?;
        places.into_iter().next().ok_or(WeatherError::CityNotFound)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, WeatherError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, WeatherError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| WeatherError::Parse(format!("JSON parse error: {}", e)))
        } else if status == StatusCode::NOT_FOUND {
            Err(WeatherError::CityNotFound)
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "openweather request failed");
            Err(WeatherError::Upstream {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aqi::AqiCategory;
    use crate::weather::types::WeatherCondition;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str, api_key: Option<&str>) -> OpenWeatherClient {
        OpenWeatherClient::new(&WeatherConfig {
            base_url: base_url.to_string(),
            api_key: api_key.map(str::to_string),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_current_weather() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "London"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "coord": {"lon": -0.1257, "lat": 51.5085},
                "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
                "main": {"temp": 14.2, "feels_like": 13.5, "temp_min": 12.8, "temp_max": 15.9, "pressure": 1012, "humidity": 81},
                "visibility": 9000,
                "wind": {"speed": 4.1, "deg": 240},
                "sys": {"country": "GB"},
                "name": "London",
                "cod": 200
            })))
            .mount(&mock_server)
            .await;

        let weather = client(&mock_server.uri(), Some("test_key"))
            .current("  London ")
            .await
            .unwrap();
        assert_eq!(weather.city, "London");
        assert_eq!(weather.country.as_deref(), Some("GB"));
        assert_eq!(weather.humidity, 81);
        assert_eq!(weather.temp_min_c, 12.8);
        assert_eq!(weather.temp_max_c, 15.9);
        assert_eq!(weather.visibility_m, Some(9000));
        assert_eq!(weather.condition, WeatherCondition::Rain);
        assert!((weather.coords.lat - 51.5085).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_city_is_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "cod": "404", "message": "city not found"
            })))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server.uri(), Some("k"))
            .current("Atlantis")
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::CityNotFound));
    }

    #[tokio::test]
    async fn test_upstream_error_is_reported() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server.uri(), Some("bad"))
            .current("London")
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Upstream { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_forecast_grouped_by_day() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .and(query_param("q", "Paris"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "list": [
                    {"dt": 1, "main": {"temp": 20.0}, "weather": [{"description": "clear sky"}], "dt_txt": "2024-06-01 18:00:00"},
                    {"dt": 2, "main": {"temp": 16.0}, "weather": [{"description": "clear sky"}], "dt_txt": "2024-06-01 21:00:00"},
                    {"dt": 3, "main": {"temp": 12.0}, "weather": [{"description": "broken clouds"}], "dt_txt": "2024-06-02 00:00:00"}
                ],
                "city": {"name": "Paris", "country": "FR"}
            })))
            .mount(&mock_server)
            .await;

        let forecast = client(&mock_server.uri(), Some("k"))
            .forecast("Paris")
            .await
            .unwrap();
        assert_eq!(forecast.city, "Paris");
        assert_eq!(forecast.days.len(), 2);
        assert_eq!(forecast.days[0].avg_temp_c, 18);
        assert_eq!(forecast.days[1].condition, WeatherCondition::Cloudy);
    }

    #[tokio::test]
    async fn test_air_quality_geocodes_then_scores_pm25() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Delhi"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Delhi", "lat": 28.61, "lon": 77.21, "country": "IN"}
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/air_pollution"))
            .and(query_param("lat", "28.61"))
            .and(query_param("lon", "77.21"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "coord": {"lon": 77.21, "lat": 28.61},
                "list": [{
                    "main": {"aqi": 5},
                    "components": {"co": 1201.6, "no2": 40.1, "o3": 12.0, "pm2_5": 35.4, "pm10": 80.2},
                    "dt": 1700000000
                }]
            })))
            .mount(&mock_server)
            .await;

        let report = client(&mock_server.uri(), Some("k"))
            .air_quality("Delhi")
            .await
            .unwrap();
        assert_eq!(report.city, "Delhi");
        assert_eq!(report.aqi, 100);
        assert_eq!(report.category, AqiCategory::Moderate);
        assert_eq!(report.label, "Moderate");
        assert_eq!(report.components.get("pm10"), Some(&80.2));
    }

    #[tokio::test]
    async fn test_locate_returns_place_details() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Springfield"))
            .and(query_param("limit", "1"))
            .and(query_param("appid", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Springfield", "lat": 39.80, "lon": -89.64, "country": "US", "state": "Illinois"}
            ])))
            .mount(&mock_server)
            .await;

        let place = client(&mock_server.uri(), Some("k"))
            .locate(" Springfield ")
            .await
            .unwrap();
        assert_eq!(place.name, "Springfield");
        assert_eq!(place.country.as_deref(), Some("US"));
        assert_eq!(place.state.as_deref(), Some("Illinois"));
        assert!((place.lon + 89.64).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_locate_without_state() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Oslo", "lat": 59.91, "lon": 10.75, "country": "NO"}
            ])))
            .mount(&mock_server)
            .await;

        let place = client(&mock_server.uri(), Some("k")).locate("Oslo").await.unwrap();
        assert_eq!(place.state, None);
    }

    #[tokio::test]
    async fn test_air_quality_empty_geocode_is_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server.uri(), Some("k"))
            .air_quality("Nowhere")
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::CityNotFound));
    }

    #[tokio::test]
    async fn test_blank_city_and_missing_key_short_circuit() {
        // no server: both must fail before any request
        let c = client("http://127.0.0.1:9", Some("k"));
        assert!(matches!(c.current("   ").await, Err(WeatherError::InvalidCity)));

        let c = client("http://127.0.0.1:9", None);
        assert!(matches!(c.forecast("Oslo").await, Err(WeatherError::NotConfigured)));
    }
}
