use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aqi::AqiCategory;

/// Coarse condition used to pick an icon on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Rain,
    Thunderstorm,
    Snow,
    Fog,
    #[default]
    Other,
}

impl WeatherCondition {
    /// Classify an OpenWeather description ("light rain", "overcast clouds").
    /// Earlier keywords win: "thunderstorm with rain" is `Rain`.
    pub fn from_description(desc: &str) -> Self {
        let d = desc.to_lowercase();
        if d.contains("clear") {
            Self::Clear
        } else if d.contains("cloud") {
            Self::Cloudy
        } else if d.contains("rain") {
            Self::Rain
        } else if d.contains("thunder") {
            Self::Thunderstorm
        } else if d.contains("snow") {
            Self::Snow
        } else if d.contains("fog") || d.contains("mist") {
            Self::Fog
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentWeather {
    pub city: String,
    pub country: Option<String>,
    pub coords: Coordinates,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub humidity: u8,
    pub pressure_hpa: f64,
    pub wind_speed: f64,
    /// Metres; OpenWeather omits it for some stations.
    pub visibility_m: Option<u32>,
    pub description: String,
    pub condition: WeatherCondition,
}

/// Geocoded place for the map view.
#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastEntry {
    pub time: String,
    pub temperature_c: f64,
    pub description: String,
    pub condition: WeatherCondition,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayForecast {
    pub date: String,
    pub avg_temp_c: i64,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub description: String,
    pub condition: WeatherCondition,
    pub entries: Vec<ForecastEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub city: String,
    pub days: Vec<DayForecast>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AirQualityReport {
    pub city: String,
    pub coords: Coordinates,
    /// Pollutant concentrations in µg/m³ keyed by OpenWeather name (pm2_5, o3, ...).
    pub components: BTreeMap<String, f64>,
    pub aqi: u32,
    pub category: AqiCategory,
    pub label: &'static str,
}

// ---- OpenWeather wire shapes ----

#[derive(Debug, Deserialize)]
pub(crate) struct OwDescription {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwMain {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: f64,
    #[serde(default)]
    pub temp_min: f64,
    #[serde(default)]
    pub temp_max: f64,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub pressure: f64,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct OwWind {
    #[serde(default)]
    pub speed: f64,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct OwSys {
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwCurrent {
    pub name: String,
    pub coord: Coordinates,
    pub main: OwMain,
    #[serde(default)]
    pub weather: Vec<OwDescription>,
    #[serde(default)]
    pub wind: OwWind,
    #[serde(default)]
    pub sys: OwSys,
    pub visibility: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwForecastItem {
    pub main: OwMain,
    #[serde(default)]
    pub weather: Vec<OwDescription>,
    pub dt_txt: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwForecastCity {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwForecast {
    pub list: Vec<OwForecastItem>,
    pub city: OwForecastCity,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwGeo {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: Option<String>,
    pub state: Option<String>,
}

impl From<OwGeo> for Location {
    fn from(geo: OwGeo) -> Self {
        Location {
            name: geo.name,
            lat: geo.lat,
            lon: geo.lon,
            country: geo.country,
            state: geo.state,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwPollutionItem {
    pub components: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwPollution {
    pub list: Vec<OwPollutionItem>,
}

impl OwCurrent {
    pub(crate) fn into_current(self) -> CurrentWeather {
        let description = first_description(&self.weather);
        CurrentWeather {
            city: self.name,
            country: self.sys.country,
            coords: self.coord,
            temperature_c: self.main.temp,
            feels_like_c: self.main.feels_like,
            temp_min_c: self.main.temp_min,
            temp_max_c: self.main.temp_max,
            humidity: self.main.humidity,
            pressure_hpa: self.main.pressure,
            wind_speed: self.wind.speed,
            visibility_m: self.visibility,
            condition: WeatherCondition::from_description(&description),
            description,
        }
    }
}

fn first_description(weather: &[OwDescription]) -> String {
    weather
        .first()
        .map(|w| w.description.clone())
        .unwrap_or_default()
}

/// Groups 3-hourly entries by the calendar date of `dt_txt`, keeping the
/// order in which dates first appear.
pub(crate) fn group_by_day(items: Vec<OwForecastItem>) -> Vec<DayForecast> {
    let mut grouped: Vec<(String, Vec<ForecastEntry>)> = Vec::new();
    for item in items {
        let date = item
            .dt_txt
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_string();
        let description = first_description(&item.weather);
        let entry = ForecastEntry {
            time: item.dt_txt,
            temperature_c: item.main.temp,
            condition: WeatherCondition::from_description(&description),
            description,
        };
        match grouped.iter_mut().find(|(d, _)| *d == date) {
            Some((_, entries)) => entries.push(entry),
            None => grouped.push((date, vec![entry])),
        }
    }

    grouped
        .into_iter()
        .map(|(date, entries)| {
            let temps = entries.iter().map(|e| e.temperature_c);
            let sum: f64 = temps.clone().sum();
            let min = temps.clone().fold(f64::INFINITY, f64::min);
            let max = temps.fold(f64::NEG_INFINITY, f64::max);
            let avg = sum / entries.len() as f64;
            let mid = &entries[entries.len() / 2];
            let (description, condition) = (mid.description.clone(), mid.condition);
            DayForecast {
                date,
                // half-up, matching how the client rounds
                avg_temp_c: (avg + 0.5).floor() as i64,
                min_temp_c: min,
                max_temp_c: max,
                description,
                condition,
                entries,
            }
        })
        .collect()
}
