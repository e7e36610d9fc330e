use anyhow::{bail, Context};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;

pub const OPENWEATHER_API_BASE: &str = "https://api.openweathermap.org";

/// Upper bound for `JWT_TTL_MINUTES` (30 days).
pub const MAX_JWT_TTL_MINUTES: u64 = 30 * 24 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// No URL means users are kept in memory for the life of the process.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub weather: WeatherConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment. Blank values count as unset.
    pub fn from_source<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("APP_PORT") {
            Some(p) => p.parse::<u16>().context("APP_PORT must be a port number")?,
            None => 8080,
        };

        let database_url = get("DATABASE_URL");

        let secret = match (get("JWT_SECRET"), &database_url) {
            (Some(secret), _) => secret,
            (None, Some(_)) => bail!("JWT_SECRET is required when DATABASE_URL is set"),
            (None, None) => {
                tracing::warn!("JWT_SECRET not set; sessions will not survive a restart");
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(48)
                    .map(char::from)
                    .collect()
            }
        };

        let ttl_minutes = match get("JWT_TTL_MINUTES") {
            Some(v) => {
                let ttl = v
                    .trim()
                    .parse::<u64>()
                    .context("JWT_TTL_MINUTES must be a whole number of minutes")?;
                if !(1..=MAX_JWT_TTL_MINUTES).contains(&ttl) {
                    bail!("JWT_TTL_MINUTES must be between 1 and {}", MAX_JWT_TTL_MINUTES);
                }
                ttl
            }
            None => 60,
        };

        let jwt = JwtConfig {
            secret,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "weather-insights".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "weather-insights-users".into()),
            ttl_minutes,
        };

        let weather = WeatherConfig {
            api_key: get("OPENWEATHER_API_KEY"),
            base_url: get("OPENWEATHER_BASE_URL").unwrap_or_else(|| OPENWEATHER_API_BASE.into()),
        };

        Ok(Self {
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            database_url,
            jwt,
            weather,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
