use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::{
    repo::{MemoryUserStore, PgUserStore, UserStore},
    CredentialService,
};
use crate::config::AppConfig;
use crate::weather::OpenWeatherClient;

#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialService,
    pub config: Arc<AppConfig>,
    pub weather: Arc<OpenWeatherClient>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgUserStore::new(db))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory user store");
                Arc::new(MemoryUserStore::new())
            }
        };

        let weather = OpenWeatherClient::new(&config.weather).context("build weather client")?;
        if config.weather.api_key.is_none() {
            tracing::warn!("OPENWEATHER_API_KEY not set; weather routes will return 503");
        }

        Ok(Self::from_parts(store, Arc::new(config), weather))
    }

    pub fn from_parts(
        store: Arc<dyn UserStore>,
        config: Arc<AppConfig>,
        weather: OpenWeatherClient,
    ) -> Self {
        Self {
            credentials: CredentialService::new(store),
            config,
            weather: Arc::new(weather),
        }
    }
}

#[cfg(test)]
impl AppState {
    pub fn fake() -> Self {
        Self::fake_with_weather("http://127.0.0.1:9", Some("test"))
    }

    pub fn fake_with_weather(base_url: &str, api_key: Option<&str>) -> Self {
        use crate::config::{JwtConfig, WeatherConfig};

        let weather_config = WeatherConfig {
            api_key: api_key.map(str::to_string),
            base_url: base_url.to_string(),
        };
        let weather = OpenWeatherClient::new(&weather_config).expect("weather client");

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            weather: weather_config,
        });

        Self::from_parts(Arc::new(MemoryUserStore::new()), config, weather)
    }
}
