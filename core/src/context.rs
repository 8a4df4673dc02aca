//! Best-effort location and weather snapshots used to enrich the system prompt.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::{AgriError, AgriResult};

const CONTEXT_TIMEOUT_SECS: u64 = 10;
const FORECAST_DAYS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationContext {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyForecast {
    pub dates: Vec<String>,
    pub max_temperature_c: Vec<f64>,
    pub min_temperature_c: Vec<f64>,
    pub precipitation_mm: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherContext {
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub forecast: DailyForecast,
}

/// Location and weather, either of which may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldContext {
    pub location: Option<LocationContext>,
    pub weather: Option<WeatherContext>,
}

impl FieldContext {
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.weather.is_none()
    }

    /// Text appended to the system prompt. `None` when nothing is known.
    pub fn enrichment(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut text = String::new();
        if let Some(loc) = &self.location {
            let _ = write!(
                text,
                "The farmer is located in {}, {} (lat {:.2}, lon {:.2}).",
                loc.city, loc.country, loc.latitude, loc.longitude
            );
        }
        if let Some(weather) = &self.weather {
            if !text.is_empty() {
                text.push(' ');
            }
            let _ = write!(
                text,
                "Current weather: {:.1}°C, {:.0}% humidity.",
                weather.temperature_c, weather.humidity_percent
            );
            let days = weather.forecast.dates.len();
            for i in 0..days {
                let (Some(max), Some(min), Some(rain)) = (
                    weather.forecast.max_temperature_c.get(i),
                    weather.forecast.min_temperature_c.get(i),
                    weather.forecast.precipitation_mm.get(i),
                ) else {
                    break;
                };
                let _ = write!(
                    text,
                    " {}: {:.0}-{:.0}°C, {:.1} mm rain.",
                    weather.forecast.dates[i], min, max, rain
                );
            }
        }
        Some(text)
    }
}

#[derive(Deserialize, Debug)]
struct GeoResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct ForecastResponse {
    current: ForecastCurrent,
    #[serde(default)]
    daily: Option<ForecastDaily>,
}

#[derive(Deserialize, Debug)]
struct ForecastCurrent {
    temperature_2m: f64,
    relative_humidity_2m: f64,
}

#[derive(Deserialize, Debug, Default)]
struct ForecastDaily {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_max: Vec<f64>,
    #[serde(default)]
    temperature_2m_min: Vec<f64>,
    #[serde(default)]
    precipitation_sum: Vec<f64>,
}

/// Client for the geolocation and forecast GET endpoints
#[derive(Debug, Clone)]
pub struct ContextClient {
    http_client: Client,
    geo_url: String,
    weather_url: String,
}

impl ContextClient {
    pub fn new(geo_url: &str, weather_url: &str) -> AgriResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(CONTEXT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AgriError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            geo_url: geo_url.to_string(),
            weather_url: weather_url.to_string(),
        })
    }

    pub async fn fetch_location(&self) -> AgriResult<LocationContext> {
        debug!("Looking up location via {}", self.geo_url);
        let response = self
            .http_client
            .get(&self.geo_url)
            .send()
            .await?
            .error_for_status()?;
        let geo: GeoResponse = response.json().await?;

        if geo.status.as_deref() == Some("fail") {
            return Err(AgriError::ParsingError(format!(
                "Geolocation failed: {}",
                geo.message.unwrap_or_default()
            )));
        }

        match (geo.lat, geo.lon) {
            (Some(latitude), Some(longitude)) => Ok(LocationContext {
                city: geo.city.unwrap_or_else(|| "Unknown".to_string()),
                country: geo.country.unwrap_or_else(|| "Unknown".to_string()),
                latitude,
                longitude,
            }),
            _ => Err(AgriError::ParsingError(
                "Geolocation response has no coordinates".to_string(),
            )),
        }
    }

    pub async fn fetch_weather(&self, location: &LocationContext) -> AgriResult<WeatherContext> {
        debug!(
            "Fetching forecast for {:.2},{:.2}",
            location.latitude, location.longitude
        );
        let response = self
            .http_client
            .get(&self.weather_url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m".to_string(),
                ),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,precipitation_sum".to_string(),
                ),
                ("forecast_days", FORECAST_DAYS.to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let forecast: ForecastResponse = response.json().await?;
        let daily = forecast.daily.unwrap_or_default();

        Ok(WeatherContext {
            temperature_c: forecast.current.temperature_2m,
            humidity_percent: forecast.current.relative_humidity_2m,
            forecast: DailyForecast {
                dates: daily.time,
                max_temperature_c: daily.temperature_2m_max,
                min_temperature_c: daily.temperature_2m_min,
                precipitation_mm: daily.precipitation_sum,
            },
        })
    }

    /// Fetch whatever can be fetched. Failures leave the slot empty.
    pub async fn refresh(&self) -> FieldContext {
        let location = match self.fetch_location().await {
            Ok(location) => {
                info!("Location: {}, {}", location.city, location.country);
                Some(location)
            }
            Err(e) => {
                warn!("Location lookup failed: {}", e);
                None
            }
        };

        let weather = match &location {
            Some(location) => match self.fetch_weather(location).await {
                Ok(weather) => Some(weather),
                Err(e) => {
                    warn!("Weather lookup failed: {}", e);
                    None
                }
            },
            None => None,
        };

        FieldContext { location, weather }
    }
}
