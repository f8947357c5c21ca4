// Hourly forecast fetching against the National Weather Service API.
//
// Two requests per stadium: the points endpoint resolves coordinates to a
// gridded hourly-forecast URL, and that URL yields a list of hourly periods.
// The period whose start time is closest to kickoff wins.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::config::WeatherConfig;

// ---------------------------------------------------------------------------
// Forecast data
// ---------------------------------------------------------------------------

/// One hourly forecast snapshot, reduced to the fields the boost math reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// Period start time as reported by the provider (RFC 3339).
    pub forecast_time: String,
    pub temperature: Option<f64>,
    /// Raw wind string, e.g. "10 mph".
    pub wind_speed: Option<String>,
    /// Probability of precipitation in percent; the API leaves it null for
    /// some periods.
    pub precipitation: Option<f64>,
    pub short_forecast: String,
}

impl Forecast {
    /// Numeric wind speed parsed out of the "N mph" string, when possible.
    pub fn wind_mph(&self) -> Option<f64> {
        self.wind_speed
            .as_deref()?
            .split_whitespace()
            .next()?
            .parse()
            .ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("forecast request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("forecast response missing data: {0}")]
    MissingData(String),
}

/// Narrow collaborator interface so the boost builder can be tested without
/// the network.
pub trait ForecastProvider {
    fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        kickoff: NaiveDateTime,
    ) -> Result<Forecast, ForecastError>;
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
struct PointsProperties {
    #[serde(rename = "forecastHourly")]
    forecast_hourly: String,
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    properties: HourlyProperties,
}

#[derive(Debug, Deserialize)]
struct HourlyProperties {
    periods: Vec<Period>,
}

#[derive(Debug, Deserialize)]
struct Period {
    #[serde(rename = "startTime")]
    start_time: String,
    temperature: Option<f64>,
    #[serde(rename = "windSpeed")]
    wind_speed: Option<String>,
    #[serde(rename = "probabilityOfPrecipitation", default)]
    probability_of_precipitation: Option<PrecipitationValue>,
    #[serde(rename = "shortForecast", default)]
    short_forecast: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrecipitationValue {
    value: Option<f64>,
}

// ---------------------------------------------------------------------------
// NoaaClient
// ---------------------------------------------------------------------------

/// Blocking client for the api.weather.gov forecast flow.
pub struct NoaaClient {
    http: reqwest::blocking::Client,
    points_url: String,
}

impl NoaaClient {
    /// Build a client with the given points-endpoint base URL and a request
    /// timeout applied to both hops.
    pub fn new(points_url: &str, timeout: Duration) -> Result<NoaaClient, ForecastError> {
        // The NWS API rejects requests without a User-Agent.
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gridcast/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(NoaaClient {
            http,
            points_url: points_url.trim_end_matches('/').to_string(),
        })
    }
}

impl ForecastProvider for NoaaClient {
    fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        kickoff: NaiveDateTime,
    ) -> Result<Forecast, ForecastError> {
        let points_url = format!("{}/{},{}", self.points_url, latitude, longitude);
        let points: PointsResponse = self
            .http
            .get(&points_url)
            .send()?
            .error_for_status()?
            .json()?;

        let hourly: HourlyResponse = self
            .http
            .get(&points.properties.forecast_hourly)
            .send()?
            .error_for_status()?
            .json()?;

        let period = closest_period(&hourly.properties.periods, kickoff).ok_or_else(|| {
            ForecastError::MissingData(format!("no usable forecast periods for {points_url}"))
        })?;

        Ok(Forecast {
            forecast_time: period.start_time.clone(),
            temperature: period.temperature,
            wind_speed: period.wind_speed.clone(),
            precipitation: period
                .probability_of_precipitation
                .as_ref()
                .and_then(|p| p.value),
            short_forecast: period.short_forecast.clone().unwrap_or_default(),
        })
    }
}

/// Pick the period whose local start time is nearest kickoff. Periods with
/// unparseable timestamps are skipped.
fn closest_period(periods: &[Period], kickoff: NaiveDateTime) -> Option<&Period> {
    let mut best: Option<(i64, &Period)> = None;
    for period in periods {
        let Ok(start) = DateTime::parse_from_rfc3339(&period.start_time) else {
            continue;
        };
        let delta = (start.naive_local() - kickoff).num_seconds().abs();
        if best.map_or(true, |(d, _)| delta < d) {
            best = Some((delta, period));
        }
    }
    best.map(|(_, period)| period)
}

// ---------------------------------------------------------------------------
// ForecastSource wrapper
// ---------------------------------------------------------------------------

/// High-level wrapper that is either a live provider or disabled entirely.
pub enum ForecastSource {
    /// A provider is configured and ready.
    Active(Box<dyn ForecastProvider + Send + Sync>),
    /// Forecast fetching is off; callers use the climatology fallback.
    Disabled,
}

impl ForecastSource {
    /// Build a `ForecastSource` from the weather config. Returns `Disabled`
    /// when the forecast toggle is off or the client cannot be constructed.
    pub fn from_config(weather: &WeatherConfig) -> ForecastSource {
        if !weather.forecast {
            return ForecastSource::Disabled;
        }
        match NoaaClient::new(&weather.points_url, Duration::from_secs(weather.timeout_secs)) {
            Ok(client) => ForecastSource::Active(Box::new(client)),
            Err(e) => {
                warn!("could not build forecast client ({e}), forecasts disabled");
                ForecastSource::Disabled
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ForecastSource::Active(_))
    }

    /// Fetch a forecast, or `None` when disabled or on any provider error.
    /// Provider failures are warnings, never fatal.
    pub fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        kickoff: NaiveDateTime,
    ) -> Option<Forecast> {
        match self {
            ForecastSource::Active(provider) => {
                match provider.forecast(latitude, longitude, kickoff) {
                    Ok(forecast) => Some(forecast),
                    Err(e) => {
                        warn!("forecast fetch failed ({e}), falling back to climatology");
                        None
                    }
                }
            }
            ForecastSource::Disabled => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
