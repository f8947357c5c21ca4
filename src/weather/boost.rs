// Environment boost map: one entry per (week, team) describing how the
// game's venue and weather scale receiver production. Built once, before
// any projection work, by the thread that owns the weather log.

use crate::data::{Schedule, StadiumMap, StadiumProfile};
use crate::weather::climatology::{self, ClimatePhase};
use crate::weather::provider::{Forecast, ForecastSource};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// How an entry's boost was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherSource {
    Forecast,
    Climatology,
    Dome,
    /// No stadium profile for the home team; everything stays neutral.
    Missing,
}

#[derive(Debug, Clone)]
pub struct EnvironmentEntry {
    pub boost: f64,
    pub deep_penalty: f64,
    pub short_penalty: f64,
    /// Human-readable condition ("Dome", a short forecast, ...).
    pub condition: String,
    pub source: WeatherSource,
}

/// `(week, team) -> entry`, registered under both sides of each game.
pub type EnvironmentMap = HashMap<(u32, String), EnvironmentEntry>;

/// One appended line of the weather log. Forecast columns stay empty for
/// dome and climatology entries.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherLogRow {
    pub week: u32,
    pub stadium: String,
    pub game_date: NaiveDate,
    pub lat: f64,
    pub lon: f64,
    pub forecast_time: String,
    pub temperature: Option<f64>,
    pub wind_speed: Option<String>,
    pub precipitation: Option<f64>,
    pub short_forecast: String,
    pub boost: f64,
    pub source: WeatherSource,
}

// ---------------------------------------------------------------------------
// Boost math
// ---------------------------------------------------------------------------

/// Scalar boost from a live forecast: additive penalties against a 1.0
/// baseline for precipitation, cold, and wind. Fields the forecast lacks
/// contribute nothing.
pub fn forecast_boost(forecast: &Forecast) -> f64 {
    let mut boost = 1.0;

    let precip = forecast.precipitation.unwrap_or(0.0);
    boost -= precip / 100.0 * 1.5;

    if let Some(temp) = forecast.temperature {
        if temp < 35.0 {
            boost -= ((35.0 - temp) * 0.1).min(1.5);
        }
    }

    if let Some(wind) = forecast.wind_mph() {
        if wind >= 10.0 {
            boost -= ((wind - 10.0) * 0.1).min(1.0);
        }
    }

    boost
}

/// Route-class penalties: deep targets suffer in wind, rain, and hard cold;
/// short targets only degrade in extremes. Floored at 0.75 and 0.90.
pub fn route_penalties(forecast: &Forecast) -> (f64, f64) {
    let temp = forecast.temperature.unwrap_or(60.0);
    let wind = forecast.wind_mph().unwrap_or(0.0);
    let precip = forecast.precipitation.unwrap_or(0.0);

    let mut deep = 1.0;
    if wind >= 15.0 {
        deep -= (wind - 14.0) * 0.01;
    }
    if precip >= 50.0 {
        deep -= 0.10;
    }
    if temp < 32.0 {
        deep -= 0.05;
    }
    let deep = deep.max(0.75);

    let mut short: f64 = 1.0;
    if precip >= 80.0 {
        short -= 0.03;
    }
    if temp < 25.0 {
        short -= 0.02;
    }
    let short = short.max(0.90);

    (deep, short)
}

// ---------------------------------------------------------------------------
// Map construction
// ---------------------------------------------------------------------------

/// Build environment entries for every game in the given weeks. One forecast
/// fetch serves a whole game; an in-run cache collapses duplicate
/// (coordinates, kickoff) fetches. Returns the map plus the weather-log rows
/// for the caller to append.
pub fn build_environment_map(
    schedule: &Schedule,
    stadiums: &StadiumMap,
    weeks: &[u32],
    source: &ForecastSource,
    phase: ClimatePhase,
) -> (EnvironmentMap, Vec<WeatherLogRow>) {
    let mut map = EnvironmentMap::new();
    let mut log = Vec::new();
    let mut fetch_cache: HashMap<(u64, u64, NaiveDateTime), Option<Forecast>> = HashMap::new();

    for &week in weeks {
        for matchup in schedule.for_week(week) {
            let Some(profile) = stadiums.get(&matchup.home) else {
                debug!(
                    "no stadium profile for {}, week {} environment stays neutral",
                    matchup.home, week
                );
                insert_both_teams(
                    &mut map,
                    week,
                    &matchup.home,
                    &matchup.away,
                    EnvironmentEntry {
                        boost: 1.0,
                        deep_penalty: 1.0,
                        short_penalty: 1.0,
                        condition: "Unknown".to_string(),
                        source: WeatherSource::Missing,
                    },
                );
                continue;
            };

            if profile.dome {
                let entry = EnvironmentEntry {
                    boost: 1.05,
                    deep_penalty: 1.0,
                    short_penalty: 1.0,
                    condition: "Dome".to_string(),
                    source: WeatherSource::Dome,
                };
                log.push(log_row(week, matchup.date, profile, None, entry.boost, entry.source));
                insert_both_teams(&mut map, week, &matchup.home, &matchup.away, entry);
                continue;
            }

            let cache_key = (
                profile.latitude.to_bits(),
                profile.longitude.to_bits(),
                matchup.kickoff,
            );
            let forecast = fetch_cache
                .entry(cache_key)
                .or_insert_with(|| {
                    source.fetch(profile.latitude, profile.longitude, matchup.kickoff)
                })
                .clone();

            let entry = match &forecast {
                Some(forecast) => {
                    let (deep_penalty, short_penalty) = route_penalties(forecast);
                    EnvironmentEntry {
                        boost: forecast_boost(forecast),
                        deep_penalty,
                        short_penalty,
                        condition: forecast.short_forecast.clone(),
                        source: WeatherSource::Forecast,
                    }
                }
                None => EnvironmentEntry {
                    boost: climatology::estimate(profile, week, phase),
                    deep_penalty: 1.0,
                    short_penalty: 1.0,
                    condition: "Estimated".to_string(),
                    source: WeatherSource::Climatology,
                },
            };

            log.push(log_row(
                week,
                matchup.date,
                profile,
                forecast.as_ref(),
                entry.boost,
                entry.source,
            ));
            insert_both_teams(&mut map, week, &matchup.home, &matchup.away, entry);
        }
    }

    info!(
        "environment map ready: {} entries over {} weeks",
        map.len(),
        weeks.len()
    );
    (map, log)
}

fn insert_both_teams(
    map: &mut EnvironmentMap,
    week: u32,
    home: &str,
    away: &str,
    entry: EnvironmentEntry,
) {
    map.insert((week, home.to_string()), entry.clone());
    map.insert((week, away.to_string()), entry);
}

fn log_row(
    week: u32,
    game_date: NaiveDate,
    profile: &StadiumProfile,
    forecast: Option<&Forecast>,
    boost: f64,
    source: WeatherSource,
) -> WeatherLogRow {
    WeatherLogRow {
        week,
        stadium: profile.team.clone(),
        game_date,
        lat: profile.latitude,
        lon: profile.longitude,
        forecast_time: forecast.map(|f| f.forecast_time.clone()).unwrap_or_default(),
        temperature: forecast.and_then(|f| f.temperature),
        wind_speed: forecast.and_then(|f| f.wind_speed.clone()),
        precipitation: forecast.and_then(|f| f.precipitation),
        short_forecast: forecast.map(|f| f.short_forecast.clone()).unwrap_or_default(),
        boost: (boost * 1_000.0).round() / 1_000.0,
        source,
    }
}

/// Append log rows to the weather log CSV, writing the header only when the
/// file is new or empty.
pub fn append_weather_log(path: &Path, rows: &[WeatherLogRow]) -> Result<(), csv::Error> {
    if rows.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
