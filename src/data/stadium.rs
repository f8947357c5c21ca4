// Stadium environment profiles: coordinates plus the static attributes the
// climatology estimator runs on.

use super::{lenient_f64, LoadError};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurfType {
    Natural,
    Hybrid,
    Artificial,
    Unknown,
}

impl TurfType {
    /// Matches by substring so labels like "natural grass" or
    /// "artificial (slit film)" land in the right bucket.
    pub fn parse(s: &str) -> TurfType {
        let s = s.to_lowercase();
        if s.contains("natural") {
            TurfType::Natural
        } else if s.contains("hybrid") {
            TurfType::Hybrid
        } else if s.contains("artificial") {
            TurfType::Artificial
        } else {
            TurfType::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumidityControl {
    Yes,
    Partial,
    None,
}

impl HumidityControl {
    pub fn parse(s: &str) -> HumidityControl {
        let s = s.to_lowercase();
        if s.contains("yes") {
            HumidityControl::Yes
        } else if s.contains("partial") {
            HumidityControl::Partial
        } else {
            HumidityControl::None
        }
    }
}

#[derive(Debug, Clone)]
pub struct StadiumProfile {
    pub team: String,
    pub latitude: f64,
    pub longitude: f64,
    pub dome: bool,
    pub cold_prone: bool,
    pub wind_prone: bool,
    pub high_altitude: bool,
    pub turf: TurfType,
    pub humidity_control: HumidityControl,
    pub state: String,
}

/// Stadium profiles keyed by home team.
pub type StadiumMap = HashMap<String, StadiumProfile>;

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[allow(dead_code, non_snake_case)]
struct RawStadiumRow {
    Team: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    Latitude: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    Longitude: f64,
    #[serde(default)]
    Dome: String,
    #[serde(default)]
    ColdProne: String,
    #[serde(default)]
    WindProne: String,
    #[serde(default)]
    HighAltitude: String,
    #[serde(default)]
    TurfType: String,
    #[serde(default)]
    HumidityControl: String,
    #[serde(default)]
    State: String,
    /// Absorb any extra columns the export includes.
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

/// Flag cells come in several spellings across exports (TRUE, yes, 1).
/// Anything unrecognized is false.
fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "true" | "yes" | "y" | "1"
    )
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

fn load_stadiums_from_reader<R: Read>(rdr: R) -> Result<StadiumMap, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut map = StadiumMap::new();
    for result in reader.deserialize::<RawStadiumRow>() {
        match result {
            Ok(raw) => {
                let team = raw.Team.trim().to_string();
                if team.is_empty() {
                    warn!("skipping stadium row with empty Team cell");
                    continue;
                }
                map.insert(
                    team.clone(),
                    StadiumProfile {
                        team,
                        latitude: raw.Latitude,
                        longitude: raw.Longitude,
                        dome: parse_flag(&raw.Dome),
                        cold_prone: parse_flag(&raw.ColdProne),
                        wind_prone: parse_flag(&raw.WindProne),
                        high_altitude: parse_flag(&raw.HighAltitude),
                        turf: TurfType::parse(&raw.TurfType),
                        humidity_control: HumidityControl::parse(&raw.HumidityControl),
                        state: raw.State.trim().to_uppercase(),
                    },
                );
            }
            Err(e) => {
                warn!("skipping malformed stadium row: {}", e);
            }
        }
    }
    Ok(map)
}

/// Load stadium environment profiles from a CSV file, keyed by home team.
pub fn load_stadiums(path: &Path) -> Result<StadiumMap, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_stadiums_from_reader(file).map_err(|e| LoadError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
