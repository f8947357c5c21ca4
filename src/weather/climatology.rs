// Climatology-based environment estimate, used whenever no live forecast is
// available. Driven entirely by static stadium attributes plus the season
// week and the configured climate phase, so it can never fail.

use crate::data::{HumidityControl, StadiumProfile, TurfType};

// ---------------------------------------------------------------------------
// Climate phase
// ---------------------------------------------------------------------------

/// Large-scale seasonal pattern, set once per season in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimatePhase {
    ElNino,
    LaNina,
    Neutral,
}

impl ClimatePhase {
    /// Parse the config string. Unrecognized values read as neutral.
    pub fn parse(s: &str) -> ClimatePhase {
        match s.trim().to_lowercase().as_str() {
            "el_nino" => ClimatePhase::ElNino,
            "la_nina" => ClimatePhase::LaNina,
            _ => ClimatePhase::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Northeast,
    Midwest,
    Southeast,
    Southwest,
    Northwest,
    Neutral,
}

fn classify_region(state: &str) -> Region {
    match state {
        "NY" | "PA" | "MA" | "NJ" | "CT" | "RI" | "NH" | "VT" | "ME" => Region::Northeast,
        "IL" | "OH" | "MI" | "WI" | "IN" | "IA" | "MN" | "MO" | "NE" | "KS" => Region::Midwest,
        "FL" | "GA" | "SC" | "NC" | "AL" | "TN" | "MS" | "KY" | "VA" => Region::Southeast,
        "AZ" | "NM" | "TX" | "OK" => Region::Southwest,
        "WA" | "OR" | "ID" | "MT" | "WY" | "CO" | "UT" => Region::Northwest,
        _ => Region::Neutral,
    }
}

fn phase_modifier(phase: ClimatePhase, region: Region) -> f64 {
    match (phase, region) {
        (ClimatePhase::ElNino, Region::Northeast) => 1.1,
        (ClimatePhase::ElNino, Region::Midwest) => 1.1,
        (ClimatePhase::ElNino, Region::Southwest) => 0.95,
        (ClimatePhase::LaNina, Region::Northwest) => 1.1,
        (ClimatePhase::LaNina, Region::Southeast) => 1.1,
        (ClimatePhase::LaNina, Region::Midwest) => 0.95,
        _ => 1.0,
    }
}

// ---------------------------------------------------------------------------
// The estimate
// ---------------------------------------------------------------------------

/// Estimate an environment boost from static stadium attributes. Domes get
/// the fixed favorable value; open stadiums stack seasonal, surface, and
/// regional modifiers onto 1.0. Rounded to 3 decimals.
pub fn estimate(profile: &StadiumProfile, week: u32, phase: ClimatePhase) -> f64 {
    if profile.dome {
        return 1.05;
    }

    let mut boost = 1.0;

    // Late-season weather exposure.
    if week >= 12 {
        if profile.cold_prone {
            boost *= 0.95;
        }
        if profile.wind_prone {
            boost *= 0.97;
        }
    } else if week >= 8 && profile.cold_prone {
        boost *= 0.98;
    }

    if profile.high_altitude {
        boost *= 0.98;
    }

    boost *= match profile.turf {
        TurfType::Natural => 0.99,
        TurfType::Hybrid => 1.0,
        TurfType::Artificial => 1.02,
        TurfType::Unknown => 1.0,
    };

    boost *= match profile.humidity_control {
        HumidityControl::Yes => 1.01,
        HumidityControl::Partial => 1.0,
        HumidityControl::None => 0.99,
    };

    boost *= phase_modifier(phase, classify_region(&profile.state));

    (boost * 1_000.0).round() / 1_000.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
