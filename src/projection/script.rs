// Game-script boost: a signed percentage adjustment reflecting expected game
// flow. Teams projected to trail throw more, so their receivers get a bump.

use crate::config::RoleMultipliers;
use crate::data::{MatchupRow, MultiplierRegistry, Receiver, ReceiverRole, ScalarTable};
use std::fmt;

// ---------------------------------------------------------------------------
// Explanation traces
// ---------------------------------------------------------------------------

/// Where a boost came from, for the optional explanation column.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptTrace {
    /// Every intermediate factor of the advanced model.
    Advanced {
        base: f64,
        team: f64,
        wr: f64,
        qb: f64,
        qb_agg: f64,
        pace: f64,
        def: f64,
        pressure: f64,
        role: f64,
        air: f64,
        competition: f64,
        injury: f64,
        final_boost: f64,
    },
    /// Which branch of the legacy step function fired.
    Legacy(&'static str),
    /// Projected scores were absent or unparseable; the boost is 0.0.
    MissingScores,
}

impl fmt::Display for ScriptTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptTrace::Advanced {
                base,
                team,
                wr,
                qb,
                qb_agg,
                pace,
                def,
                pressure,
                role,
                air,
                competition,
                injury,
                final_boost,
            } => write!(
                f,
                "base={base:.3}, team={team:.2}, wr={wr:.2}, qb={qb:.2}, \
                 qb_agg={qb_agg:.2}, pace={pace:.2}, def={def:.2}, \
                 pressure={pressure:.2}, role={role:.2}, air={air:.2}, \
                 competition={competition:.2}, injury={injury:.2} \
                 => final={final_boost:.4}"
            ),
            ScriptTrace::Legacy(branch) => write!(f, "legacy: {branch}"),
            ScriptTrace::MissingScores => write!(f, "no projected scores"),
        }
    }
}

// ---------------------------------------------------------------------------
// Boost models
// ---------------------------------------------------------------------------

/// Everything the advanced model reads besides the scoreline itself.
pub struct ScriptInputs<'a> {
    pub receiver: &'a Receiver,
    pub opponent: &'a str,
    pub week: u32,
    pub registry: &'a MultiplierRegistry,
    pub role_multipliers: &'a RoleMultipliers,
}

/// The receiver's team's projected deficit: positive when trailing. `None`
/// when either projected score is missing.
pub fn projected_deficit(matchup: &MatchupRow, team: &str) -> Option<f64> {
    let home = matchup.projected_home?;
    let away = matchup.projected_away?;
    if matchup.home == team {
        Some(away - home)
    } else {
        Some(home - away)
    }
}

/// Flat step model kept for comparison runs: clearly trailing teams get
/// +10%, clearly leading teams −5%.
pub fn legacy_boost(deficit: f64) -> (f64, ScriptTrace) {
    if deficit > 7.0 {
        (0.10, ScriptTrace::Legacy("trailing"))
    } else if deficit < -7.0 {
        (-0.05, ScriptTrace::Legacy("leading"))
    } else {
        (0.0, ScriptTrace::Legacy("neutral"))
    }
}

/// Scale the clamped deficit by eleven independent multipliers. Every lookup
/// defaults to 1.0, so an empty registry reproduces the clamp exactly.
pub fn advanced_boost(inputs: &ScriptInputs<'_>, deficit: f64) -> (f64, ScriptTrace) {
    let base = (deficit * 0.015).clamp(-0.07, 0.12);

    let receiver = inputs.receiver;
    let registry = inputs.registry;
    let qb_name = receiver.quarterback.as_deref().unwrap_or("");

    let team = registry.scalar(ScalarTable::TeamScriptResponse, &receiver.team);
    let wr = registry.scalar(ScalarTable::WrScriptSensitivity, &receiver.name);
    let qb = registry.scalar(ScalarTable::QbScriptResponse, qb_name);
    let qb_agg = registry.scalar(ScalarTable::QbAggressiveness, qb_name);
    let pace = registry.pace(inputs.week, &receiver.team);
    let def = registry.scalar(ScalarTable::DefPassRateAllowed, inputs.opponent);
    let pressure = registry.scalar(ScalarTable::DefPressureRateAllowed, inputs.opponent);
    let role = role_factor(receiver.role, inputs.role_multipliers);
    let air = registry.scalar(ScalarTable::WrAirYardsShare, &receiver.name);
    let competition = registry.scalar(ScalarTable::WrTargetCompetition, &receiver.name);
    let injury = registry.scalar(ScalarTable::WrInjuryStatus, &receiver.name);

    let product = base
        * team
        * wr
        * qb
        * qb_agg
        * pace
        * def
        * pressure
        * role
        * air
        * competition
        * injury;
    let final_boost = round4(product);

    let trace = ScriptTrace::Advanced {
        base,
        team,
        wr,
        qb,
        qb_agg,
        pace,
        def,
        pressure,
        role,
        air,
        competition,
        injury,
        final_boost,
    };
    (final_boost, trace)
}

/// Model dispatch. Unusable projected scores neutralize the boost instead of
/// failing the projection.
pub fn script_boost(
    inputs: &ScriptInputs<'_>,
    matchup: &MatchupRow,
    advanced: bool,
) -> (f64, ScriptTrace) {
    let Some(deficit) = projected_deficit(matchup, &inputs.receiver.team) else {
        return (0.0, ScriptTrace::MissingScores);
    };
    if advanced {
        advanced_boost(inputs, deficit)
    } else {
        legacy_boost(deficit)
    }
}

fn role_factor(role: Option<ReceiverRole>, multipliers: &RoleMultipliers) -> f64 {
    match role {
        Some(ReceiverRole::Wr1) => multipliers.WR1,
        Some(ReceiverRole::Wr2) => multipliers.WR2,
        Some(ReceiverRole::Wr3) => multipliers.WR3,
        Some(ReceiverRole::Slot) => multipliers.Slot,
        None => 1.0,
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
