// Matchup projection: alignment/penalty model, game-script boost, and the
// per-receiver week projector that combines them.

pub mod alignment;
pub mod projector;
pub mod script;

pub use alignment::{Role, RoleSet};
pub use projector::{project, PenaltyCache, ProjectionContext, ProjectionLedger, WeekProjection};
pub use script::ScriptTrace;
