// Weather and environment effects: forecast provider, climatology fallback,
// and the per-game environment boost map.

pub mod boost;
pub mod climatology;
pub mod provider;

pub use boost::{EnvironmentEntry, EnvironmentMap, WeatherLogRow, WeatherSource};
pub use climatology::ClimatePhase;
pub use provider::{Forecast, ForecastError, ForecastProvider, ForecastSource};
