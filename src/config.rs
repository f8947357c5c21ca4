// Configuration loading and parsing (model.toml, sources.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelConfig,
    pub weights: RoleWeights,
    pub role_multipliers: RoleMultipliers,
    pub simulation: SimulationConfig,
    pub data: DataPaths,
    pub weather: WeatherConfig,
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// model.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire model.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ModelFile {
    model: ModelConfig,
    weights: RoleWeights,
    role_multipliers: RoleMultipliers,
    simulation: SimulationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub season_year: i32,
    pub soft_alignment: bool,
    pub game_script_boost: bool,
    pub advanced_game_script: bool,
    pub explain_game_script: bool,
}

/// Per-role contribution weights for the matchup penalty aggregation.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleWeights {
    pub slot: f64,
    pub wide: f64,
    pub safety: f64,
    pub lb: f64,
}

/// Depth-chart role multipliers. The field names use the literal TOML keys
/// (WR1, WR2, ...), same casing the roster CSV uses for its `role` column.
#[derive(Debug, Clone, Deserialize)]
#[allow(non_snake_case)]
pub struct RoleMultipliers {
    pub WR1: f64,
    pub WR2: f64,
    pub WR3: f64,
    pub Slot: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub samples: usize,
    pub std_dev: f64,
    pub seed: u64,
}

// ---------------------------------------------------------------------------
// sources.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire sources.toml file.
#[derive(Debug, Clone, Deserialize)]
struct SourcesFile {
    data: DataPaths,
    weather: WeatherConfig,
    output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub schedule: String,
    pub receivers: String,
    pub defenders: String,
    pub coverage: String,
    pub stadiums: String,
    pub multiplier_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub forecast: bool,
    pub climate_phase: String,
    pub points_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: String,
    pub weather_log: String,
}

/// Accepted values for `weather.climate_phase`.
pub const CLIMATE_PHASES: [&str; 3] = ["el_nino", "la_nina", "neutral"];

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/model.toml` and
/// `config/sources.toml`, both relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- model.toml (required) ---
    let model_path = config_dir.join("model.toml");
    let model_text = read_file(&model_path)?;
    let model_file: ModelFile =
        toml::from_str(&model_text).map_err(|e| ConfigError::ParseError {
            path: model_path.clone(),
            source: e,
        })?;

    // --- sources.toml (required) ---
    let sources_path = config_dir.join("sources.toml");
    let sources_text = read_file(&sources_path)?;
    let sources_file: SourcesFile =
        toml::from_str(&sources_text).map_err(|e| ConfigError::ParseError {
            path: sources_path.clone(),
            source: e,
        })?;

    let config = Config {
        model: model_file.model,
        weights: model_file.weights,
        role_multipliers: model_file.role_multipliers,
        simulation: model_file.simulation,
        data: sources_file.data,
        weather: sources_file.weather,
        output: sources_file.output,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        // If config/ also doesn't exist, the app will fail to load config.
        // Return an error with a clear message about the missing defaults directory.
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        // Skip non-files and entries without a file name
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        // Skip .example template files
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, skip it
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    // Role weights may individually be zero (a role can be switched off) but
    // the total must be positive or the penalty aggregation degenerates.
    let w = &config.weights;
    let weight_fields: &[(&str, f64)] = &[
        ("weights.slot", w.slot),
        ("weights.wide", w.wide),
        ("weights.safety", w.safety),
        ("weights.lb", w.lb),
    ];
    for (name, val) in weight_fields {
        if *val < 0.0 || !val.is_finite() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be a finite value >= 0, got {val}"),
            });
        }
    }
    if w.slot + w.wide + w.safety + w.lb <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "weights".into(),
            message: "at least one role weight must be > 0".into(),
        });
    }

    // Depth-chart multipliers must all be positive
    let m = &config.role_multipliers;
    let multiplier_fields: &[(&str, f64)] = &[
        ("role_multipliers.WR1", m.WR1),
        ("role_multipliers.WR2", m.WR2),
        ("role_multipliers.WR3", m.WR3),
        ("role_multipliers.Slot", m.Slot),
    ];
    for (name, val) in multiplier_fields {
        if *val <= 0.0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be > 0, got {val}"),
            });
        }
    }

    // Simulation validations. Zero samples is legal and turns the
    // percentile spread off.
    if config.simulation.std_dev < 0.0 {
        return Err(ConfigError::ValidationError {
            field: "simulation.std_dev".into(),
            message: format!("must be >= 0, got {}", config.simulation.std_dev),
        });
    }

    // Weather validations
    let phase = config.weather.climate_phase.as_str();
    if !CLIMATE_PHASES.contains(&phase) {
        return Err(ConfigError::ValidationError {
            field: "weather.climate_phase".into(),
            message: format!("must be one of {CLIMATE_PHASES:?}, got `{phase}`"),
        });
    }
    if config.weather.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "weather.timeout_secs".into(),
            message: "must be > 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// Helper: returns the path to the project root
    /// (works whether `cargo test` runs from the crate root or elsewhere).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("gridcast/defaults").exists() {
            cwd.join("gridcast")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    #[test]
    fn load_valid_config_from_project_files() {
        let root = project_root();
        ensure_config_files(&root).expect("should copy default configs");
        let config = load_config_from(&root).expect("should load valid config");

        // Model assertions
        assert_eq!(config.model.season_year, 2025);
        assert!(config.model.soft_alignment);
        assert!(config.model.game_script_boost);
        assert!(config.model.advanced_game_script);
        assert!(!config.model.explain_game_script);

        // Weight assertions
        assert!((config.weights.slot - 1.0).abs() < f64::EPSILON);
        assert!((config.weights.wide - 1.0).abs() < f64::EPSILON);
        assert!((config.weights.safety - 0.2).abs() < f64::EPSILON);
        assert!((config.weights.lb - 0.1).abs() < f64::EPSILON);
        assert!((config.role_multipliers.WR2 - 0.8).abs() < f64::EPSILON);
        assert!((config.role_multipliers.Slot - 0.7).abs() < f64::EPSILON);

        // Simulation assertions
        assert_eq!(config.simulation.samples, 100);
        assert!((config.simulation.std_dev - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.simulation.seed, 1729);

        // Source assertions
        assert_eq!(config.data.schedule, "data/schedule.csv");
        assert_eq!(config.data.receivers, "data/wr_stats.csv");
        assert_eq!(config.data.multiplier_dir, "data/multipliers");
        assert!(config.weather.forecast);
        assert_eq!(config.weather.climate_phase, "neutral");
        assert_eq!(config.weather.points_url, "https://api.weather.gov/points");
        assert_eq!(config.weather.timeout_secs, 10);
        assert_eq!(config.output.dir, "data/results");
        assert_eq!(config.output.weather_log, "data/weather_log.csv");
    }

    #[test]
    fn rejects_negative_weight() {
        let tmp = std::env::temp_dir().join("gridcast_config_test_neg_weight");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        let model_text = fs::read_to_string(root.join("defaults/model.toml")).unwrap();
        let modified = model_text.replace("safety = 0.2", "safety = -0.2");
        fs::write(config_dir.join("model.toml"), modified).unwrap();
        fs::copy(
            root.join("defaults/sources.toml"),
            config_dir.join("sources.toml"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "weights.safety");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_all_zero_weights() {
        let tmp = std::env::temp_dir().join("gridcast_config_test_zero_weights");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        let model_text = fs::read_to_string(root.join("defaults/model.toml")).unwrap();
        let modified = model_text
            .replace("slot   = 1.0", "slot   = 0.0")
            .replace("wide   = 1.0", "wide   = 0.0")
            .replace("safety = 0.2", "safety = 0.0")
            .replace("lb     = 0.1", "lb     = 0.0");
        fs::write(config_dir.join("model.toml"), modified).unwrap();
        fs::copy(
            root.join("defaults/sources.toml"),
            config_dir.join("sources.toml"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "weights");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_role_multiplier() {
        let tmp = std::env::temp_dir().join("gridcast_config_test_zero_mult");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        let model_text = fs::read_to_string(root.join("defaults/model.toml")).unwrap();
        let modified = model_text.replace("WR3  = 0.5", "WR3  = 0.0");
        fs::write(config_dir.join("model.toml"), modified).unwrap();
        fs::copy(
            root.join("defaults/sources.toml"),
            config_dir.join("sources.toml"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "role_multipliers.WR3");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn zero_samples_is_accepted_as_simulation_off() {
        let tmp = std::env::temp_dir().join("gridcast_config_test_zero_samples");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        let model_text = fs::read_to_string(root.join("defaults/model.toml")).unwrap();
        let modified = model_text.replace("samples = 100", "samples = 0");
        fs::write(config_dir.join("model.toml"), modified).unwrap();
        fs::copy(
            root.join("defaults/sources.toml"),
            config_dir.join("sources.toml"),
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("zero samples should validate");
        assert_eq!(config.simulation.samples, 0);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unknown_climate_phase() {
        let tmp = std::env::temp_dir().join("gridcast_config_test_bad_phase");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        fs::copy(root.join("defaults/model.toml"), config_dir.join("model.toml")).unwrap();
        let sources_text = fs::read_to_string(root.join("defaults/sources.toml")).unwrap();
        let modified = sources_text.replace(
            "climate_phase = \"neutral\"",
            "climate_phase = \"la_ninja\"",
        );
        fs::write(config_dir.join("sources.toml"), modified).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "weather.climate_phase");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_model_toml() {
        let tmp = std::env::temp_dir().join("gridcast_config_test_missing_model");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        // No model.toml written
        let root = project_root();
        fs::copy(
            root.join("defaults/sources.toml"),
            config_dir.join("sources.toml"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("model.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_sources_toml() {
        let tmp = std::env::temp_dir().join("gridcast_config_test_missing_sources");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        fs::copy(root.join("defaults/model.toml"), config_dir.join("model.toml")).unwrap();
        // No sources.toml written

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("sources.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = std::env::temp_dir().join("gridcast_config_test_invalid_toml");
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();

        fs::write(config_dir.join("model.toml"), "this is not valid [[[ toml").unwrap();

        let root = project_root();
        fs::copy(
            root.join("defaults/sources.toml"),
            config_dir.join("sources.toml"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => {
                assert!(path.ends_with("model.toml"));
            }
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("gridcast_config_test_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);

        // Create defaults/ with model.toml and sources.toml
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();

        let root = project_root();
        fs::copy(root.join("defaults/model.toml"), defaults_dir.join("model.toml")).unwrap();
        fs::copy(root.join("defaults/sources.toml"), defaults_dir.join("sources.toml")).unwrap();
        // Add an example file that should NOT be copied
        fs::write(
            defaults_dir.join("sources.toml.example"),
            "# template\n",
        )
        .unwrap();

        // No config/ dir exists yet
        assert!(!tmp.join("config").exists());

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 2);

        // config/ should now exist with both files
        assert!(tmp.join("config/model.toml").exists());
        assert!(tmp.join("config/sources.toml").exists());
        // example file should NOT have been copied
        assert!(!tmp.join("config/sources.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = std::env::temp_dir().join("gridcast_config_test_ensure_skips");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        let config_dir = tmp.join("config");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        fs::copy(root.join("defaults/model.toml"), defaults_dir.join("model.toml")).unwrap();
        fs::copy(root.join("defaults/sources.toml"), defaults_dir.join("sources.toml")).unwrap();

        // Pre-create model.toml in config/ with custom content
        fs::write(config_dir.join("model.toml"), "# custom\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        // Only sources.toml should be copied (model.toml already exists)
        assert_eq!(copied.len(), 1);
        assert!(copied[0].ends_with("sources.toml"));

        // Original custom content should be preserved
        let content = fs::read_to_string(config_dir.join("model.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_no_defaults_dir_is_ok() {
        let tmp = std::env::temp_dir().join("gridcast_config_test_no_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        // Create config/ so it's not an error (just no defaults to copy)
        fs::create_dir_all(tmp.join("config")).unwrap();

        // No defaults/ directory, but config/ exists - should succeed
        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert!(copied.is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("gridcast_config_test_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        // Neither defaults/ nor config/ exist
        let err = ensure_config_files(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
