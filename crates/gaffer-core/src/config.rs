// Configuration loading and parsing (engine.toml, source.toml).

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Files under `config/`, each seeded from `defaults/` when absent.
pub const CONFIG_FILES: [&str; 2] = ["engine.toml", "source.toml"];

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Unreadable { path: PathBuf, source: io::Error },

    #[error("{path} is not valid: {source}")]
    Malformed {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("`{field}` {message}")]
    OutOfRange { field: String, message: String },

    #[error("config/{file} is missing and {} has no copy to seed it from", .dir.display())]
    NoDefault { file: &'static str, dir: PathBuf },

    #[error("cannot seed {path} from defaults: {source}")]
    Seed { path: PathBuf, source: io::Error },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    pub source: SourceConfig,
}

// ---------------------------------------------------------------------------
// engine.toml structs
// ---------------------------------------------------------------------------

/// Every tunable of the decision engine. `Default` matches `defaults/engine.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub model: ModelConfig,
    pub squad: SquadConfig,
    pub transfers: TransferConfig,
    pub captain: CaptainConfig,
    pub chips: ChipConfig,
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Horizon (rounds) used when the caller does not supply one.
    pub default_horizon: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig { default_horizon: 5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SquadConfig {
    /// Total budget in tenths (1000 = 100.0m).
    pub budget: u32,
    pub max_per_team: usize,
}

impl Default for SquadConfig {
    fn default() -> Self {
        SquadConfig {
            budget: 1000,
            max_per_team: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Points deducted for each transfer beyond the free allowance.
    pub penalty_points: u32,
    pub default_horizon: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig {
            penalty_points: 4,
            default_horizon: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptainConfig {
    /// Ownership percentage below which a player counts as a differential.
    pub differential_ownership: f64,
    /// Ceiling a single-fixture captain must exceed for a triple captain.
    pub triple_captain_ceiling: f64,
    /// Fixture difficulty a single-fixture captain must be below.
    pub triple_captain_difficulty: f64,
}

impl Default for CaptainConfig {
    fn default() -> Self {
        CaptainConfig {
            differential_ownership: 10.0,
            triple_captain_ceiling: 15.0,
            triple_captain_difficulty: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChipConfig {
    pub wildcard_threshold: f64,
    /// Threshold used instead when the horizon is shorter than five rounds.
    pub wildcard_short_horizon_threshold: f64,
    pub wildcard_horizon: u32,
    /// Fixture rating at or above which a fixture counts as difficult.
    pub difficult_fixture_rating: f64,
    pub difficult_fixture_count: usize,
    /// Single-round score below which a player is expected to blank.
    pub near_zero_score: f64,
    pub near_zero_count: usize,
    pub low_lineup_score: f64,
    /// Number of double-round teams that makes a round "big".
    pub big_double_round_teams: usize,
    pub strong_bench_score: f64,
    pub double_round_bench_score: f64,
    pub decent_bench_score: f64,
}

impl Default for ChipConfig {
    fn default() -> Self {
        ChipConfig {
            wildcard_threshold: 20.0,
            wildcard_short_horizon_threshold: 15.0,
            wildcard_horizon: 10,
            difficult_fixture_rating: 4.0,
            difficult_fixture_count: 8,
            near_zero_score: 2.0,
            near_zero_count: 7,
            low_lineup_score: 35.0,
            big_double_round_teams: 5,
            strong_bench_score: 15.0,
            double_round_bench_score: 12.0,
            decent_bench_score: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget for a single integer-program solve.
    pub time_budget_ms: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_budget_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// source.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for source.toml.
#[derive(Debug, Clone, Deserialize)]
struct SourceFile {
    source: SourceConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Fpl,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    /// Snapshot JSON document read by the file provider.
    pub snapshot_path: String,
    /// Directory of `entry_<id>.json` files read by the file provider.
    pub entry_dir: String,
    pub cache_ttl_secs: u64,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Read `config/engine.toml` and `config/source.toml` under `base_dir` and
/// validate the result. Missing files are an error here; `load_config`
/// seeds them first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");
    let engine: EngineConfig = parse_toml(&config_dir.join("engine.toml"))?;
    let SourceFile { source } = parse_toml(&config_dir.join("source.toml"))?;

    let config = Config { engine, source };
    validate(&config)?;
    Ok(config)
}

/// Copy each of `CONFIG_FILES` missing from `config/` out of `defaults/`.
/// Files already present are never touched. Returns the paths written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    let defaults_dir = base_dir.join("defaults");

    let mut seeded = Vec::new();
    for file in CONFIG_FILES {
        let target = config_dir.join(file);
        if target.is_file() {
            continue;
        }
        let shipped = defaults_dir.join(file);
        if !shipped.is_file() {
            return Err(ConfigError::NoDefault {
                file,
                dir: defaults_dir,
            });
        }
        let seed_error = |source| ConfigError::Seed {
            path: target.clone(),
            source,
        };
        fs::create_dir_all(&config_dir).map_err(seed_error)?;
        fs::copy(&shipped, &target).map_err(seed_error)?;
        seeded.push(target);
    }
    Ok(seeded)
}

/// Where `config/` lives: the working directory when it carries `config/`
/// or `defaults/`, else the per-user directory (`~/.config/gaffer`).
pub fn resolve_base_dir() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if cwd.join("config").is_dir() || cwd.join("defaults").is_dir() {
        return cwd;
    }
    directories::ProjectDirs::from("", "", "gaffer")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or(cwd)
}

/// Seed missing files from the shipped defaults, then load.
pub fn load_config() -> Result<Config, ConfigError> {
    let base = resolve_base_dir();
    ensure_config_files(&base)?;
    load_config_from(&base)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::OutOfRange {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate engine settings. Exposed so callers building an `EngineConfig`
/// in code get the same checks as file-based configs.
pub fn validate_engine(engine: &EngineConfig) -> Result<(), ConfigError> {
    if engine.model.default_horizon == 0 {
        return Err(invalid("model.default_horizon", "must be greater than 0"));
    }
    if engine.squad.budget == 0 {
        return Err(invalid("squad.budget", "must be greater than 0"));
    }
    if engine.squad.max_per_team == 0 {
        return Err(invalid("squad.max_per_team", "must be greater than 0"));
    }
    if engine.transfers.default_horizon == 0 {
        return Err(invalid("transfers.default_horizon", "must be greater than 0"));
    }
    if engine.chips.wildcard_horizon == 0 {
        return Err(invalid("chips.wildcard_horizon", "must be greater than 0"));
    }

    let own = engine.captain.differential_ownership;
    if !(0.0..=100.0).contains(&own) {
        return Err(invalid(
            "captain.differential_ownership",
            format!("must be between 0 and 100 inclusive, got {own}"),
        ));
    }

    let rating = engine.chips.difficult_fixture_rating;
    if !(1.0..=5.0).contains(&rating) {
        return Err(invalid(
            "chips.difficult_fixture_rating",
            format!("must be between 1 and 5 inclusive, got {rating}"),
        ));
    }

    // Score thresholds must be non-negative and finite
    let c = &engine.chips;
    let thresholds: &[(&str, f64)] = &[
        ("chips.wildcard_threshold", c.wildcard_threshold),
        (
            "chips.wildcard_short_horizon_threshold",
            c.wildcard_short_horizon_threshold,
        ),
        ("chips.near_zero_score", c.near_zero_score),
        ("chips.low_lineup_score", c.low_lineup_score),
        ("chips.strong_bench_score", c.strong_bench_score),
        ("chips.double_round_bench_score", c.double_round_bench_score),
        ("chips.decent_bench_score", c.decent_bench_score),
        ("captain.triple_captain_ceiling", engine.captain.triple_captain_ceiling),
        (
            "captain.triple_captain_difficulty",
            engine.captain.triple_captain_difficulty,
        ),
    ];
    for (name, val) in thresholds {
        if !val.is_finite() || *val < 0.0 {
            return Err(invalid(name, format!("must be a finite value >= 0, got {val}")));
        }
    }

    if engine.solver.time_budget_ms == 0 {
        return Err(invalid("solver.time_budget_ms", "must be greater than 0"));
    }

    Ok(())
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_engine(&config.engine)?;

    let source = &config.source;
    match source.provider {
        ProviderKind::Fpl => {
            if source.base_url.trim().is_empty() {
                return Err(invalid("source.base_url", "must not be empty for the fpl provider"));
            }
        }
        ProviderKind::File => {
            if source.snapshot_path.trim().is_empty() {
                return Err(invalid(
                    "source.snapshot_path",
                    "must not be empty for the file provider",
                ));
            }
        }
    }
    if source.cache_ttl_secs == 0 {
        return Err(invalid("source.cache_ttl_secs", "must be greater than 0"));
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

    /// The workspace root holding `defaults/`.
    fn project_root() -> PathBuf {
        let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let root = manifest.join("../..");
        assert!(
            root.join("defaults").exists(),
            "Cannot locate defaults/ directory from {:?}",
            manifest
        );
        root
    }

    /// Fresh temp dir with `config/` populated from the shipped defaults.
    fn temp_config_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        let config_dir = tmp.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        let root = project_root();
        fs::copy(root.join("defaults/engine.toml"), config_dir.join("engine.toml")).unwrap();
        fs::copy(root.join("defaults/source.toml"), config_dir.join("source.toml")).unwrap();
        tmp
    }

    #[test]
    fn load_valid_config_from_default_files() {
        let tmp = temp_config_dir("gaffer_config_defaults");
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.engine.squad.budget, 1000);
        assert_eq!(config.engine.squad.max_per_team, 3);
        assert_eq!(config.engine.transfers.penalty_points, 4);
        assert_eq!(config.engine.chips.wildcard_horizon, 10);
        assert!((config.engine.chips.wildcard_threshold - 20.0).abs() < f64::EPSILON);
        assert!((config.engine.chips.strong_bench_score - 15.0).abs() < f64::EPSILON);
        assert!((config.engine.captain.differential_ownership - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.source.provider, ProviderKind::Fpl);
        assert_eq!(config.source.base_url, "https://fantasy.premierleague.com/api");
        assert_eq!(config.source.cache_ttl_secs, 300);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn shipped_engine_defaults_match_code_defaults() {
        let tmp = temp_config_dir("gaffer_config_code_defaults");
        let config = load_config_from(&tmp).unwrap();
        let code = EngineConfig::default();

        assert_eq!(config.engine.model.default_horizon, code.model.default_horizon);
        assert_eq!(config.engine.solver.time_budget_ms, code.solver.time_budget_ms);
        assert_eq!(
            config.engine.chips.difficult_fixture_count,
            code.chips.difficult_fixture_count
        );
        assert!(
            (config.engine.chips.low_lineup_score - code.chips.low_lineup_score).abs()
                < f64::EPSILON
        );
        assert!(
            (config.engine.captain.triple_captain_ceiling - code.captain.triple_captain_ceiling)
                .abs()
                < f64::EPSILON
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn partial_engine_toml_falls_back_to_defaults() {
        let tmp = temp_config_dir("gaffer_config_partial");
        fs::write(
            tmp.join("config/engine.toml"),
            "[transfers]\npenalty_points = 8\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.engine.transfers.penalty_points, 8);
        assert_eq!(config.engine.transfers.default_horizon, 5);
        assert_eq!(config.engine.squad.budget, 1000);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_budget() {
        let tmp = temp_config_dir("gaffer_config_zero_budget");
        let text = fs::read_to_string(tmp.join("config/engine.toml")).unwrap();
        fs::write(
            tmp.join("config/engine.toml"),
            text.replace("budget = 1000", "budget = 0"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::OutOfRange { field, .. } => assert_eq!(field, "squad.budget"),
            other => panic!("expected OutOfRange, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_out_of_range_difficulty_rating() {
        let tmp = temp_config_dir("gaffer_config_bad_rating");
        let text = fs::read_to_string(tmp.join("config/engine.toml")).unwrap();
        fs::write(
            tmp.join("config/engine.toml"),
            text.replace("difficult_fixture_rating = 4.0", "difficult_fixture_rating = 6.0"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::OutOfRange { field, .. } => {
                assert_eq!(field, "chips.difficult_fixture_rating")
            }
            other => panic!("expected OutOfRange, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_negative_threshold() {
        let tmp = temp_config_dir("gaffer_config_negative_threshold");
        let text = fs::read_to_string(tmp.join("config/engine.toml")).unwrap();
        fs::write(
            tmp.join("config/engine.toml"),
            text.replace("strong_bench_score = 15.0", "strong_bench_score = -1.0"),
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::OutOfRange { field, .. } => {
                assert_eq!(field, "chips.strong_bench_score")
            }
            other => panic!("expected OutOfRange, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_provider_requires_snapshot_path() {
        let tmp = temp_config_dir("gaffer_config_file_provider");
        fs::write(
            tmp.join("config/source.toml"),
            r#"
[source]
provider = "file"
base_url = ""
snapshot_path = ""
entry_dir = "data/entries"
cache_ttl_secs = 60
"#,
        )
        .unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::OutOfRange { field, .. } => {
                assert_eq!(field, "source.snapshot_path")
            }
            other => panic!("expected OutOfRange, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_source_toml() {
        let tmp = temp_config_dir("gaffer_config_missing_source");
        fs::remove_file(tmp.join("config/source.toml")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::Unreadable { path, .. } => assert!(path.ends_with("source.toml")),
            other => panic!("expected Unreadable, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_toml_names_the_file() {
        let tmp = temp_config_dir("gaffer_config_invalid_toml");
        fs::write(tmp.join("config/engine.toml"), "this is not valid [[[ toml").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::Malformed { path, .. } => assert!(path.ends_with("engine.toml")),
            other => panic!("expected Malformed, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_seeds_only_missing_known_files() {
        let tmp = std::env::temp_dir().join("gaffer_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        let defaults_dir = tmp.join("defaults");
        let config_dir = tmp.join("config");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        for file in CONFIG_FILES {
            fs::copy(root.join("defaults").join(file), defaults_dir.join(file)).unwrap();
        }
        fs::write(defaults_dir.join("notes.toml"), "# not a config file\n").unwrap();
        fs::write(config_dir.join("engine.toml"), "# custom\n").unwrap();

        let seeded = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(seeded, vec![config_dir.join("source.toml")]);
        assert!(!config_dir.join("notes.toml").exists());
        assert_eq!(
            fs::read_to_string(config_dir.join("engine.toml")).unwrap(),
            "# custom\n"
        );
        assert!(ensure_config_files(&tmp).unwrap().is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_needs_a_default_for_each_missing_file() {
        let tmp = std::env::temp_dir().join("gaffer_config_no_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match ensure_config_files(&tmp).unwrap_err() {
            ConfigError::NoDefault { file, .. } => assert_eq!(file, "engine.toml"),
            other => panic!("expected NoDefault, got: {other}"),
        }

        // A complete config/ needs no defaults at all.
        let complete = temp_config_dir("gaffer_config_complete");
        assert!(ensure_config_files(&complete).unwrap().is_empty());

        let _ = fs::remove_dir_all(&tmp);
        let _ = fs::remove_dir_all(&complete);
    }

    #[test]
    fn code_defaults_pass_validation() {
        assert!(validate_engine(&EngineConfig::default()).is_ok());
    }
}
