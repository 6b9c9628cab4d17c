//! Engine and match configuration.
//!
//! Engine options are resolved once, at launch, by layering the base
//! defaults, an optional randomized `Contempt`, and the caller's overrides
//! into an immutable [`EngineOptions`]. Match settings and named players can
//! be loaded from a TOML file:
//!
//! ```toml
//! max_moves = 200
//! opening = ["e2e4", "e7e5"]
//!
//! [players.deep]
//! path = "stockfish"
//! depth = 12
//!
//! [players.shallow]
//! path = "stockfish"
//! depth = 4
//! contempt = { min = -10, max = 10 }
//! options = { Threads = "2" }
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Search depth used when none is configured.
pub const DEFAULT_DEPTH: u32 = 2;

/// Ply ceiling used when none is configured.
pub const DEFAULT_MAX_MOVES: usize = 500;

/// Options sent to every engine unless overridden.
pub const BASE_OPTIONS: [(&str, &str); 8] = [
    ("Contempt", "0"),
    ("Threads", "1"),
    ("Hash", "16"),
    ("MultiPV", "1"),
    ("Skill Level", "20"),
    ("Move Overhead", "30"),
    ("Slow Mover", "80"),
    ("UCI_Chess960", "false"),
];

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Search depth must be at least one ply.
    #[error("Invalid search depth: {0}")]
    InvalidDepth(u32),
    /// The randomized contempt range is empty.
    #[error("Invalid contempt range: [{min}, {max})")]
    InvalidContemptRange { min: i32, max: i32 },
    /// Requested player was not found in the configuration.
    #[error("Player not found: {0}")]
    PlayerNotFound(String),
    /// An opening move does not have the lexical form of a UCI move.
    #[error("Invalid opening move: {0}")]
    InvalidOpeningMove(String),
}

/// Half-open range `[min, max)` for a randomized `Contempt` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContemptRange {
    pub min: i32,
    pub max: i32,
}

/// Configuration for one engine process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path or name of the engine executable.
    pub path: PathBuf,
    /// Search depth for `go depth`. Defaults to 2.
    #[serde(default = "default_depth")]
    pub depth: u32,
    /// Whether pondering stays enabled. When `false`, `Ponder` is set to
    /// `false` before any other option.
    #[serde(default)]
    pub ponder: bool,
    /// Options overriding the base defaults.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    /// Pick `Contempt` uniformly from this range before overrides apply.
    #[serde(default)]
    pub contempt: Option<ContemptRange>,
}

fn default_depth() -> u32 {
    DEFAULT_DEPTH
}

impl EngineConfig {
    /// Configuration with default depth, no pondering and no overrides.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            depth: DEFAULT_DEPTH,
            ponder: false,
            options: BTreeMap::new(),
            contempt: None,
        }
    }

    /// Checks depth and contempt range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth == 0 {
            return Err(ConfigError::InvalidDepth(self.depth));
        }
        if let Some(range) = self.contempt {
            if range.max <= range.min {
                return Err(ConfigError::InvalidContemptRange {
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }

    /// Builds the option set to send at launch.
    ///
    /// Layers, later winning: [`BASE_OPTIONS`], then a `Contempt` drawn
    /// from [`EngineConfig::contempt`] if set, then [`EngineConfig::options`].
    pub fn resolve<G: Rng + ?Sized>(&self, rng: &mut G) -> Result<EngineOptions, ConfigError> {
        self.validate()?;

        let mut entries: BTreeMap<String, String> = BASE_OPTIONS
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        if let Some(range) = self.contempt {
            let contempt = rng.gen_range(range.min..range.max);
            entries.insert("Contempt".to_string(), contempt.to_string());
        }

        for (name, value) in &self.options {
            entries.insert(name.clone(), value.clone());
        }

        Ok(EngineOptions { entries })
    }
}

/// Resolved, immutable option set for one engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    entries: BTreeMap<String, String>,
}

impl EngineOptions {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EngineOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Match settings and named players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Ply ceiling; reaching it ends the match without a winner.
    #[serde(default = "default_max_moves")]
    pub max_moves: usize,
    /// Moves played from the start position before the engines take over.
    #[serde(default)]
    pub opening: Vec<String>,
    /// Map of player names to their engine configurations.
    #[serde(default)]
    pub players: BTreeMap<String, EngineConfig>,
}

fn default_max_moves() -> usize {
    DEFAULT_MAX_MOVES
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_moves: DEFAULT_MAX_MOVES,
            opening: Vec::new(),
            players: BTreeMap::new(),
        }
    }
}

impl MatchConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it contains invalid TOML, or a validation
    /// error for a bad player or opening move.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bad) = self.opening.iter().find(|m| !uci::is_move_token(m)) {
            return Err(ConfigError::InvalidOpeningMove(bad.clone()));
        }
        for player in self.players.values() {
            player.validate()?;
        }
        Ok(())
    }

    /// Retrieves a player configuration by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PlayerNotFound`] if no player with the given name exists.
    pub fn player(&self, name: &str) -> Result<&EngineConfig, ConfigError> {
        self.players
            .get(name)
            .ok_or_else(|| ConfigError::PlayerNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use std::io::Write;

    #[test]
    fn test_resolve_uses_base_defaults() {
        let config = EngineConfig::new("stockfish");
        let options = config.resolve(&mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(options.len(), BASE_OPTIONS.len());
        for (name, value) in BASE_OPTIONS {
            assert_eq!(options.get(name), Some(value));
        }
    }

    #[test]
    fn test_resolve_overrides_and_extends() {
        let mut config = EngineConfig::new("stockfish");
        config.options.insert("Hash".to_string(), "128".to_string());
        config
            .options
            .insert("SyzygyPath".to_string(), "/tb".to_string());

        let options = config.resolve(&mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(options.get("Hash"), Some("128"));
        assert_eq!(options.get("SyzygyPath"), Some("/tb"));
        assert_eq!(options.get("Threads"), Some("1"));
        assert_eq!(options.len(), BASE_OPTIONS.len() + 1);
    }

    #[test]
    fn test_random_contempt_stays_in_half_open_range() {
        let mut config = EngineConfig::new("stockfish");
        config.contempt = Some(ContemptRange { min: -3, max: 2 });
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let options = config.resolve(&mut rng).unwrap();
            let contempt: i32 = options.get("Contempt").unwrap().parse().unwrap();
            assert!((-3..2).contains(&contempt), "contempt {} out of range", contempt);
        }
    }

    #[test]
    fn test_explicit_contempt_beats_random() {
        let mut config = EngineConfig::new("stockfish");
        config.contempt = Some(ContemptRange { min: 50, max: 60 });
        config
            .options
            .insert("Contempt".to_string(), "-5".to_string());

        let options = config.resolve(&mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(options.get("Contempt"), Some("-5"));
    }

    #[test]
    fn test_empty_contempt_range_is_rejected() {
        let mut config = EngineConfig::new("stockfish");
        config.contempt = Some(ContemptRange { min: 10, max: 10 });

        match config.resolve(&mut StdRng::seed_from_u64(1)) {
            Err(ConfigError::InvalidContemptRange { min, max }) => {
                assert_eq!((min, max), (10, 10));
            }
            other => panic!("Expected InvalidContemptRange, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let mut config = EngineConfig::new("stockfish");
        config.depth = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDepth(0))));
    }

    #[test]
    fn test_parse_valid_toml_config() {
        let toml_content = r#"
max_moves = 120
opening = ["e2e4", "e7e5"]

[players.deep]
path = "/usr/bin/stockfish"
depth = 12
ponder = true

[players.deep.options]
Threads = "4"
"Skill Level" = "15"

[players.shallow]
path = "stockfish"
contempt = { min = -10, max = 10 }
"#;

        let config = MatchConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.max_moves, 120);
        assert_eq!(config.opening, vec!["e2e4", "e7e5"]);
        assert_eq!(config.players.len(), 2);

        let deep = config.player("deep").unwrap();
        assert_eq!(deep.path, PathBuf::from("/usr/bin/stockfish"));
        assert_eq!(deep.depth, 12);
        assert!(deep.ponder);
        assert_eq!(deep.options.get("Skill Level").map(String::as_str), Some("15"));
        assert_eq!(deep.contempt, None);

        let shallow = config.player("shallow").unwrap();
        assert_eq!(shallow.depth, DEFAULT_DEPTH);
        assert!(!shallow.ponder);
        assert!(shallow.options.is_empty());
        assert_eq!(shallow.contempt, Some(ContemptRange { min: -10, max: 10 }));
    }

    #[test]
    fn test_empty_config_defaults() {
        let config = MatchConfig::from_toml_str("").unwrap();

        assert_eq!(config.max_moves, DEFAULT_MAX_MOVES);
        assert!(config.opening.is_empty());
        assert!(config.players.is_empty());
    }

    #[test]
    fn test_invalid_opening_move_is_rejected() {
        let result = MatchConfig::from_toml_str(r#"opening = ["e2e4", "Nf3"]"#);
        match result {
            Err(ConfigError::InvalidOpeningMove(mv)) => assert_eq!(mv, "Nf3"),
            other => panic!("Expected InvalidOpeningMove, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_player_is_rejected() {
        let toml_content = r#"
[players.broken]
path = "stockfish"
depth = 0
"#;
        assert!(matches!(
            MatchConfig::from_toml_str(toml_content),
            Err(ConfigError::InvalidDepth(0))
        ));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        assert!(matches!(
            MatchConfig::from_toml_str("max_moves = ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_player_returns_error_for_unknown_name() {
        let config = MatchConfig::default();

        match config.player("nonexistent") {
            Err(ConfigError::PlayerNotFound(name)) => assert_eq!(name, "nonexistent"),
            other => panic!("Expected PlayerNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_moves = 40").unwrap();
        writeln!(file, "[players.a]").unwrap();
        writeln!(file, "path = \"engine-a\"").unwrap();

        let config = MatchConfig::load(file.path()).unwrap();
        assert_eq!(config.max_moves, 40);
        assert_eq!(config.player("a").unwrap().path, PathBuf::from("engine-a"));
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = MatchConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn test_engine_config_serialization_roundtrip() {
        let mut config = EngineConfig::new("/opt/engine");
        config.depth = 9;
        config.contempt = Some(ContemptRange { min: 0, max: 5 });

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: EngineConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized, config);
    }

    proptest! {
        /// Property: a drawn contempt lies in the configured range unless an override replaces it
        #[test]
        fn prop_contempt_respects_range_and_overrides(
            min in -100i32..100,
            width in 1i32..50,
            seed in any::<u64>(),
            overridden in any::<bool>(),
        ) {
            let mut config = EngineConfig::new("stockfish");
            config.contempt = Some(ContemptRange { min, max: min + width });
            if overridden {
                config.options.insert("Contempt".to_string(), "42".to_string());
            }

            let options = config.resolve(&mut StdRng::seed_from_u64(seed)).unwrap();
            let contempt: i32 = options.get("Contempt").unwrap().parse().unwrap();

            if overridden {
                prop_assert_eq!(contempt, 42);
            } else {
                prop_assert!(contempt >= min && contempt < min + width);
            }
            prop_assert_eq!(options.get("Threads"), Some("1"));
        }
    }
}
