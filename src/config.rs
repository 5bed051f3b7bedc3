// Engine configuration - Loaded from RON or JSON

use crate::error::ConfigError;
use crate::units::{DEFAULT_TEMPO, MAX_TEMPO, MIN_TEMPO, TICKS_PER_BEAT};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What the sequencer does after the last page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EndOfSong {
    /// Continue from page 0
    #[default]
    Loop,
    /// Stop playback (held notes are released)
    Stop,
}

/// Final stage applied to the mixed output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputLimiter {
    #[default]
    Hard,
    /// tanh saturation
    Soft,
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub max_voices: usize,
    pub ticks_per_beat: u32,
    /// Tempo used while no page is playing
    pub default_tempo: f32,
    pub end_of_song: EndOfSong,
    pub output_limiter: OutputLimiter,
    pub command_capacity: usize,
    pub notification_capacity: usize,
    /// Seed for random delay / random sample choice; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            max_voices: 64,
            ticks_per_beat: TICKS_PER_BEAT,
            default_tempo: DEFAULT_TEMPO,
            end_of_song: EndOfSong::default(),
            output_limiter: OutputLimiter::default(),
            command_capacity: 1024,
            notification_capacity: 256,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Load from a `.ron` or `.json` file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let parse: fn(&str) -> Result<Self, ConfigError> = match extension.as_str() {
            "ron" => Self::from_ron_str,
            "json" => Self::from_json_str,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        let config = parse(&std::fs::read_to_string(path)?)?;

        log::info!(
            "Loaded engine config from {}: {} Hz, {} voices, {} ticks/beat",
            path.display(),
            config.sample_rate,
            config.max_voices,
            config.ticks_per_beat
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be > 0".into()));
        }
        if self.max_voices == 0 {
            return Err(ConfigError::Invalid("max_voices must be > 0".into()));
        }
        if self.ticks_per_beat == 0 {
            return Err(ConfigError::Invalid("ticks_per_beat must be > 0".into()));
        }
        if !self.default_tempo.is_finite() || !(MIN_TEMPO..=MAX_TEMPO).contains(&self.default_tempo) {
            return Err(ConfigError::Invalid(format!(
                "default_tempo must be within {}..={}, got {}",
                MIN_TEMPO, MAX_TEMPO, self.default_tempo
            )));
        }
        if self.command_capacity == 0 || self.notification_capacity == 0 {
            return Err(ConfigError::Invalid("queue capacities must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.max_voices, 64);
        assert_eq!(config.ticks_per_beat, 192);
        assert_eq!(config.end_of_song, EndOfSong::Loop);
        assert_eq!(config.output_limiter, OutputLimiter::Hard);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = EngineConfig::from_ron_str("(max_voices: 8, end_of_song: Stop)").unwrap();
        assert_eq!(config.max_voices, 8);
        assert_eq!(config.end_of_song, EndOfSong::Stop);
        assert_eq!(config.sample_rate, 48_000);
    }

    #[test]
    fn test_json() {
        let config =
            EngineConfig::from_json_str(r#"{"sample_rate": 44100, "output_limiter": "Soft", "seed": 7}"#)
                .unwrap();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.output_limiter, OutputLimiter::Soft);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_ron_round_trip() {
        let config = EngineConfig {
            seed: Some(3),
            end_of_song: EndOfSong::Stop,
            ..Default::default()
        };
        let text = config.to_ron_string().unwrap();
        assert_eq!(EngineConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        assert!(matches!(
            EngineConfig::from_ron_str("(sample_rate: 0)"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"default_tempo": 0.0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"max_voices": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(EngineConfig::from_ron_str("(max_voices: "), Err(ConfigError::Ron(_))));
        assert!(matches!(EngineConfig::from_json_str("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        assert!(matches!(
            EngineConfig::load("engine.toml"),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "toml"
        ));
        assert!(matches!(EngineConfig::load("missing.ron"), Err(ConfigError::Io(_))));
    }
}
