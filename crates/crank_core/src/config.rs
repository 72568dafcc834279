use crate::error::{EngineError, EngineResult};
use crate::time::{DEFAULT_FIXED_STEP, DEFAULT_FRAME_RATE, DEFAULT_MAX_FRAME_TIME};
use crate::util::Color;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_WINDOW_WIDTH: u32 = 800;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 600;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    /// Seconds per fixed update.
    pub fixed_step: f64,
    /// Longest frame fed into the fixed-step accumulator.
    pub max_frame_time: f64,
    pub clear_color: Color,
    pub vsync: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
            frame_rate: DEFAULT_FRAME_RATE,
            fixed_step: DEFAULT_FIXED_STEP,
            max_frame_time: DEFAULT_MAX_FRAME_TIME,
            clear_color: Color::BLACK,
            vsync: true,
        }
    }
}

pub fn load_config_from_path(path: &Path) -> EngineResult<EngineConfig> {
    let raw = fs::read_to_string(path)
        .map_err(|e| EngineError::config(format!("Failed to read {}: {e}", path.display())))?;
    let config: EngineConfig = serde_json::from_str(&raw).map_err(|e| {
        EngineError::config(format!("Failed to parse config JSON {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &EngineConfig) -> EngineResult<()> {
    if config.width == 0 || config.height == 0 {
        return Err(EngineError::config(
            "Config validation failed: width and height must be > 0",
        ));
    }
    if config.frame_rate <= 0.0 {
        return Err(EngineError::config(
            "Config validation failed: frame_rate must be > 0",
        ));
    }
    if config.fixed_step <= 0.0 {
        return Err(EngineError::config(
            "Config validation failed: fixed_step must be > 0",
        ));
    }
    if config.max_frame_time < config.fixed_step {
        return Err(EngineError::config(format!(
            "Config validation failed: max_frame_time ({}) must be >= fixed_step ({})",
            config.max_frame_time, config.fixed_step
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "crank_config_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn partial_file_fills_defaults() {
        let path = temp_file_path("partial");
        fs::write(
            &path,
            r#"{ "title": "Pong Demo", "width": 1024, "clear_color": { "r": 10, "g": 20, "b": 30, "a": 255 } }"#,
        )
        .expect("write temp file");

        let config = load_config_from_path(&path).expect("valid config should load");
        assert_eq!(config.title, "Pong Demo");
        assert_eq!(config.width, 1024);
        assert_eq!(config.height, DEFAULT_WINDOW_HEIGHT);
        assert_eq!(config.clear_color, Color::rgb(10, 20, 30));
        assert!((config.fixed_step - 0.02).abs() < f64::EPSILON);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_zero_size() {
        let path = temp_file_path("zero");
        fs::write(&path, r#"{ "width": 0 }"#).expect("write temp file");
        let err = load_config_from_path(&path).expect_err("zero width should fail");
        assert!(err.to_string().contains("width and height"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_cap_below_step() {
        let config = EngineConfig {
            fixed_step: 0.1,
            max_frame_time: 0.05,
            ..EngineConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        let path = temp_file_path("bad");
        fs::write(&path, "{ not json").expect("write temp file");
        let err = load_config_from_path(&path).expect_err("bad json should fail");
        assert!(matches!(err, EngineError::Config(_)));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }
}
