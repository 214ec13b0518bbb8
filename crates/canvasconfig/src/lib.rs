//! TOML configuration for a ShaderCanvas window.
//!
//! ```toml
//! version = 1
//!
//! [sources]
//! vertex = "quad.vert"
//! fragment = "toy.frag"
//! texture0 = "noise.png"
//!
//! [window]
//! title = "ShaderCanvas"
//! width = 800
//! height = 600
//! fps = 0
//! still_time = "2.5s"
//! ```
//!
//! Relative source paths are resolved against the directory holding the file
//! when it is loaded with [`CanvasConfig::load`].

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasConfig {
    pub version: u32,
    #[serde(default)]
    pub sources: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub window: WindowSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowSettings {
    pub title: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Frame cap; `0` or absent renders uncapped.
    pub fps: Option<f32>,
    /// Number of `textureN` channels to load.
    pub textures: Option<usize>,
    /// Freezes `iTime` at this offset.
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub still_time: Option<Duration>,
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl CanvasConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: CanvasConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates `path`, resolving relative source paths against
    /// its parent directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&input)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn resolve_relative_to(&mut self, base: &Path) {
        for path in self.sources.values_mut() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn source(&self, key: &str) -> Option<&Path> {
        self.sources.get(key).map(PathBuf::as_path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        for required in ["vertex", "fragment"] {
            match self.sources.get(required) {
                None => {
                    return Err(ConfigError::Invalid(format!(
                        "sources.{required} is required"
                    )))
                }
                Some(path) if path.as_os_str().is_empty() => {
                    return Err(ConfigError::Invalid(format!(
                        "sources.{required} may not be empty"
                    )))
                }
                Some(_) => {}
            }
        }

        for (key, path) in &self.sources {
            if key != "vertex" && key != "fragment" {
                validate_texture_key(key)?;
            }
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "sources.{key} may not be empty"
                )));
            }
        }

        if self.window.width == Some(0) || self.window.height == Some(0) {
            return Err(ConfigError::Invalid(
                "window width and height must be greater than zero".into(),
            ));
        }

        if let Some(fps) = self.window.fps {
            if !fps.is_finite() || fps < 0.0 {
                return Err(ConfigError::Invalid("window.fps must be >= 0".into()));
            }
        }

        Ok(())
    }
}

fn validate_texture_key(key: &str) -> Result<(), ConfigError> {
    let valid = key
        .strip_prefix("texture")
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "source key '{key}' is invalid; expected 'vertex', 'fragment' or 'textureN'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[sources]
vertex = "shaders/quad.vert"
fragment = "shaders/toy.frag"
texture0 = "textures/noise.png"
texture1 = "/abs/stone.jpg"

[window]
title = "Plasma"
width = 1280
height = 720
fps = 30
still_time = "2.5s"
"#;

    #[test]
    fn parses_sample_config() {
        let config = CanvasConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(config.source("vertex"), Some(Path::new("shaders/quad.vert")));
        assert_eq!(config.window.title.as_deref(), Some("Plasma"));
        assert_eq!(config.window.fps, Some(30.0));
        assert_eq!(config.window.still_time, Some(Duration::from_millis(2500)));
        assert_eq!(config.window.textures, None);
    }

    #[test]
    fn still_time_accepts_plain_seconds() {
        let parse = |value: &str| {
            CanvasConfig::from_toml_str(&format!(
                "version = 1\n[sources]\nvertex = \"a.vert\"\nfragment = \"a.frag\"\n[window]\nstill_time = {value}\n"
            ))
            .map(|config| config.window.still_time)
        };
        assert_eq!(parse("3").expect("integer"), Some(Duration::from_secs(3)));
        assert_eq!(parse("0.25").expect("float"), Some(Duration::from_millis(250)));
        assert_eq!(
            parse("\"1m 30s\"").expect("humantime"),
            Some(Duration::from_secs(90))
        );
        assert!(parse("-1").is_err());
        assert!(parse("{ secs = 1, nanos = 0 }").is_err());
    }

    #[test]
    fn window_section_is_optional() {
        let config = CanvasConfig::from_toml_str(
            r#"
version = 1
[sources]
vertex = "a.vert"
fragment = "a.frag"
"#,
        )
        .expect("parse config");
        assert!(config.window.width.is_none());
        assert!(config.window.still_time.is_none());
    }

    #[test]
    fn resolves_relative_paths_only() {
        let mut config = CanvasConfig::from_toml_str(SAMPLE).expect("parse config");
        config.resolve_relative_to(Path::new("/srv/canvas"));
        assert_eq!(
            config.source("texture0"),
            Some(Path::new("/srv/canvas/textures/noise.png"))
        );
        assert_eq!(config.source("texture1"), Some(Path::new("/abs/stone.jpg")));
    }

    #[test]
    fn rejects_missing_fragment() {
        let err = CanvasConfig::from_toml_str(
            r#"
version = 1
[sources]
vertex = "a.vert"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("fragment")));
    }

    #[test]
    fn rejects_unknown_source_key() {
        let err = CanvasConfig::from_toml_str(
            r#"
version = 1
[sources]
vertex = "a.vert"
fragment = "a.frag"
texture_a = "x.png"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unsupported_version_and_bad_window() {
        let err = CanvasConfig::from_toml_str(
            r#"
version = 2
[sources]
vertex = "a.vert"
fragment = "a.frag"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CanvasConfig::from_toml_str(
            r#"
version = 1
[sources]
vertex = "a.vert"
fragment = "a.frag"
[window]
width = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = CanvasConfig::load(&dir.path().join("canvas.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_resolves_against_config_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("canvas.toml");
        fs::write(&path, SAMPLE).expect("write config");
        let config = CanvasConfig::load(&path).expect("load");
        assert_eq!(
            config.source("fragment"),
            Some(dir.path().join("shaders/toy.frag").as_path())
        );
    }
}
