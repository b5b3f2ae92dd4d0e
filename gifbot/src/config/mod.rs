//! Application configuration.
//!
//! Loaded from a TOML file; every field has a default so a partial file (or
//! none at all, with the token supplied through `GIFBOT_BOT_TOKEN`) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::pipeline::{GifSettings, PipelineLimits};
use crate::telegram::DEFAULT_API_URL;
use crate::{Error, Result};

/// Environment variable overriding `bot.token`.
pub const TOKEN_ENV_VAR: &str = "GIFBOT_BOT_TOKEN";

/// Token value shipped in the sample config.
const PLACEHOLDER_TOKEN: &str = "YOUR_BOT_TOKEN_HERE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub gif: GifSettings,
    pub processing: ProcessingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub token: String,
    pub api_url: String,
    /// Long-poll timeout for `getUpdates`.
    pub poll_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            poll_timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &if self.token.is_empty() { "" } else { "***" })
            .field("api_url", &self.api_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of conversions allowed to run at once.
    pub max_concurrent: usize,
    /// Longest accepted video, in seconds.
    pub max_video_duration: u64,
    pub max_gif_size_bytes: u64,
    /// Period of the queue position refresh.
    pub status_interval_secs: u64,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        let limits = PipelineLimits::default();
        Self {
            max_concurrent: 2,
            max_video_duration: limits.max_video_duration_secs,
            max_gif_size_bytes: limits.max_gif_size_bytes,
            status_interval_secs: 2,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    /// `EnvFilter` directive; empty uses the built-in default.
    pub filter: String,
    /// Days of log files to keep; `0` keeps everything.
    pub retention_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            filter: String::new(),
            retention_days: 7,
        }
    }
}

impl AppConfig {
    /// Load from `path`, apply environment overrides and validate.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => {
                info!(path = %path.display(), "Loading configuration");
                Self::from_toml_str(&contents)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };

        config.apply_token_override(std::env::var(TOKEN_ENV_VAR).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Replace the configured token with a non-empty override.
    pub fn apply_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            self.bot.token = token;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let token = self.bot.token.trim();
        if token.is_empty() || token == PLACEHOLDER_TOKEN {
            return Err(Error::config(format!(
                "bot token is not set; put it in bot.token or {}",
                TOKEN_ENV_VAR
            )));
        }
        if self.bot.api_url.trim().is_empty() {
            return Err(Error::config("bot.api_url must not be empty"));
        }
        if self.processing.max_concurrent == 0 {
            return Err(Error::config("processing.max_concurrent must be at least 1"));
        }
        if self.processing.max_video_duration == 0 {
            return Err(Error::config("processing.max_video_duration must be positive"));
        }
        if self.processing.max_gif_size_bytes == 0 {
            return Err(Error::config("processing.max_gif_size_bytes must be positive"));
        }
        if self.processing.status_interval_secs == 0 {
            return Err(Error::config("processing.status_interval_secs must be positive"));
        }
        if self.gif.fps == 0 {
            return Err(Error::config("gif.fps must be positive"));
        }
        if !(2..=256).contains(&self.gif.colors) {
            return Err(Error::config(format!(
                "gif.colors must be between 2 and 256, got {}",
                self.gif.colors
            )));
        }
        Ok(())
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.processing.status_interval_secs)
    }

    pub fn pipeline_limits(&self) -> PipelineLimits {
        PipelineLimits {
            max_video_duration_secs: self.processing.max_video_duration,
            max_gif_size_bytes: self.processing.max_gif_size_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.bot.token = "123:ABC".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bot.api_url, "https://api.telegram.org");
        assert_eq!(config.bot.poll_timeout_secs, 60);
        assert_eq!(config.gif, GifSettings::default());
        assert_eq!(config.processing.max_concurrent, 2);
        assert_eq!(config.processing.max_video_duration, 20);
        assert_eq!(config.processing.max_gif_size_bytes, 20 * 1024 * 1024);
        assert_eq!(config.status_interval(), Duration::from_secs(2));
        assert_eq!(config.logging.retention_days, 7);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [bot]
            token = "42:XYZ"

            [gif]
            fps = 15
            width = 0

            [processing]
            max_concurrent = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.bot.token, "42:XYZ");
        assert_eq!(config.gif.fps, 15);
        assert_eq!(config.gif.width, 0);
        assert_eq!(config.gif.colors, 256);
        assert_eq!(config.processing.max_concurrent, 4);
        assert_eq!(config.processing.ffmpeg_path, "ffmpeg");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_error() {
        let err = AppConfig::from_toml_str("[processing]\nmax_concurrent = \"two\"").unwrap_err();
        assert!(matches!(err, Error::TomlParse(_)));
    }

    #[test]
    fn test_rejects_placeholder_token() {
        let mut config = valid();
        config.bot.token = PLACEHOLDER_TOKEN.to_string();
        assert!(config.validate().is_err());
        config.bot.token = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = valid();
        config.processing.max_concurrent = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.gif.fps = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.gif.colors = 257;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.gif.colors = 1;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.processing.status_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.processing.max_video_duration = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_override() {
        let mut config = valid();
        config.apply_token_override(Some("  999:NEW ".to_string()));
        assert_eq!(config.bot.token, "999:NEW");

        config.apply_token_override(Some(String::new()));
        assert_eq!(config.bot.token, "999:NEW");

        config.apply_token_override(None);
        assert_eq!(config.bot.token, "999:NEW");
    }

    #[test]
    fn test_load_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bot]\ntoken = \"1:A\"\n").unwrap();
        // GIFBOT_BOT_TOKEN may be set in the environment; only check what the file controls.
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.processing.max_concurrent, 2);
    }

    #[test]
    fn test_debug_hides_token() {
        let debug = format!("{:?}", valid().bot);
        assert!(!debug.contains("123:ABC"));
    }

    #[test]
    fn test_pipeline_limits() {
        let mut config = valid();
        config.processing.max_video_duration = 30;
        config.processing.max_gif_size_bytes = 1024;
        let limits = config.pipeline_limits();
        assert_eq!(limits.max_video_duration_secs, 30);
        assert_eq!(limits.max_gif_size_bytes, 1024);
    }
}
