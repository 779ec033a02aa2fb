use crate::Result;
use crate::activity::{ChartStyle, MIN_DIMENSION};
use crate::engine::EngineSettings;
use crate::hosting::RetryPolicy;
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use palette::Srgb;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

const LOG_TARGET: &str = "    config";

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// File looked up in the current directory when no `--config` is given
pub const CONFIG_FILE_NAME: &str = "repo-pulse.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base URL of the GitHub REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Timeout applied to every HTTP request
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Total attempts per request, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay", with = "humantime_serde")]
    pub base_delay: Duration,

    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    /// Longest wait for a rate limit reset before giving up
    #[serde(default = "default_max_rate_limit_wait", with = "humantime_serde")]
    pub max_rate_limit_wait: Duration,

    #[serde(default = "default_jitter")]
    pub jitter: bool,

    /// Upper bound on records listed per category
    #[serde(default = "default_max_records_per_kind")]
    pub max_records_per_kind: usize,

    /// Commit detail requests in flight at once
    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,

    #[serde(default = "default_chart_width")]
    pub chart_width: u32,

    #[serde(default = "default_chart_height")]
    pub chart_height: u32,

    /// Bar color as `#rrggbb`
    #[serde(default = "default_chart_color")]
    pub chart_color: String,
}

fn default_api_url() -> String {
    crate::hosting::GITHUB_API_URL.to_string()
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay() -> Duration {
    Duration::from_millis(500)
}

const fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

const fn default_max_rate_limit_wait() -> Duration {
    Duration::from_secs(60)
}

const fn default_jitter() -> bool {
    true
}

const fn default_max_records_per_kind() -> usize {
    1000
}

const fn default_detail_concurrency() -> usize {
    4
}

const fn default_chart_width() -> u32 {
    1200
}

const fn default_chart_height() -> u32 {
    600
}

fn default_chart_color() -> String {
    "#0366d6".to_string()
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `repo-pulse.toml` in `base_dir` is used if it exists.
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading repo-pulse configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = base_dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!(target: LOG_TARGET, "No '{path}' found, using the default configuration");
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading repo-pulse configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let _ = url::Url::parse(&self.api_url).into_app_err_with(|| format!("api_url '{}' is not a valid URL", self.api_url))?;

        if self.request_timeout.is_zero() {
            return Err(app_err!("request_timeout must be greater than zero"));
        }

        if self.max_attempts == 0 {
            return Err(app_err!("max_attempts must be at least 1"));
        }

        if self.base_delay > self.max_delay {
            return Err(app_err!(
                "base_delay ({:?}) must not exceed max_delay ({:?})",
                self.base_delay,
                self.max_delay
            ));
        }

        if self.max_records_per_kind == 0 {
            return Err(app_err!("max_records_per_kind must be at least 1"));
        }

        if self.detail_concurrency == 0 {
            return Err(app_err!("detail_concurrency must be at least 1"));
        }

        if self.chart_width < MIN_DIMENSION || self.chart_height < MIN_DIMENSION {
            return Err(app_err!(
                "chart_width and chart_height must be at least {MIN_DIMENSION}, got {}x{}",
                self.chart_width,
                self.chart_height
            ));
        }

        let _ = self.bar_color()?;

        Ok(())
    }

    fn bar_color(&self) -> Result<Srgb<u8>> {
        self.chart_color
            .parse::<Srgb<u8>>()
            .into_app_err_with(|| format!("chart_color '{}' is not a '#rrggbb' color", self.chart_color))
    }

    /// Engine settings for `token`, with an optional API URL taking precedence over the file
    pub fn engine_settings(&self, token: Option<&str>, api_url: Option<&str>) -> Result<EngineSettings> {
        Ok(EngineSettings {
            token: token.unwrap_or_default().to_string(),
            api_url: api_url.unwrap_or(&self.api_url).to_string(),
            request_timeout: self.request_timeout,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                base_delay: self.base_delay,
                max_delay: self.max_delay,
                max_rate_limit_wait: self.max_rate_limit_wait,
                jitter: self.jitter,
            },
            max_records_per_kind: self.max_records_per_kind,
            detail_concurrency: self.detail_concurrency,
            chart: ChartStyle {
                width: self.chart_width,
                height: self.chart_height,
                bar: self.bar_color()?,
                ..ChartStyle::default()
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(text: &str) -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("custom.toml")).unwrap();
        fs::write(&path, text).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.api_url, "https://api.github.com");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.detail_concurrency, 4);
    }

    #[test]
    fn test_empty_file_matches_field_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.api_url, defaults.api_url);
        assert_eq!(parsed.request_timeout, defaults.request_timeout);
        assert_eq!(parsed.max_rate_limit_wait, defaults.max_rate_limit_wait);
        assert_eq!(parsed.jitter, defaults.jitter);
        assert_eq!(parsed.chart_color, defaults.chart_color);
    }

    #[test]
    fn test_validate_zero_attempts() {
        let config = Config { max_attempts: 0, ..Config::default() };
        let _ = config.validate().unwrap_err();
    }

    #[test]
    fn test_validate_base_delay_above_max() {
        let config = Config {
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(1),
            ..Config::default()
        };
        let _ = config.validate().unwrap_err();
    }

    #[test]
    fn test_validate_bad_url() {
        let config = Config { api_url: "not a url".into(), ..Config::default() };
        let _ = config.validate().unwrap_err();
    }

    #[test]
    fn test_validate_small_chart() {
        let config = Config { chart_width: 50, ..Config::default() };
        let _ = config.validate().unwrap_err();
    }

    #[test]
    fn test_validate_bad_color() {
        let config = Config { chart_color: "blue-ish".into(), ..Config::default() };
        let _ = config.validate().unwrap_err();
    }

    #[test]
    fn test_engine_settings() {
        let config = Config { chart_color: "#ff8000".into(), ..Config::default() };
        let settings = config.engine_settings(Some("tok"), Some("http://127.0.0.1:9")).unwrap();

        assert_eq!(settings.token, "tok");
        assert_eq!(settings.api_url, "http://127.0.0.1:9");
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.chart.bar, Srgb::new(0xff, 0x80, 0x00));
    }

    #[test]
    fn test_engine_settings_uses_file_url() {
        let settings = Config::default().engine_settings(None, None).unwrap();
        assert_eq!(settings.api_url, "https://api.github.com");
        assert!(settings.token.is_empty());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_save_default_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let output_path = Utf8PathBuf::try_from(tmp.path().join(CONFIG_FILE_NAME)).unwrap();
        Config::save_default(&output_path).unwrap();

        let base_dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let loaded = Config::load(&base_dir, None).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_missing_config_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let base_dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let config = Config::load(&base_dir, None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_explicit_path() {
        let (_tmp, path) = write_config("max_attempts = 5\nbase_delay = \"2s\"\n");
        let config = Config::load(Utf8Path::new("."), Some(&path)).unwrap();

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.base_delay, Duration::from_secs(2));
        assert_eq!(config.max_delay, Duration::from_secs(30));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_rejects_unknown_field() {
        let (_tmp, path) = write_config("cache_ttl = \"1h\"\n");
        let err = Config::load(Utf8Path::new("."), Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("parsing configuration file"));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_rejects_bad_duration() {
        let (_tmp, path) = write_config("request_timeout = \"soon\"\n");
        let _ = Config::load(Utf8Path::new("."), Some(&path)).unwrap_err();
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_validates_values() {
        let (_tmp, path) = write_config("detail_concurrency = 0\n");
        let _ = Config::load(Utf8Path::new("."), Some(&path)).unwrap_err();
    }

    #[test]
    fn test_missing_explicit_path_fails() {
        let path = Utf8PathBuf::from("/definitely/not/here/repo-pulse.toml");
        let _ = Config::load(Utf8Path::new("."), Some(&path)).unwrap_err();
    }
}
