use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ERROR_MESSAGE: &str = "Erro ao processar ação. Tente novamente.";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// CoordinatorConfig
// ---------------------------------------------------------------------------

/// Timing knobs shared by the processing state, executor and registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default = "default_safety_timeout_ms")]
    pub safety_timeout_ms: u64,
    #[serde(default = "default_trailing_delay_ms")]
    pub trailing_delay_ms: u64,
    #[serde(default = "default_error_message")]
    pub default_error_message: String,
}

fn default_safety_timeout_ms() -> u64 {
    5000
}

fn default_trailing_delay_ms() -> u64 {
    300
}

fn default_error_message() -> String {
    DEFAULT_ERROR_MESSAGE.to_string()
}

impl CoordinatorConfig {
    pub fn safety_timeout(&self) -> Duration {
        Duration::from_millis(self.safety_timeout_ms)
    }

    pub fn trailing_delay(&self) -> Duration {
        Duration::from_millis(self.trailing_delay_ms)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            safety_timeout_ms: default_safety_timeout_ms(),
            trailing_delay_ms: default_trailing_delay_ms(),
            default_error_message: default_error_message(),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenWatchConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenWatchConfig {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_warn_within_minutes")]
    pub warn_within_minutes: i64,
    #[serde(default = "default_final_warning_within_minutes")]
    pub final_warning_within_minutes: i64,
    #[serde(default = "default_warning_throttle_secs")]
    pub warning_throttle_secs: u64,
}

fn default_check_interval_secs() -> u64 {
    120
}

fn default_warn_within_minutes() -> i64 {
    10
}

fn default_final_warning_within_minutes() -> i64 {
    5
}

fn default_warning_throttle_secs() -> u64 {
    300
}

impl TokenWatchConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn warning_throttle(&self) -> Duration {
        Duration::from_secs(self.warning_throttle_secs)
    }
}

impl Default for TokenWatchConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            warn_within_minutes: default_warn_within_minutes(),
            final_warning_within_minutes: default_final_warning_within_minutes(),
            warning_throttle_secs: default_warning_throttle_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// OkrConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OkrConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub token_watch: TokenWatchConfig,
}

impl OkrConfig {
    /// Load from a YAML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Flag settings that would make the dashboard misbehave.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let c = &self.coordinator;

        if c.safety_timeout_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "coordinator.safety_timeout_ms is 0: every action would be reset immediately"
                    .into(),
            });
        } else if c.trailing_delay_ms >= c.safety_timeout_ms {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "coordinator.trailing_delay_ms ({}) is not shorter than safety_timeout_ms ({})",
                    c.trailing_delay_ms, c.safety_timeout_ms
                ),
            });
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("api.base_url '{}' is not an http(s) URL", self.api.base_url),
            });
        }

        let t = &self.token_watch;
        if t.check_interval_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "token_watch.check_interval_secs must be greater than 0".into(),
            });
        }
        if t.final_warning_within_minutes >= t.warn_within_minutes {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "token_watch.final_warning_within_minutes ({}) should be below warn_within_minutes ({})",
                    t.final_warning_within_minutes, t.warn_within_minutes
                ),
            });
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = OkrConfig::load(&dir.path().join("okr.yaml")).unwrap();
        assert_eq!(config.coordinator.safety_timeout_ms, 5000);
        assert_eq!(config.coordinator.trailing_delay_ms, 300);
        assert_eq!(config.coordinator.default_error_message, DEFAULT_ERROR_MESSAGE);
        assert_eq!(config.token_watch.check_interval_secs, 120);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("okr.yaml");
        std::fs::write(
            &path,
            "coordinator:\n  trailing_delay_ms: 150\napi:\n  base_url: https://okr.example.com/api\n",
        )
        .unwrap();

        let config = OkrConfig::load(&path).unwrap();
        assert_eq!(config.coordinator.trailing_delay_ms, 150);
        assert_eq!(config.coordinator.safety_timeout_ms, 5000);
        assert_eq!(config.api.base_url, "https://okr.example.com/api");
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("okr.yaml");
        let mut config = OkrConfig::default();
        config.api.token = Some("abc".into());
        config.save(&path).unwrap();

        let loaded = OkrConfig::load(&path).unwrap();
        assert_eq!(loaded.api.token.as_deref(), Some("abc"));
    }

    #[test]
    fn validate_flags_bad_timings() {
        let mut config = OkrConfig::default();
        config.coordinator.trailing_delay_ms = 6000;
        config.token_watch.final_warning_within_minutes = 20;
        config.api.base_url = "localhost:8000".into();

        let warnings = config.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.level == WarnLevel::Error));
    }
}
