//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use attend_core::RetryPolicy;
use attend_sheets::{SheetNames, SheetsSettings};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Which store the import writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sheets,
    Sqlite,
}

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: Backend,
    /// Path to the database file (sqlite backend).
    pub database_path: PathBuf,
    pub sheets: SheetsConfig,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    pub spreadsheet_id: Option<String>,
    /// OAuth bearer token with the spreadsheets scope.
    pub access_token: Option<String>,
    pub base_url: String,
    pub attendees: String,
    pub sessions: String,
    pub attendance_log: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub id_poll_attempts: u32,
    pub id_poll_interval_ms: u64,
    pub write_pause_ms: u64,
}

const fn redacted(secret: Option<&str>) -> &'static str {
    if secret.is_some() { "[REDACTED]" } else { "None" }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("backend", &self.backend)
            .field("database_path", &self.database_path)
            .field("sheets", &self.sheets)
            .field("llm", &self.llm)
            .field("retry", &self.retry)
            .finish()
    }
}

impl fmt::Debug for SheetsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetsConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("access_token", &redacted(self.access_token.as_deref()))
            .field("base_url", &self.base_url)
            .field("attendees", &self.attendees)
            .field("sessions", &self.sessions)
            .field("attendance_log", &self.attendance_log)
            .finish()
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &redacted(self.api_key.as_deref()))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            backend: Backend::default(),
            database_path: data_dir.join("attend.db"),
            sheets: SheetsConfig::default(),
            llm: LlmConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        let names = SheetNames::default();
        Self {
            spreadsheet_id: None,
            access_token: None,
            base_url: attend_sheets::DEFAULT_BASE_URL.to_string(),
            attendees: names.attendees,
            sessions: names.sessions,
            attendance_log: names.attendance_log,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: attend_llm::DEFAULT_BASE_URL.to_string(),
            model: attend_llm::DEFAULT_MODEL.to_string(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            id_poll_attempts: policy.attempts,
            id_poll_interval_ms: duration_ms(policy.interval),
            write_pause_ms: duration_ms(policy.write_pause),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // ATTEND_SHEETS__ACCESS_TOKEN -> sheets.access_token
        figment = figment.merge(Env::prefixed("ATTEND_").split("__"));

        figment.extract()
    }

    /// Checks the settings the selected backend needs.
    pub fn validate(&self) -> Result<()> {
        if self.retry.id_poll_attempts == 0 {
            bail!("retry.id_poll_attempts must be at least 1");
        }
        if self.backend == Backend::Sheets {
            if non_blank(self.sheets.spreadsheet_id.as_deref()).is_none() {
                bail!("sheets.spreadsheet_id is required for the sheets backend");
            }
            if non_blank(self.sheets.access_token.as_deref()).is_none() {
                bail!(
                    "sheets.access_token is required for the sheets backend \
                     (set ATTEND_SHEETS__ACCESS_TOKEN or config.toml)"
                );
            }
        }
        Ok(())
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry.id_poll_attempts,
            interval: Duration::from_millis(self.retry.id_poll_interval_ms),
            write_pause: Duration::from_millis(self.retry.write_pause_ms),
        }
    }

    /// The LLM API key, if one is set and not blank.
    pub fn llm_api_key(&self) -> Option<&str> {
        non_blank(self.llm.api_key.as_deref())
    }

    pub fn sheets_settings(&self) -> SheetsSettings {
        SheetsSettings {
            base_url: self.sheets.base_url.clone(),
            spreadsheet_id: self.sheets.spreadsheet_id.clone().unwrap_or_default(),
            access_token: self.sheets.access_token.clone().unwrap_or_default(),
            names: SheetNames {
                attendees: self.sheets.attendees.clone(),
                sessions: self.sheets.sessions.clone(),
                attendance_log: self.sheets.attendance_log.clone(),
            },
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Returns the platform-specific config directory for attend.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("attend"))
}

/// Returns the platform-specific data directory for attend.
///
/// On Linux: `~/.local/share/attend`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("attend"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    fn sheets_config() -> Config {
        let mut config = Config::default();
        config.sheets.spreadsheet_id = Some("sheet-1".to_string());
        config.sheets.access_token = Some("ya29.token".to_string());
        config
    }

    #[test]
    fn test_dirs_data_path_ends_with_attend() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "attend");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("attend.db"));
    }

    #[test]
    fn test_defaults_match_retry_policy() {
        let config = Config::default();
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.sheets.attendance_log, "attendee_log");
        assert_eq!(config.llm.model, attend_llm::DEFAULT_MODEL);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
backend = "sqlite"
database_path = "/tmp/attend-test.db"

[sheets]
attendance_log = "log"

[retry]
id_poll_attempts = 5
id_poll_interval_ms = 0
"#
        )
        .unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();

        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.database_path, PathBuf::from("/tmp/attend-test.db"));
        assert_eq!(config.sheets.attendance_log, "log");
        assert_eq!(config.sheets.attendees, "attendees");
        assert_eq!(config.retry.id_poll_attempts, 5);
        assert_eq!(config.retry_policy().interval, Duration::ZERO);
        assert_eq!(config.retry.write_pause_ms, 500);
    }

    #[test]
    fn test_validate_requires_sheets_credentials() {
        let mut config = sheets_config();
        assert!(config.validate().is_ok());

        config.sheets.access_token = Some("   ".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("access_token"));

        config.sheets.spreadsheet_id = None;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("spreadsheet_id"));
    }

    #[test]
    fn test_validate_sqlite_needs_no_credentials() {
        let config = Config {
            backend: Backend::Sqlite,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = sheets_config();
        config.retry.id_poll_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_llm_key_is_none() {
        let mut config = Config::default();
        config.llm.api_key = Some(" ".to_string());
        assert_eq!(config.llm_api_key(), None);
        config.llm.api_key = Some("sk-1".to_string());
        assert_eq!(config.llm_api_key(), Some("sk-1"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = sheets_config();
        config.llm.api_key = Some("sk-secret".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("ya29.token"));
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
