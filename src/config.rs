//! Configuration loading from TOML files and environment variables.
//!
//! Only the notifier endpoint and the logging sink are configurable. The idle
//! threshold and poll interval are fixed in [`crate::idle::tracker`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mail relay used for notifications.
///
/// Credentials are expected from the environment; a config file may carry
/// them but they are never logged.
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Relay host name. Leaving it unset disables email.
    #[serde(default)]
    pub host: Option<String>,
    /// Relay port (587 for STARTTLS, 465 for implicit TLS).
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Sender address; defaults to the username.
    #[serde(default)]
    pub from: Option<String>,
    /// Recipient address.
    #[serde(default)]
    pub to: Option<String>,
    /// Number of send attempts per notification.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_smtp_port(),
            username: None,
            password: None,
            from: None,
            to: None,
            retry_attempts: default_retry_attempts(),
        }
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("to", &self.to)
            .field("retry_attempts", &self.retry_attempts)
            .finish()
    }
}

impl SmtpConfig {
    /// Whether enough is set to send mail.
    pub fn is_configured(&self) -> bool {
        self.host.as_deref().is_some_and(|h| !h.is_empty())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory holding the event log.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Event log file name inside `data_dir`.
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit tracing output as JSON.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_name: default_file_name(),
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value functions
fn default_smtp_port() -> u16 {
    587
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".idle-sentinel"))
        .unwrap_or_else(|| PathBuf::from(".idle-sentinel"))
}

fn default_file_name() -> String {
    "idle-log.txt".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = config_path {
            Self::from_file(path)?
        } else {
            // Try default config locations
            let default_paths = [
                PathBuf::from("config/default.toml"),
                dirs::config_dir()
                    .map(|d| d.join("idle-sentinel/config.toml"))
                    .unwrap_or_default(),
            ];

            let mut loaded = None;
            for path in &default_paths {
                if path.is_file() {
                    loaded = Some(Self::from_file(path)?);
                    break;
                }
            }
            loaded.unwrap_or_default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());

        // Expand home directory in data_dir
        config.logging.data_dir = expand_tilde(&config.logging.data_dir);

        Ok(config)
    }

    /// Apply `IDLE_SENTINEL_*` overrides looked up through `var`.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("IDLE_SENTINEL_SMTP_HOST") {
            self.smtp.host = Some(val);
        }
        if let Some(val) = var("IDLE_SENTINEL_SMTP_PORT") {
            if let Ok(v) = val.parse() {
                self.smtp.port = v;
            }
        }
        if let Some(val) = var("IDLE_SENTINEL_SMTP_USERNAME") {
            self.smtp.username = Some(val);
        }
        if let Some(val) = var("IDLE_SENTINEL_SMTP_PASSWORD") {
            self.smtp.password = Some(val);
        }
        if let Some(val) = var("IDLE_SENTINEL_SMTP_FROM") {
            self.smtp.from = Some(val);
        }
        if let Some(val) = var("IDLE_SENTINEL_SMTP_TO") {
            self.smtp.to = Some(val);
        }
        if let Some(val) = var("IDLE_SENTINEL_DATA_DIR") {
            self.logging.data_dir = PathBuf::from(val);
        }
        if let Some(val) = var("IDLE_SENTINEL_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.logging.file_name.is_empty() {
            anyhow::bail!("Event log file name cannot be empty");
        }
        if self.smtp.is_configured() {
            if self.smtp.port == 0 {
                anyhow::bail!("SMTP port must be greater than 0");
            }
            if self.smtp.retry_attempts == 0 {
                anyhow::bail!("SMTP retry attempts must be greater than 0");
            }
            if self.smtp.username.is_some() != self.smtp.password.is_some() {
                anyhow::bail!("SMTP username and password must be set together");
            }
            if self.smtp.username.is_none() {
                anyhow::bail!("SMTP credentials are required when a host is set");
            }
            if self.smtp.to.as_deref().map_or(true, str::is_empty) {
                anyhow::bail!("SMTP recipient must be set when a host is set");
            }
        }
        Ok(())
    }
}

/// Expand ~ to home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn configured() -> Config {
        Config {
            smtp: SmtpConfig {
                host: Some("smtp.example.com".into()),
                username: Some("alerts@example.com".into()),
                password: Some("secret".into()),
                to: Some("admin@example.com".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.smtp.is_configured());
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.smtp.retry_attempts, 3);
        assert_eq!(config.logging.file_name, "idle-log.txt");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[smtp]
host = "smtp.example.com"
port = 465
to = "admin@example.com"

[logging]
data_dir = "/var/lib/idle-sentinel"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.smtp.host.as_deref(), Some("smtp.example.com"));
        assert_eq!(config.smtp.port, 465);
        assert_eq!(config.smtp.retry_attempts, 3);
        assert_eq!(
            config.logging.data_dir,
            PathBuf::from("/var/lib/idle-sentinel")
        );
        assert_eq!(config.logging.file_name, "idle-log.txt");
    }

    #[test]
    fn test_example_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/example.toml");
        let config = Config::from_file(path).unwrap();
        assert!(config.smtp.is_configured());
        assert_eq!(config.smtp.to.as_deref(), Some("admin@example.com"));
        assert!(config.smtp.password.is_none());
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[smtp\nport = ").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        assert!(Config::load(Some(Path::new("/nonexistent/idle-sentinel.toml"))).is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("IDLE_SENTINEL_SMTP_HOST", "mail.internal"),
            ("IDLE_SENTINEL_SMTP_PORT", "2525"),
            ("IDLE_SENTINEL_SMTP_USERNAME", "svc"),
            ("IDLE_SENTINEL_SMTP_PASSWORD", "pw"),
            ("IDLE_SENTINEL_SMTP_TO", "ops@example.com"),
            ("IDLE_SENTINEL_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.smtp.host.as_deref(), Some("mail.internal"));
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.smtp.username.as_deref(), Some("svc"));
        assert_eq!(config.smtp.password.as_deref(), Some("pw"));
        assert_eq!(config.smtp.to.as_deref(), Some("ops@example.com"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_override_ignores_unparsable_port() {
        let mut config = Config::default();
        config.apply_overrides(|k| (k == "IDLE_SENTINEL_SMTP_PORT").then(|| "smtp".to_string()));
        assert_eq!(config.smtp.port, 587);
    }

    #[test]
    fn test_validate_rejects_half_credentials() {
        let mut config = configured();
        config.smtp.password = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_recipient() {
        let mut config = configured();
        config.smtp.to = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut config = configured();
        config.smtp.retry_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", configured());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/logs")), home.join("logs"));
        }
        assert_eq!(expand_tilde(Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
    }
}
