//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Token issuing configuration.
    pub auth: AuthConfig,
    /// Login anomaly and audit settings.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Outbound mail. Alerts are only logged when absent.
    #[serde(default)]
    pub mail: Option<MailConfig>,
    /// Log output configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens.
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

/// Login anomaly detection and audit settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Window during which repeated alerts for the same user and IP are suppressed.
    #[serde(default = "default_notification_window_secs")]
    pub notification_window_secs: u64,
    /// IANA timezone used to render timestamps in alert emails.
    #[serde(default = "default_alert_timezone")]
    pub alert_timezone: String,
    /// Number of audit entries returned per history request.
    #[serde(default = "default_audit_page_size")]
    pub audit_page_size: u64,
    /// Interval between sweeps of expired throttle entries.
    #[serde(default = "default_throttle_sweep_secs")]
    pub throttle_sweep_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            notification_window_secs: default_notification_window_secs(),
            alert_timezone: default_alert_timezone(),
            audit_page_size: default_audit_page_size(),
            throttle_sweep_secs: default_throttle_sweep_secs(),
        }
    }
}

/// SMTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Use STARTTLS instead of implicit TLS.
    #[serde(default = "default_true")]
    pub starttls: bool,
    /// SMTP username.
    #[serde(default)]
    pub username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub password: Option<String>,
    /// Sender address.
    pub from_address: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Emit JSON lines instead of human readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_token_ttl_secs() -> u64 {
    3600
}

const fn default_notification_window_secs() -> u64 {
    10
}

fn default_alert_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

const fn default_audit_page_size() -> u64 {
    50
}

const fn default_throttle_sweep_secs() -> u64 {
    60
}

const fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Keyward".to_string()
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `KEYWARD_ENV`)
    /// 3. Environment variables with `KEYWARD_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("KEYWARD_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("KEYWARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize::<Self>()?.validated()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("KEYWARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize::<Self>()?.validated()
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    /// Reject values that deserialize but cannot run.
    fn validated(self) -> Result<Self, config::ConfigError> {
        if self.security.audit_page_size == 0 {
            return Err(config::ConfigError::Message(
                "security.audit_page_size must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [server]

        [database]
        url = "postgres://localhost/keyward"

        [auth]
        jwt_secret = "test-secret"
    "#;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.security.notification_window_secs, 10);
        assert_eq!(config.security.audit_page_size, 50);
        assert_eq!(config.security.alert_timezone, "America/Sao_Paulo");
        assert!(config.mail.is_none());
        assert!(!config.log.json);
    }

    #[test]
    fn test_mail_section() {
        let source = format!(
            "{MINIMAL}\n[mail]\nsmtp_host = \"smtp.example.com\"\nfrom_address = \"alerts@example.com\"\n"
        );
        let config = Config::from_toml_str(&source).unwrap();
        let mail = config.mail.unwrap();

        assert_eq!(mail.smtp_port, 587);
        assert!(mail.starttls);
        assert_eq!(mail.from_name, "Keyward");
        assert!(mail.username.is_none());
    }

    #[test]
    fn test_zero_audit_page_size_is_rejected() {
        let source = format!("{MINIMAL}\n[security]\naudit_page_size = 0\n");
        let err = Config::from_toml_str(&source).unwrap_err();

        assert!(err.to_string().contains("audit_page_size"));
    }

    #[test]
    fn test_missing_jwt_secret_is_rejected() {
        let source = "[server]\n[database]\nurl = \"postgres://localhost/keyward\"\n[auth]\n";
        assert!(Config::from_toml_str(source).is_err());
    }
}
