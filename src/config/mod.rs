use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("can't parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("duration \"{0}\" must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Raw file layout, mirrors config.yaml one to one
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    log_level: String,
    database: DatabaseConfig,
    cache: CacheConfig,
    reservation: ReservationConfig,
    client_session: SessionConfig,
    server: ServerConfig,
    elements: BTreeMap<String, ElementCategory>,
    mail: MailConfig,
    certificate: CertificateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
}

/// Numeric range and display data of one mnemonic category (e.g. "pv")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementCategory {
    pub from: u32,
    pub to: u32,
    pub label: String,
    #[serde(default)]
    pub article: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub from: String,
    pub sender_name: String,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertificateConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(with = "humantime_serde")]
    pub expiration: Duration,
    #[serde(with = "humantime_serde")]
    pub purge: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReservationConfig {
    #[serde(with = "humantime_serde")]
    expiration: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    pub jwt_signature: String,
    #[serde(with = "humantime_serde")]
    pub expire: Duration,
}

/// Validated application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub reservation_expiration: Duration,
    pub session: SessionConfig,
    pub server: ServerConfig,
    pub elements: BTreeMap<String, ElementCategory>,
    pub mail: MailConfig,
    pub certificate: CertificateConfig,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&raw).map(Self::with_env_overrides)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(raw)?;
        Self::from_file(file)
    }

    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let config = Self {
            log_level: file.log_level,
            database: file.database,
            cache: file.cache,
            reservation_expiration: file.reservation.expiration,
            session: file.client_session,
            server: file.server,
            elements: file.elements,
            mail: file.mail,
            certificate: file.certificate,
        };

        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("SPONSORSHIP_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(port) = env::var("SPONSORSHIP_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("SPONSORSHIP_JWT_SIGNATURE") {
            if !v.is_empty() {
                self.session.jwt_signature = v;
            }
        }

        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, duration) in [
            ("cache.expiration", self.cache.expiration),
            ("cache.purge", self.cache.purge),
            ("reservation.expiration", self.reservation_expiration),
            ("client_session.expire", self.session.expire),
        ] {
            if duration.is_zero() {
                return Err(ConfigError::ZeroDuration(key));
            }
        }
        if self.session.jwt_signature.is_empty() {
            return Err(ConfigError::Invalid(
                "client_session.jwt_signature must not be empty".to_string(),
            ));
        }
        if self.elements.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one element category must be configured".to_string(),
            ));
        }
        for (category, range) in &self.elements {
            if category.is_empty() || !category.chars().all(|c| c.is_ascii_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "element category {:?} must consist of lowercase letters",
                    category
                )));
            }
            if range.from > range.to {
                return Err(ConfigError::Invalid(format!(
                    "element category {:?}: from ({}) is greater than to ({})",
                    category, range.from, range.to
                )));
            }
        }

        Ok(())
    }

    /// Connection URL for the store; `DATABASE_URL` wins when set
    pub fn database_url(&self) -> Result<String, ConfigError> {
        if let Ok(url) = env::var("DATABASE_URL") {
            return Ok(url);
        }

        let db = &self.database;
        let mut url = url::Url::parse(&format!("postgres://{}", db.host))
            .map_err(|e| ConfigError::Invalid(format!("database.host: {}", e)))?;
        url.set_username(&db.user)
            .map_err(|_| ConfigError::Invalid("database.user".to_string()))?;
        url.set_password(Some(&db.password))
            .map_err(|_| ConfigError::Invalid("database.password".to_string()))?;
        url.set_path(&format!("/{}", db.database));

        Ok(url.into())
    }
}

/// Durations are written the way humans do: "90s", "72h", "1h 30m"
mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) const SAMPLE: &str = r#"
log_level: debug
database:
  host: localhost:5432
  user: sponsor
  password: "s3cr#t"
  database: sponsorship
cache:
  expiration: 5m
  purge: 10m
reservation:
  expiration: 72h
client_session:
  jwt_signature: test-signature
  expire: 24h
server:
  port: 8080
elements:
  pv:
    from: 1
    to: 120
    label: PV-Modul
    article: das
  bs:
    from: 1
    to: 12
    label: Batteriespeicher
    article: den
mail:
  host: smtp.example.org
  user: mailer
  password: hunter2
  from: sponsorship@example.org
  sender_name: Sponsorship
certificate:
  command: typst
  args: ["compile", "--input", "name={name}", "templates/certificate.typ", "{output}"]
  output_dir: /tmp/certificates
"#;
