use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::notification::{NotificationPreference, QuietHours};
use crate::errors::{ApplicationError, DomainError};
use crate::estimation::{EstimationSettings, MAX_ADD_ONS_ALLOWED};
use crate::lifecycle::StatusRegistry;

#[derive(Clone, Debug, Serialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub estimation: EstimationConfig,
    pub lifecycle: LifecycleConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct EstimationConfig {
    pub currency: String,
    pub min_range: Decimal,
    pub max_range: Decimal,
    pub max_add_ons: usize,
    pub default_tax_percent: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct LifecycleConfig {
    pub transitions_path: Option<PathBuf>,
    pub max_transition_attempts: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct NotificationConfig {
    pub quiet_hours_enabled: bool,
    pub quiet_hours_start: NaiveTime,
    pub quiet_hours_end: NaiveTime,
    pub urgent_always_enabled: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub currency: Option<String>,
    pub transitions_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid transition table file `{path}`: {source}")]
    Transitions { path: PathBuf, source: DomainError },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://carepath.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            estimation: EstimationConfig {
                currency: "USD".to_string(),
                min_range: Decimal::from(10_000),
                max_range: Decimal::from(20_000),
                max_add_ons: MAX_ADD_ONS_ALLOWED,
                default_tax_percent: Decimal::ZERO,
            },
            lifecycle: LifecycleConfig { transitions_path: None, max_transition_attempts: 3 },
            notifications: NotificationConfig {
                quiet_hours_enabled: false,
                quiet_hours_start: clock(22, 0),
                quiet_hours_end: clock(7, 0),
                urgent_always_enabled: true,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl EstimationConfig {
    pub fn settings(&self) -> EstimationSettings {
        EstimationSettings {
            currency: self.currency.clone(),
            min_range: self.min_range,
            max_range: self.max_range,
            max_add_ons: self.max_add_ons,
        }
    }
}

impl LifecycleConfig {
    /// Standard tables, with the rows from `transitions_path` applied when it is set.
    pub fn build_registry(&self) -> Result<StatusRegistry, ConfigError> {
        let Some(path) = &self.transitions_path else {
            return Ok(StatusRegistry::standard());
        };

        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
        StatusRegistry::standard()
            .with_overrides_toml(&raw)
            .map_err(|source| ConfigError::Transitions { path: path.clone(), source })
    }
}

impl NotificationConfig {
    /// Preference applied to users that have not saved their own yet.
    pub fn default_preference(&self) -> NotificationPreference {
        let mut quiet_hours = QuietHours::new(self.quiet_hours_start, self.quiet_hours_end);
        quiet_hours.enabled = self.quiet_hours_enabled;

        NotificationPreference::default()
            .with_quiet_hours(quiet_hours)
            .with_urgent_always_enabled(self.urgent_always_enabled)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("carepath.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(estimation) = patch.estimation {
            if let Some(currency) = estimation.currency {
                self.estimation.currency = currency;
            }
            if let Some(min_range) = estimation.min_range {
                self.estimation.min_range = min_range;
            }
            if let Some(max_range) = estimation.max_range {
                self.estimation.max_range = max_range;
            }
            if let Some(max_add_ons) = estimation.max_add_ons {
                self.estimation.max_add_ons = max_add_ons;
            }
            if let Some(default_tax_percent) = estimation.default_tax_percent {
                self.estimation.default_tax_percent = default_tax_percent;
            }
        }

        if let Some(lifecycle) = patch.lifecycle {
            if let Some(transitions_path) = lifecycle.transitions_path {
                self.lifecycle.transitions_path = Some(transitions_path);
            }
            if let Some(max_transition_attempts) = lifecycle.max_transition_attempts {
                self.lifecycle.max_transition_attempts = max_transition_attempts;
            }
        }

        if let Some(notifications) = patch.notifications {
            if let Some(enabled) = notifications.quiet_hours_enabled {
                self.notifications.quiet_hours_enabled = enabled;
            }
            if let Some(start) = notifications.quiet_hours_start {
                self.notifications.quiet_hours_start =
                    parse_clock("notifications.quiet_hours_start", &start)?;
            }
            if let Some(end) = notifications.quiet_hours_end {
                self.notifications.quiet_hours_end =
                    parse_clock("notifications.quiet_hours_end", &end)?;
            }
            if let Some(urgent_always_enabled) = notifications.urgent_always_enabled {
                self.notifications.urgent_always_enabled = urgent_always_enabled;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CAREPATH_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CAREPATH_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("CAREPATH_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CAREPATH_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("CAREPATH_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CAREPATH_ESTIMATION_CURRENCY") {
            self.estimation.currency = value;
        }
        if let Some(value) = read_env("CAREPATH_ESTIMATION_MIN_RANGE") {
            self.estimation.min_range = parse_env("CAREPATH_ESTIMATION_MIN_RANGE", &value)?;
        }
        if let Some(value) = read_env("CAREPATH_ESTIMATION_MAX_RANGE") {
            self.estimation.max_range = parse_env("CAREPATH_ESTIMATION_MAX_RANGE", &value)?;
        }
        if let Some(value) = read_env("CAREPATH_ESTIMATION_MAX_ADD_ONS") {
            self.estimation.max_add_ons = parse_env("CAREPATH_ESTIMATION_MAX_ADD_ONS", &value)?;
        }
        if let Some(value) = read_env("CAREPATH_ESTIMATION_DEFAULT_TAX_PERCENT") {
            self.estimation.default_tax_percent =
                parse_env("CAREPATH_ESTIMATION_DEFAULT_TAX_PERCENT", &value)?;
        }

        if let Some(value) = read_env("CAREPATH_LIFECYCLE_TRANSITIONS_PATH") {
            self.lifecycle.transitions_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("CAREPATH_LIFECYCLE_MAX_TRANSITION_ATTEMPTS") {
            self.lifecycle.max_transition_attempts =
                parse_env("CAREPATH_LIFECYCLE_MAX_TRANSITION_ATTEMPTS", &value)?;
        }

        if let Some(value) = read_env("CAREPATH_NOTIFICATIONS_QUIET_HOURS_ENABLED") {
            self.notifications.quiet_hours_enabled =
                parse_env("CAREPATH_NOTIFICATIONS_QUIET_HOURS_ENABLED", &value)?;
        }
        if let Some(value) = read_env("CAREPATH_NOTIFICATIONS_QUIET_HOURS_START") {
            self.notifications.quiet_hours_start =
                parse_env_clock("CAREPATH_NOTIFICATIONS_QUIET_HOURS_START", &value)?;
        }
        if let Some(value) = read_env("CAREPATH_NOTIFICATIONS_QUIET_HOURS_END") {
            self.notifications.quiet_hours_end =
                parse_env_clock("CAREPATH_NOTIFICATIONS_QUIET_HOURS_END", &value)?;
        }
        if let Some(value) = read_env("CAREPATH_NOTIFICATIONS_URGENT_ALWAYS_ENABLED") {
            self.notifications.urgent_always_enabled =
                parse_env("CAREPATH_NOTIFICATIONS_URGENT_ALWAYS_ENABLED", &value)?;
        }

        let log_level =
            read_env("CAREPATH_LOGGING_LEVEL").or_else(|| read_env("CAREPATH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CAREPATH_LOGGING_FORMAT").or_else(|| read_env("CAREPATH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(currency) = overrides.currency {
            self.estimation.currency = currency;
        }
        if let Some(transitions_path) = overrides.transitions_path {
            self.lifecycle.transitions_path = Some(transitions_path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_estimation(&self.estimation)?;
        validate_lifecycle(&self.lifecycle)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("carepath.toml"), PathBuf::from("config/carepath.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Expands `${VAR}` and `${VAR:-fallback}` references in a config file body.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let expression = &rest[start + 2..];
        let end = expression.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        output.push_str(&resolve_interpolation(&expression[..end])?);
        rest = &expression[end + 1..];
    }
    output.push_str(rest);

    Ok(output)
}

fn resolve_interpolation(expression: &str) -> Result<String, ConfigError> {
    let (var, fallback) = match expression.split_once(":-") {
        Some((var, fallback)) => (var.trim(), Some(fallback)),
        None => (expression.trim(), None),
    };

    match (env::var(var), fallback) {
        (Ok(value), _) if !value.is_empty() => Ok(value),
        (_, Some(fallback)) => Ok(fallback.to_string()),
        (Ok(value), None) => Ok(value),
        (Err(_), None) => Err(ConfigError::MissingEnvInterpolation { var: var.to_string() }),
    }
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_estimation(estimation: &EstimationConfig) -> Result<(), ConfigError> {
    let currency = estimation.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(format!(
            "estimation.currency must be a three-letter ISO code such as `USD` (got `{currency}`)"
        )));
    }

    if estimation.min_range < Decimal::ZERO || estimation.min_range > estimation.max_range {
        return Err(ConfigError::Validation(
            "estimation.min_range must be non-negative and not above estimation.max_range"
                .to_string(),
        ));
    }

    if estimation.max_add_ons == 0 || estimation.max_add_ons > MAX_ADD_ONS_ALLOWED {
        return Err(ConfigError::Validation(format!(
            "estimation.max_add_ons must be in range 1..={MAX_ADD_ONS_ALLOWED}"
        )));
    }

    if estimation.default_tax_percent < Decimal::ZERO
        || estimation.default_tax_percent > Decimal::from(100)
    {
        return Err(ConfigError::Validation(
            "estimation.default_tax_percent must be in range 0..=100".to_string(),
        ));
    }

    Ok(())
}

fn validate_lifecycle(lifecycle: &LifecycleConfig) -> Result<(), ConfigError> {
    if lifecycle.max_transition_attempts == 0 || lifecycle.max_transition_attempts > 10 {
        return Err(ConfigError::Validation(
            "lifecycle.max_transition_attempts must be in range 1..=10".to_string(),
        ));
    }

    if let Some(path) = &lifecycle.transitions_path {
        if !path.exists() {
            return Err(ConfigError::Validation(format!(
                "lifecycle.transitions_path `{}` does not exist",
                path.display()
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_env_clock(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    try_clock(value).ok_or_else(|| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_clock(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    try_clock(value).ok_or_else(|| {
        ConfigError::Validation(format!("{key} must be a HH:MM time (got `{value}`)"))
    })
}

fn try_clock(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    estimation: Option<EstimationPatch>,
    lifecycle: Option<LifecyclePatch>,
    notifications: Option<NotificationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EstimationPatch {
    currency: Option<String>,
    min_range: Option<Decimal>,
    max_range: Option<Decimal>,
    max_add_ons: Option<usize>,
    default_tax_percent: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct LifecyclePatch {
    transitions_path: Option<PathBuf>,
    max_transition_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationPatch {
    quiet_hours_enabled: Option<bool>,
    quiet_hours_start: Option<String>,
    quiet_hours_end: Option<String>,
    urgent_always_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
