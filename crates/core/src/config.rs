use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{Clock, FixedYear, SystemClock};

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["cotation.toml", "config/cotation.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub tables: TablesConfig,
    pub quote: QuoteConfig,
    pub server: ServerConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct TablesConfig {
    pub dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct QuoteConfig {
    /// Pins the year used to compute ages. The system clock is used when unset.
    pub reference_year: Option<i32>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    /// Sessions untouched for this long are dropped.
    pub session_idle_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ExportConfig {
    /// Directory holding `recap.html.tera`. The embedded template is used when
    /// unset.
    pub template_dir: Option<PathBuf>,
    pub use_wkhtmltopdf: bool,
    pub company_name: String,
    /// Undownloaded exports are discarded after this many seconds.
    pub retention_secs: u64,
    pub max_pending: usize,
}

#[derive(Clone, Debug)]
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
    pub tables_dir: Option<PathBuf>,
    pub reference_year: Option<i32>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
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
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tables: TablesConfig { dir: PathBuf::from("data/rates") },
            quote: QuoteConfig { reference_year: None },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
                session_idle_secs: 1_800,
            },
            export: ExportConfig {
                template_dir: None,
                use_wkhtmltopdf: true,
                company_name: "Cotation".to_string(),
                retention_secs: 900,
                max_pending: 256,
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Clock matching `quote.reference_year`.
    pub fn clock(&self) -> Arc<dyn Clock> {
        match self.quote.reference_year {
            Some(year) => Arc::new(FixedYear(year)),
            None => Arc::new(SystemClock),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(tables) = patch.tables {
            if let Some(dir) = tables.dir {
                self.tables.dir = dir;
            }
        }

        if let Some(quote) = patch.quote {
            if let Some(reference_year) = quote.reference_year {
                self.quote.reference_year = Some(reference_year);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(session_idle_secs) = server.session_idle_secs {
                self.server.session_idle_secs = session_idle_secs;
            }
        }

        if let Some(export) = patch.export {
            if let Some(template_dir) = export.template_dir {
                self.export.template_dir = Some(template_dir);
            }
            if let Some(use_wkhtmltopdf) = export.use_wkhtmltopdf {
                self.export.use_wkhtmltopdf = use_wkhtmltopdf;
            }
            if let Some(company_name) = export.company_name {
                self.export.company_name = company_name;
            }
            if let Some(retention_secs) = export.retention_secs {
                self.export.retention_secs = retention_secs;
            }
            if let Some(max_pending) = export.max_pending {
                self.export.max_pending = max_pending;
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
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COTATION_TABLES_DIR") {
            self.tables.dir = PathBuf::from(value);
        }

        if let Some(value) = read_env("COTATION_QUOTE_REFERENCE_YEAR") {
            self.quote.reference_year = Some(parse_i32("COTATION_QUOTE_REFERENCE_YEAR", &value)?);
        }

        if let Some(value) = read_env("COTATION_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("COTATION_SERVER_PORT") {
            self.server.port = parse_u16("COTATION_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("COTATION_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("COTATION_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("COTATION_SERVER_SESSION_IDLE_SECS") {
            self.server.session_idle_secs =
                parse_u64("COTATION_SERVER_SESSION_IDLE_SECS", &value)?;
        }

        if let Some(value) = read_env("COTATION_EXPORT_TEMPLATE_DIR") {
            self.export.template_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("COTATION_EXPORT_USE_WKHTMLTOPDF") {
            self.export.use_wkhtmltopdf = parse_bool("COTATION_EXPORT_USE_WKHTMLTOPDF", &value)?;
        }
        if let Some(value) = read_env("COTATION_EXPORT_COMPANY_NAME") {
            self.export.company_name = value;
        }
        if let Some(value) = read_env("COTATION_EXPORT_RETENTION_SECS") {
            self.export.retention_secs = parse_u64("COTATION_EXPORT_RETENTION_SECS", &value)?;
        }
        if let Some(value) = read_env("COTATION_EXPORT_MAX_PENDING") {
            self.export.max_pending = parse_usize("COTATION_EXPORT_MAX_PENDING", &value)?;
        }

        let log_level =
            read_env("COTATION_LOGGING_LEVEL").or_else(|| read_env("COTATION_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COTATION_LOGGING_FORMAT").or_else(|| read_env("COTATION_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(tables_dir) = overrides.tables_dir {
            self.tables.dir = tables_dir;
        }
        if let Some(reference_year) = overrides.reference_year {
            self.quote.reference_year = Some(reference_year);
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tables(&self.tables)?;
        validate_quote(&self.quote)?;
        validate_server(&self.server)?;
        validate_export(&self.export)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_tables(tables: &TablesConfig) -> Result<(), ConfigError> {
    if tables.dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "tables.dir must point to the rate table directory".to_string(),
        ));
    }
    Ok(())
}

fn validate_quote(quote: &QuoteConfig) -> Result<(), ConfigError> {
    if let Some(year) = quote.reference_year {
        if !(1900..=9999).contains(&year) {
            return Err(ConfigError::Validation(
                "quote.reference_year must be in range 1900..=9999".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if server.session_idle_secs == 0 {
        return Err(ConfigError::Validation(
            "server.session_idle_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_export(export: &ExportConfig) -> Result<(), ConfigError> {
    if export.company_name.trim().is_empty() {
        return Err(ConfigError::Validation("export.company_name must not be empty".to_string()));
    }
    if export.retention_secs == 0 || export.max_pending == 0 {
        return Err(ConfigError::Validation(
            "export.retention_secs and export.max_pending must be greater than zero".to_string(),
        ));
    }
    if let Some(dir) = &export.template_dir {
        if dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "export.template_dir must not be empty when set".to_string(),
            ));
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

fn parse_i32(key: &str, value: &str) -> Result<i32, ConfigError> {
    value.trim().parse::<i32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    tables: Option<TablesPatch>,
    quote: Option<QuotePatch>,
    server: Option<ServerPatch>,
    export: Option<ExportPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct TablesPatch {
    dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotePatch {
    reference_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    session_idle_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportPatch {
    template_dir: Option<PathBuf>,
    use_wkhtmltopdf: Option<bool>,
    company_name: Option<String>,
    retention_secs: Option<u64>,
    max_pending: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
