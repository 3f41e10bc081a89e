//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use uuid::Uuid;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "pubcache";
const ENV_PREFIX: &str = "PUBCACHE";
const DEFAULT_EXPIRATION_SECS: u64 = 300;
const DEFAULT_LOCAL_EXPIRATION_SECS: u64 = 300;
const DEFAULT_SEED_EXPIRATION_DAYS: u64 = 365;
const DEFAULT_LOCAL_CAPACITY: u64 = 10_000;

/// Command-line arguments for the pubcache binary.
#[derive(Debug, Parser)]
#[command(
    name = "pubcache",
    version,
    about = "Published-content cache over a content archive"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PUBCACHE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: SettingsOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Pin the published entry of every published item in the archive.
    Seed(SeedArgs),
    /// Print the published view of one item as JSON.
    Get(GetArgs),
    /// Report whether one item is cached after seeding.
    Has(HasArgs),
}

#[derive(Debug, Args, Clone)]
pub struct SeedArgs {
    /// Content archive (TOML) to load.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub archive: PathBuf,

    /// Restrict seeding to these content type ids; repeatable.
    #[arg(long = "content-type", value_name = "ID")]
    pub content_types: Vec<i32>,
}

#[derive(Debug, Args, Clone)]
pub struct GetArgs {
    /// Content archive (TOML) to load.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub archive: PathBuf,

    /// Numeric id of the item.
    #[arg(long, value_name = "ID", conflicts_with = "key", required_unless_present = "key")]
    pub id: Option<i32>,

    /// Key of the item.
    #[arg(long, value_name = "UUID")]
    pub key: Option<Uuid>,

    /// Read the draft variant, falling back to published.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub preview: bool,

    /// Look the item up as media rather than content.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub media: bool,

    /// Look the item up among the archive's members.
    #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "media")]
    pub member: bool,
}

#[derive(Debug, Args, Clone)]
pub struct HasArgs {
    /// Content archive (TOML) to load.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub archive: PathBuf,

    /// Numeric id of the content item.
    #[arg(long, value_name = "ID")]
    pub id: i32,

    /// Check the draft variant.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub preview: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SettingsOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Toggle the in-process cache tier.
    #[arg(
        long = "cache-local-tier",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_local_tier: Option<bool>,

    /// Override the in-process tier capacity (entries).
    #[arg(long = "cache-local-capacity", value_name = "COUNT", global = true)]
    pub cache_local_capacity: Option<u64>,

    /// Override the default distributed-tier entry lifetime.
    #[arg(long = "cache-expiration-seconds", value_name = "SECONDS", global = true)]
    pub cache_expiration_seconds: Option<u64>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enable_local_tier: bool,
    pub local_capacity: NonZeroUsize,
    pub default_expiration: Duration,
    pub local_expiration: Duration,
    pub seed_expiration_days: NonZeroU64,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_local_tier {
            self.cache.enable_local_tier = Some(enabled);
        }
        if let Some(capacity) = overrides.cache_local_capacity {
            self.cache.local_capacity = Some(capacity);
        }
        if let Some(seconds) = overrides.cache_expiration_seconds {
            self.cache.default_expiration_secs = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings { logging, cache } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity = non_zero_u64(
        cache.local_capacity.unwrap_or(DEFAULT_LOCAL_CAPACITY),
        "cache.local_capacity",
    )?;
    let local_capacity = usize::try_from(capacity.get())
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            LoadError::invalid(
                "cache.local_capacity",
                "value exceeds supported range for usize",
            )
        })?;

    let default_expiration = non_zero_u64(
        cache
            .default_expiration_secs
            .unwrap_or(DEFAULT_EXPIRATION_SECS),
        "cache.default_expiration_secs",
    )?;
    let local_expiration = non_zero_u64(
        cache
            .local_expiration_secs
            .unwrap_or(DEFAULT_LOCAL_EXPIRATION_SECS),
        "cache.local_expiration_secs",
    )?;
    let seed_expiration_days = non_zero_u64(
        cache
            .seed_expiration_days
            .unwrap_or(DEFAULT_SEED_EXPIRATION_DAYS),
        "cache.seed_expiration_days",
    )?;

    Ok(CacheSettings {
        enable_local_tier: cache.enable_local_tier.unwrap_or(true),
        local_capacity,
        default_expiration: Duration::from_secs(default_expiration.get()),
        local_expiration: Duration::from_secs(local_expiration.get()),
        seed_expiration_days,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enable_local_tier: Option<bool>,
    local_capacity: Option<u64>,
    default_expiration_secs: Option<u64>,
    local_expiration_secs: Option<u64>,
    seed_expiration_days: Option<u64>,
}

fn non_zero_u64(value: u64, key: &'static str) -> Result<NonZeroU64, LoadError> {
    NonZeroU64::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.logging.level, LevelFilter::INFO);
        assert!(matches!(settings.logging.format, LogFormat::Compact));
        assert!(settings.cache.enable_local_tier);
        assert_eq!(settings.cache.local_capacity.get(), 10_000);
        assert_eq!(settings.cache.default_expiration, Duration::from_secs(300));
        assert_eq!(settings.cache.local_expiration, Duration::from_secs(300));
        assert_eq!(settings.cache.seed_expiration_days.get(), 365);
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.logging.level = Some("info".to_string());
        raw.cache.local_capacity = Some(50);

        let overrides = SettingsOverrides {
            log_level: Some("debug".to_string()),
            cache_local_capacity: Some(64),
            cache_local_tier: Some(false),
            ..Default::default()
        };

        raw.apply_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
        assert_eq!(settings.cache.local_capacity.get(), 64);
        assert!(!settings.cache.enable_local_tier);
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        raw.apply_overrides(&SettingsOverrides {
            log_json: Some(true),
            ..Default::default()
        });
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn zero_lifetimes_are_rejected() {
        let mut raw = RawSettings::default();
        raw.cache.default_expiration_secs = Some(0);

        let err = Settings::from_raw(raw).expect_err("zero expiration must fail");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "cache.default_expiration_secs",
                ..
            }
        ));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut raw = RawSettings::default();
        raw.cache.local_capacity = Some(0);
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let mut raw = RawSettings::default();
        raw.logging.level = Some("chatty".to_string());
        assert!(matches!(
            Settings::from_raw(raw),
            Err(LoadError::Invalid { key: "logging.level", .. })
        ));
    }

    #[test]
    fn explicit_config_file_is_layered_in() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp config");
        writeln!(file, "[cache]\nlocal_capacity = 42\nseed_expiration_days = 30").expect("write");

        let args = CliArgs::parse_from([
            "pubcache",
            "--config-file",
            file.path().to_str().expect("utf-8 path"),
            "has",
            "--archive",
            "site.toml",
            "--id",
            "1",
        ]);
        let settings = load(&args).expect("settings");

        assert_eq!(settings.cache.local_capacity.get(), 42);
        assert_eq!(settings.cache.seed_expiration_days.get(), 30);
    }

    #[test]
    fn parse_seed_arguments() {
        let args = CliArgs::parse_from([
            "pubcache",
            "seed",
            "--archive",
            "site.toml",
            "--content-type",
            "1",
            "--content-type",
            "2",
            "--log-level",
            "warn",
        ]);

        match args.command {
            Command::Seed(seed) => {
                assert_eq!(seed.archive, PathBuf::from("site.toml"));
                assert_eq!(seed.content_types, vec![1, 2]);
            }
            other => panic!("expected seed command, got {other:?}"),
        }
        assert_eq!(args.overrides.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn parse_get_arguments() {
        let key = Uuid::new_v4();
        let key_text = key.to_string();
        let args = CliArgs::parse_from([
            "pubcache",
            "get",
            "--archive",
            "site.toml",
            "--key",
            key_text.as_str(),
            "--preview",
        ]);

        match args.command {
            Command::Get(get) => {
                assert_eq!(get.key, Some(key));
                assert!(get.id.is_none());
                assert!(get.preview);
                assert!(!get.media);
                assert!(!get.member);
            }
            other => panic!("expected get command, got {other:?}"),
        }
    }

    #[test]
    fn media_and_member_lookups_conflict() {
        let result = CliArgs::try_parse_from([
            "pubcache", "get", "--archive", "site.toml", "--id", "1", "--media", "--member",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn get_requires_an_id_or_key() {
        let result = CliArgs::try_parse_from(["pubcache", "get", "--archive", "site.toml"]);
        assert!(result.is_err());
    }
}
