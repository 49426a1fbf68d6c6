//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{
    CliArgs, Command, CutoffCommand, CutoffSearchArgs, InstitutionCommand, InstitutionSearchArgs,
    KindArg, ListArgs, Overrides, RecordCommand, UpdatesArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "collegium";
const ENV_PREFIX: &str = "COLLEGIUM";
const DEFAULT_STORE_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_KEY_PREFIX: &str = "collegium";
const DEFAULT_DETAIL_TTL_SECS: u64 = 60 * 60;
const DEFAULT_LIST_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_SEARCH_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_FEED_TTL_SECS: u64 = 5 * 60;
const DEFAULT_MEMORY_CAPACITY: usize = 10_000;
const DEFAULT_PAGE_LIMIT: u32 = 10;
const DEFAULT_MAX_PAGE_LIMIT: u32 = 100;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub cache: CacheSettings,
    pub pagination: PaginationSettings,
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

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres { url: String },
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis { url: String },
    Disabled,
}

/// How list and search entries are invalidated after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationMode {
    /// Prefix deletion when the cache store supports it, generation tags otherwise.
    #[default]
    Auto,
    Prefix,
    Generation,
}

impl FromStr for InvalidationMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "prefix" => Ok(Self::Prefix),
            "generation" => Ok(Self::Generation),
            other => Err(format!(
                "unknown invalidation mode `{other}` (expected auto|prefix|generation)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub key_prefix: String,
    pub detail_ttl: Duration,
    pub list_ttl: Duration,
    pub search_ttl: Duration,
    pub feed_ttl: Duration,
    pub memory_capacity: NonZeroUsize,
    pub search_reads_enabled: bool,
    pub invalidation: InvalidationMode,
}

#[derive(Debug, Clone)]
pub struct PaginationSettings {
    pub default_limit: NonZeroU32,
    pub max_limit: NonZeroU32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_limit: NonZeroU32::new(DEFAULT_PAGE_LIMIT).unwrap_or(NonZeroU32::MIN),
            max_limit: NonZeroU32::new(DEFAULT_MAX_PAGE_LIMIT).unwrap_or(NonZeroU32::MIN),
        }
    }
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

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    cache: RawCacheSettings,
    pagination: RawPaginationSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(backend) = overrides.store_backend.as_ref() {
            self.store.backend = Some(backend.clone());
        }
        if let Some(url) = overrides.store_url.as_ref() {
            self.store.url = Some(url.clone());
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(url) = overrides.cache_url.as_ref() {
            self.cache.url = Some(url.clone());
        }
        if let Some(mode) = overrides.cache_invalidation.as_ref() {
            self.cache.invalidation = Some(mode.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            store,
            cache,
            pagination,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            store: build_store_settings(store)?,
            cache: build_cache_settings(cache)?,
            pagination: build_pagination_settings(pagination)?,
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

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let url = non_blank(store.url);
    let backend = match store.backend.as_deref().map(str::trim) {
        None | Some("memory") => StoreBackend::Memory,
        Some("postgres") => StoreBackend::Postgres {
            url: url.ok_or_else(|| {
                LoadError::invalid("store.url", "required when store.backend is postgres")
            })?,
        },
        Some(other) => {
            return Err(LoadError::invalid(
                "store.backend",
                format!("unknown backend `{other}` (expected memory|postgres)"),
            ));
        }
    };

    let max_connections = non_zero_u32(
        store
            .max_connections
            .unwrap_or(DEFAULT_STORE_MAX_CONNECTIONS)
            .into(),
        "store.max_connections",
    )?;

    Ok(StoreSettings {
        backend,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let url = non_blank(cache.url);
    let backend = match cache.backend.as_deref().map(str::trim) {
        None | Some("memory") => CacheBackend::Memory,
        Some("redis") => CacheBackend::Redis {
            url: url.ok_or_else(|| {
                LoadError::invalid("cache.url", "required when cache.backend is redis")
            })?,
        },
        Some("disabled") => CacheBackend::Disabled,
        Some(other) => {
            return Err(LoadError::invalid(
                "cache.backend",
                format!("unknown backend `{other}` (expected memory|redis|disabled)"),
            ));
        }
    };

    let key_prefix = non_blank(cache.key_prefix).unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());
    if key_prefix.contains(['*', '?', '[', ']']) {
        return Err(LoadError::invalid(
            "cache.key_prefix",
            "must not contain glob metacharacters",
        ));
    }

    let memory_capacity = NonZeroUsize::new(
        cache
            .memory_capacity
            .unwrap_or(DEFAULT_MEMORY_CAPACITY),
    )
    .ok_or_else(|| LoadError::invalid("cache.memory_capacity", "must be greater than zero"))?;

    let invalidation = match cache.invalidation {
        Some(value) => InvalidationMode::from_str(&value)
            .map_err(|reason| LoadError::invalid("cache.invalidation", reason))?,
        None => InvalidationMode::Auto,
    };

    Ok(CacheSettings {
        backend,
        key_prefix,
        detail_ttl: ttl(
            cache.detail_ttl_seconds,
            DEFAULT_DETAIL_TTL_SECS,
            "cache.detail_ttl_seconds",
        )?,
        list_ttl: ttl(
            cache.list_ttl_seconds,
            DEFAULT_LIST_TTL_SECS,
            "cache.list_ttl_seconds",
        )?,
        search_ttl: ttl(
            cache.search_ttl_seconds,
            DEFAULT_SEARCH_TTL_SECS,
            "cache.search_ttl_seconds",
        )?,
        feed_ttl: ttl(
            cache.feed_ttl_seconds,
            DEFAULT_FEED_TTL_SECS,
            "cache.feed_ttl_seconds",
        )?,
        memory_capacity,
        search_reads_enabled: cache.search_reads_enabled.unwrap_or(true),
        invalidation,
    })
}

fn build_pagination_settings(
    pagination: RawPaginationSettings,
) -> Result<PaginationSettings, LoadError> {
    let default_limit = non_zero_u32(
        pagination.default_limit.unwrap_or(DEFAULT_PAGE_LIMIT).into(),
        "pagination.default_limit",
    )?;
    let max_limit = non_zero_u32(
        pagination.max_limit.unwrap_or(DEFAULT_MAX_PAGE_LIMIT).into(),
        "pagination.max_limit",
    )?;
    if default_limit > max_limit {
        return Err(LoadError::invalid(
            "pagination.default_limit",
            format!("must not exceed pagination.max_limit ({max_limit})"),
        ));
    }

    Ok(PaginationSettings {
        default_limit,
        max_limit,
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
struct RawStoreSettings {
    backend: Option<String>,
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    backend: Option<String>,
    url: Option<String>,
    key_prefix: Option<String>,
    detail_ttl_seconds: Option<u64>,
    list_ttl_seconds: Option<u64>,
    search_ttl_seconds: Option<u64>,
    feed_ttl_seconds: Option<u64>,
    memory_capacity: Option<usize>,
    search_reads_enabled: Option<bool>,
    invalidation: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPaginationSettings {
    default_limit: Option<u32>,
    max_limit: Option<u32>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn ttl(value: Option<u64>, default: u64, key: &'static str) -> Result<Duration, LoadError> {
    let seconds = value.unwrap_or(default);
    if seconds == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(seconds))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
