//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

mod cli;

pub use cli::{BuildArgs, CliArgs, Command, LibraryOverrides, ServeArgs, ServeOverrides};

use crate::domain::{
    error::NameKind,
    library::{DEFAULT_VERSION, LibraryLayout, validate_name},
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "modjulie";
const ENV_PREFIX: &str = "MODJULIE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_VERSIONS_DIRECTORY: &str = "example/library";
const DEFAULT_MODULE_DIRECTORY: &str = "modules";
const DEFAULT_HEADER_DIRECTORY: &str = "headers";
const DEFAULT_PRESET_DIRECTORY: &str = "presets";
const DEFAULT_MAX_AGE_SECS: u64 = 60 * 60 * 24;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 0;
const DEFAULT_CACHE_DEDUPE_INFLIGHT: bool = true;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub library: LibrarySettings,
    pub http: HttpSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
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
pub struct LibrarySettings {
    pub versions_directory: PathBuf,
    pub layout: LibraryLayout,
    pub default_version: String,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub max_age_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub dedupe_inflight: bool,
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

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Build(args)) => raw.apply_library_overrides(&args.library),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    library: RawLibrarySettings,
    http: RawHttpSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(max_age) = overrides.http_max_age_seconds {
            self.http.max_age_seconds = Some(max_age);
        }
        if let Some(max_entries) = overrides.cache_max_entries {
            self.cache.max_entries = Some(max_entries);
        }
        if let Some(dedupe) = overrides.cache_dedupe_inflight {
            self.cache.dedupe_inflight = Some(dedupe);
        }

        self.apply_library_overrides(&overrides.library);
    }

    fn apply_library_overrides(&mut self, overrides: &LibraryOverrides) {
        if let Some(directory) = overrides.versions_directory.as_ref() {
            self.library.versions_directory = Some(directory.clone());
        }
        if let Some(version) = overrides.default_version.as_ref() {
            self.library.default_version = Some(version.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            library,
            http,
            cache,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            library: build_library_settings(library)?,
            http: build_http_settings(http),
            cache: build_cache_settings(cache),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr =
        parse_socket_addr(&host, port).map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
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

fn build_library_settings(library: RawLibrarySettings) -> Result<LibrarySettings, LoadError> {
    let versions_directory = library
        .versions_directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_VERSIONS_DIRECTORY));
    if versions_directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "library.versions_directory",
            "path must not be empty",
        ));
    }

    let layout = LibraryLayout {
        header_directory: directory_name(
            library.header_directory,
            DEFAULT_HEADER_DIRECTORY,
            "library.header_directory",
        )?,
        module_directory: directory_name(
            library.module_directory,
            DEFAULT_MODULE_DIRECTORY,
            "library.module_directory",
        )?,
        preset_directory: directory_name(
            library.preset_directory,
            DEFAULT_PRESET_DIRECTORY,
            "library.preset_directory",
        )?,
    };

    let default_version = library
        .default_version
        .unwrap_or_else(|| DEFAULT_VERSION.to_string());
    validate_name(NameKind::Version, &default_version)
        .map_err(|err| LoadError::invalid("library.default_version", err.to_string()))?;

    Ok(LibrarySettings {
        versions_directory,
        layout,
        default_version,
    })
}

fn build_http_settings(http: RawHttpSettings) -> HttpSettings {
    HttpSettings {
        max_age_seconds: http.max_age_seconds.unwrap_or(DEFAULT_MAX_AGE_SECS),
    }
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    CacheSettings {
        max_entries: cache.max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
        dedupe_inflight: cache
            .dedupe_inflight
            .unwrap_or(DEFAULT_CACHE_DEDUPE_INFLIGHT),
    }
}

/// Directory inside a version; must be a single relative segment.
fn directory_name(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let name = value.unwrap_or_else(|| default.to_string());
    let trimmed = name.trim_matches('/');
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." || trimmed.contains('/') {
        return Err(LoadError::invalid(
            key,
            format!("`{name}` must be a single directory name"),
        ));
    }
    Ok(PathBuf::from(trimmed))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLibrarySettings {
    versions_directory: Option<PathBuf>,
    module_directory: Option<String>,
    header_directory: Option<String>,
    preset_directory: Option<String>,
    default_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHttpSettings {
    max_age_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    max_entries: Option<usize>,
    dedupe_inflight: Option<bool>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
