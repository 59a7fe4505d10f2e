use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the modjulie binary.
#[derive(Debug, Parser)]
#[command(name = "modjulie", version, about = "On-demand JavaScript library bundler")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MODJULIE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve library bundles over HTTP.
    Serve(Box<ServeArgs>),
    /// Build one bundle and write it to stdout.
    Build(BuildArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LibraryOverrides {
    /// Override the directory holding one subdirectory per library version.
    #[arg(long = "library-versions-directory", value_name = "PATH")]
    pub versions_directory: Option<PathBuf>,

    /// Override the version used when none is requested.
    #[arg(long = "library-default-version", value_name = "VERSION")]
    pub default_version: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub library: LibraryOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the `max-age` advertised in `cache-control`.
    #[arg(long = "http-max-age-seconds", value_name = "SECONDS")]
    pub http_max_age_seconds: Option<u64>,

    /// Override the build cache entry limit (0 keeps every entry).
    #[arg(long = "cache-max-entries", value_name = "COUNT")]
    pub cache_max_entries: Option<usize>,

    /// Share one resolution between concurrent identical builds.
    #[arg(
        long = "cache-dedupe-inflight",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_dedupe_inflight: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub library: LibraryOverrides,

    /// Library version to build; defaults to the configured default version.
    #[arg(value_name = "VERSION")]
    pub version: Option<String>,

    /// Preset whose modules are included first.
    #[arg(long, value_name = "PRESET")]
    pub preset: Option<String>,

    /// Comma-separated extra modules.
    #[arg(long, value_name = "MODULES", value_delimiter = ',')]
    pub modules: Vec<String>,
}
