use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the sitesync binary.
#[derive(Debug, Parser)]
#[command(
    name = "sitesync",
    version,
    about = "CMS to static site content pipeline"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SITESYNC_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the webhook and status HTTP service.
    Serve(Box<ServeArgs>),
    /// Run a single site build and exit.
    Build(BuildArgs),
    /// Fetch one record type from the CMS and print it as JSON.
    Fetch(FetchArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub site: SiteOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the delay before a coalesced follow-up build starts.
    #[arg(long = "rebuild-coalesce-delay-ms", value_name = "MILLIS")]
    pub rebuild_coalesce_delay_ms: Option<u64>,

    /// Run one build as soon as the server starts.
    #[arg(
        long = "rebuild-on-start",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub rebuild_on_start: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub site: SiteOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// Record type to fetch.
    #[arg(value_enum)]
    pub kind: FetchKind,

    /// Pretty-print the JSON output.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub pretty: bool,

    #[command(flatten)]
    pub logging: LoggingOverrides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetchKind {
    Posts,
    Services,
    Testimonials,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SiteOverrides {
    /// Override the directory holding the published site.
    #[arg(long = "site-root", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub site_root: Option<PathBuf>,

    /// Override the public site URL used in canonical links.
    #[arg(long = "site-url", value_name = "URL")]
    pub site_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
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
}
