//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::{
    fetcher::ContentDatabases,
    seo::{FaqEntry, SiteProfile},
};
use crate::rebuild::DEFAULT_COALESCE_DELAY;

mod cli;

pub use cli::{
    BuildArgs, CliArgs, Command, FetchArgs, FetchKind, LoggingOverrides, ServeArgs,
    ServeOverrides, SiteOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "sitesync";
const ENV_PREFIX: &str = "SITESYNC";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_NOTION_API_BASE_URL: &str = "https://api.notion.com/v1/";
const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_NOTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SITE_ROOT: &str = ".";
const DEFAULT_SITE_NAME: &str = "sitesync";
const DEFAULT_SITE_URL: &str = "http://localhost:8000";
const DEFAULT_SITE_IMAGE: &str = "/images/Hero-Image.png";

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub notion: NotionSettings,
    pub site: SiteSettings,
    pub rebuild: RebuildSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
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

#[derive(Clone)]
pub struct NotionSettings {
    /// Integration token. Only required by commands that talk to the CMS.
    pub api_key: Option<String>,
    pub api_base_url: Url,
    pub version: String,
    pub request_timeout: Duration,
    pub databases: ContentDatabases,
}

impl std::fmt::Debug for NotionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url.as_str())
            .field("version", &self.version)
            .field("request_timeout", &self.request_timeout)
            .field("databases", &self.databases)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub root: PathBuf,
    pub profile: SiteProfile,
}

#[derive(Clone)]
pub struct RebuildSettings {
    pub coalesce_delay: Duration,
    /// Shared secret for signed webhooks; unsigned webhooks are accepted
    /// when unset.
    pub webhook_secret: Option<String>,
    pub on_start: bool,
}

impl std::fmt::Debug for RebuildSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildSettings")
            .field("coalesce_delay", &self.coalesce_delay)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("on_start", &self.on_start)
            .finish()
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

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Build(args)) => {
            raw.apply_site_overrides(&args.site);
            raw.apply_logging_overrides(&args.logging);
        }
        Some(Command::Fetch(args)) => raw.apply_logging_overrides(&args.logging),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    notion: RawNotionSettings,
    site: RawSiteSettings,
    rebuild: RawRebuildSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(delay) = overrides.rebuild_coalesce_delay_ms {
            self.rebuild.coalesce_delay_ms = Some(delay);
        }
        if let Some(on_start) = overrides.rebuild_on_start {
            self.rebuild.on_start = Some(on_start);
        }

        self.apply_site_overrides(&overrides.site);
        self.apply_logging_overrides(&overrides.logging);
    }

    fn apply_site_overrides(&mut self, overrides: &SiteOverrides) {
        if let Some(root) = overrides.site_root.as_ref() {
            self.site.root = Some(root.clone());
        }
        if let Some(url) = overrides.site_url.as_ref() {
            self.site.url = Some(url.clone());
        }
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            notion,
            site,
            rebuild,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let notion = build_notion_settings(notion)?;
        let site = build_site_settings(site)?;
        let rebuild = build_rebuild_settings(rebuild)?;

        Ok(Self {
            server,
            logging,
            notion,
            site,
            rebuild,
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

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
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

fn build_notion_settings(notion: RawNotionSettings) -> Result<NotionSettings, LoadError> {
    let raw_base = notion
        .api_base_url
        .unwrap_or_else(|| DEFAULT_NOTION_API_BASE_URL.to_string());
    // Relative joins drop the last path segment unless the base ends in `/`.
    let normalised = if raw_base.ends_with('/') {
        raw_base
    } else {
        format!("{raw_base}/")
    };
    let api_base_url = Url::parse(&normalised)
        .map_err(|err| LoadError::invalid("notion.api_base_url", err.to_string()))?;

    let timeout_secs = notion
        .request_timeout_seconds
        .unwrap_or(DEFAULT_NOTION_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "notion.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    let databases = ContentDatabases {
        blogs: notion.databases.blogs.unwrap_or_default(),
        services: notion.databases.services.unwrap_or_default(),
        testimonials: notion.databases.testimonials.unwrap_or_default(),
        contact: notion.databases.contact.unwrap_or_default(),
    };

    Ok(NotionSettings {
        api_key: non_empty(notion.api_key),
        api_base_url,
        version: non_empty(notion.version).unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
        request_timeout: Duration::from_secs(timeout_secs),
        databases,
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let root = site
        .root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SITE_ROOT));

    let url = non_empty(site.url).unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
    Url::parse(&url).map_err(|err| LoadError::invalid("site.url", err.to_string()))?;

    let faq = site
        .faq
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            match (non_empty(entry.question), non_empty(entry.answer)) {
                (Some(question), Some(answer)) => Ok(FaqEntry { question, answer }),
                _ => Err(LoadError::invalid(
                    "site.faq",
                    format!("entry {index} needs both a question and an answer"),
                )),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SiteSettings {
        root,
        profile: SiteProfile {
            site_name: non_empty(site.name).unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
            site_url: url,
            description: site.description.unwrap_or_default(),
            keywords: split_keywords(site.keywords),
            default_image: non_empty(site.default_image)
                .unwrap_or_else(|| DEFAULT_SITE_IMAGE.to_string()),
            business_type: non_empty(site.business_type).unwrap_or_default(),
            telephone: non_empty(site.telephone),
            home_title: non_empty(site.home.title),
            home_description: non_empty(site.home.description),
            home_keywords: split_keywords(site.home.keywords),
            faq,
        },
    })
}

fn split_keywords(keywords: Option<String>) -> Vec<String> {
    keywords
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .map(str::to_string)
        .collect()
}

fn build_rebuild_settings(rebuild: RawRebuildSettings) -> Result<RebuildSettings, LoadError> {
    let coalesce_delay = rebuild
        .coalesce_delay_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_COALESCE_DELAY);

    Ok(RebuildSettings {
        coalesce_delay,
        webhook_secret: non_empty(rebuild.webhook_secret),
        on_start: rebuild.on_start.unwrap_or(false),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawNotionSettings {
    api_key: Option<String>,
    api_base_url: Option<String>,
    version: Option<String>,
    request_timeout_seconds: Option<u64>,
    databases: RawDatabaseIds,
}

impl std::fmt::Debug for RawNotionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawNotionSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("version", &self.version)
            .field("databases", &self.databases)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseIds {
    blogs: Option<String>,
    services: Option<String>,
    testimonials: Option<String>,
    contact: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    root: Option<PathBuf>,
    name: Option<String>,
    url: Option<String>,
    description: Option<String>,
    /// Comma-separated.
    keywords: Option<String>,
    default_image: Option<String>,
    business_type: Option<String>,
    telephone: Option<String>,
    home: RawHomeSettings,
    faq: Vec<RawFaqEntry>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHomeSettings {
    title: Option<String>,
    description: Option<String>,
    /// Comma-separated, added to the site keywords.
    keywords: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFaqEntry {
    question: Option<String>,
    answer: Option<String>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawRebuildSettings {
    coalesce_delay_ms: Option<u64>,
    webhook_secret: Option<String>,
    on_start: Option<bool>,
}

impl std::fmt::Debug for RawRebuildSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawRebuildSettings")
            .field("coalesce_delay_ms", &self.coalesce_delay_ms)
            .field("on_start", &self.on_start)
            .finish_non_exhaustive()
    }
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
