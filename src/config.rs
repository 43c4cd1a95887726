//! Typed, read-only settings lookup (component A — Configuration Provider).
//!
//! Collaborators receive `&Settings` (or a narrower sub-struct) at
//! construction; none of them read the environment or the filesystem
//! directly. `Settings::load_from_file` is the one place a real YAML
//! document is parsed; every other constructor in this crate is happy
//! with `Settings::default()`.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// `crawler.*` — politeness and BFS bounds for the Crawler (§4.E).
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlerSettings {
    pub user_agent: String,
    pub max_depth: usize,
    pub max_pages: usize,
    pub request_delay_secs: u64,
    /// Bounded worker pool size across start URLs (§5 ambient addition).
    pub max_concurrent_crawls: usize,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            user_agent: "DocumentationHarvesterBot/1.0".to_string(),
            max_depth: 1,
            max_pages: 10,
            request_delay_secs: 1,
            max_concurrent_crawls: 8,
        }
    }
}

/// `database.*` — persistence location for the Store (§4.F).
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSettings {
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "documentation.db".to_string(),
        }
    }
}

/// `packages.*` — the Package Source Adapter's enumeration parameters (§4.K).
#[derive(Debug, Clone, PartialEq)]
pub struct PackagesSettings {
    pub source: String,
    pub top_packages_url: Option<String>,
    pub top_n: usize,
}

impl Default for PackagesSettings {
    fn default() -> Self {
        Self {
            source: "pypi".to_string(),
            top_packages_url: None,
            top_n: 20,
        }
    }
}

/// `scheduler.*` — the re-run cadence consumed by `Orchestrator::run_forever`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub interval_minutes: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
        }
    }
}

/// `logging.*` — passed to the `tracing` subscriber setup (§10.2).
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "full".to_string(),
        }
    }
}

/// The fully-resolved configuration value threaded through the Orchestrator
/// and its collaborators. Every field carries the default from §6 unless a
/// loaded YAML document overrides it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Settings {
    pub crawler: CrawlerSettings,
    pub database: DatabaseSettings,
    pub packages: PackagesSettings,
    pub scheduler: SchedulerSettings,
    pub logging: LoggingSettings,
}

// --- Partial mirror structs for YAML deserialization -----------------------
//
// The original source reads config as a loosely-typed dict-with-default
// lookup (`config.get('crawler', {}).get('max_depth', 1)`). We keep that
// "every field optional, missing means default" behavior but make it typed:
// deserialize into an all-`Option` mirror, then merge each present field
// over `Settings::default()`.

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawCrawler {
    user_agent: Option<String>,
    max_depth: Option<usize>,
    max_pages: Option<usize>,
    request_delay: Option<u64>,
    max_concurrent_crawls: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawDatabase {
    path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawPackages {
    source: Option<String>,
    top_packages_url: Option<String>,
    top_n: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawScheduler {
    interval_minutes: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawLogging {
    level: Option<String>,
    format: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    crawler: RawCrawler,
    database: RawDatabase,
    packages: RawPackages,
    scheduler: RawScheduler,
    logging: RawLogging,
}

impl Settings {
    /// Load and merge a YAML document over the defaults.
    ///
    /// A missing file or unparseable YAML is a [`ConfigError`] — per §7
    /// this is fatal at startup.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents, path)
    }

    fn from_yaml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawSettings =
            serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::merge_defaults(raw))
    }

    fn merge_defaults(raw: RawSettings) -> Self {
        let defaults = Settings::default();
        Settings {
            crawler: CrawlerSettings {
                user_agent: raw.crawler.user_agent.unwrap_or(defaults.crawler.user_agent),
                max_depth: raw.crawler.max_depth.unwrap_or(defaults.crawler.max_depth),
                max_pages: raw.crawler.max_pages.unwrap_or(defaults.crawler.max_pages),
                request_delay_secs: raw
                    .crawler
                    .request_delay
                    .unwrap_or(defaults.crawler.request_delay_secs),
                max_concurrent_crawls: raw
                    .crawler
                    .max_concurrent_crawls
                    .unwrap_or(defaults.crawler.max_concurrent_crawls),
            },
            database: DatabaseSettings {
                path: raw.database.path.unwrap_or(defaults.database.path),
            },
            packages: PackagesSettings {
                source: raw.packages.source.unwrap_or(defaults.packages.source),
                top_packages_url: raw.packages.top_packages_url.or(defaults.packages.top_packages_url),
                top_n: raw.packages.top_n.unwrap_or(defaults.packages.top_n),
            },
            scheduler: SchedulerSettings {
                interval_minutes: raw
                    .scheduler
                    .interval_minutes
                    .unwrap_or(defaults.scheduler.interval_minutes),
            },
            logging: LoggingSettings {
                level: raw.logging.level.unwrap_or(defaults.logging.level),
                format: raw.logging.format.unwrap_or(defaults.logging.format),
            },
        }
    }
}
