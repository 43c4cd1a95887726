use std::path::PathBuf;

/// Failures loading or validating a [`crate::config::Settings`] value.
///
/// Configuration errors are fatal at startup (binary exits with code `1`);
/// nothing below the orchestrator ever constructs one at runtime.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path} as YAML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing required key '{0}'")]
    MissingKey(&'static str),
}

/// Failures performing a single HTTP fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("non-200 status {status} fetching {url}")]
    BadStatus { url: String, status: u16 },
}

/// Failures consulting robots.txt for a host. These never stop a crawl —
/// the robots gate defaults to "allowed" and logs a warning (see §4.B / §7).
#[derive(Debug, thiserror::Error)]
pub enum RobotsError {
    #[error("could not fetch robots.txt from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("robots.txt url {0} has no host")]
    NoHost(String),
}

/// Failures in the persistence layer. Per §7 these are fatal for the
/// enclosing harvest cycle and are surfaced to the caller rather than
/// caught-and-continued like every other component's errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("gzip compression failed: {0}")]
    Compress(#[source] std::io::Error),

    #[error("gzip decompression failed for page_version {page_version_id}: {source}")]
    Decompress {
        page_version_id: i64,
        #[source]
        source: std::io::Error,
    },

    #[error("stored bytes for page_version {page_version_id} are not valid UTF-8: {source}")]
    InvalidUtf8 {
        page_version_id: i64,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("the Store's writer thread panicked or was dropped")]
    WorkerGone,
}
