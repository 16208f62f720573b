//! Rule Config Cache
//!
//! Registry rule configs are fetched once and stored under the cache
//! directory. A cached file is reused as long as it exists, so repeated
//! runs and concurrent corpuses sharing a config hit the network once.

use reqwest::blocking::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a rule config could not be cached
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request ran past its deadline; the config is skipped
    #[error("Timed out fetching rule config '{id}'")]
    Timeout {
        /// Config identifier
        id: String,
    },

    /// Any other transport or HTTP status failure
    #[error("Failed to fetch rule config '{id}': {message}")]
    Http {
        /// Config identifier, empty when the client itself failed
        id: String,
        /// Transport or status error
        message: String,
    },

    /// Writing the cache file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of rule-config bodies
pub trait RuleFetcher: Sync {
    /// Fetch the config named `id`
    fn fetch(&self, id: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches `GET {base_url}/{id}` over HTTP
pub struct HttpRuleFetcher {
    base_url: String,
    client: Client,
}

impl HttpRuleFetcher {
    /// Create a fetcher for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http {
                id: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// URL a config identifier resolves to
    pub fn url_for(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }
}

impl RuleFetcher for HttpRuleFetcher {
    fn fetch(&self, id: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(id);
        debug!(%url, "fetching rule config");

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout { id: id.to_string() }
            } else {
                FetchError::Http {
                    id: id.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let body = self
            .client
            .get(&url)
            .send()
            .map_err(map_err)?
            .error_for_status()
            .map_err(map_err)?
            .bytes()
            .map_err(map_err)?;
        Ok(body.to_vec())
    }
}

/// Cache file name for a config identifier
///
/// Path separators become `_` so every identifier maps to one flat file.
pub fn cache_file_name(id: &str) -> String {
    format!("{}.yaml", id.replace(['/', '\\'], "_"))
}

/// On-disk cache of fetched rule configs
#[derive(Debug, Clone)]
pub struct RuleCache {
    dir: PathBuf,
}

impl RuleCache {
    /// Cache rooted at `dir`; created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the config `id` is (or would be) cached
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(cache_file_name(id))
    }

    /// Make every config in `ids` available locally.
    ///
    /// Returns the local paths of the configs that are available. A config
    /// whose fetch times out is skipped with a warning; other failures abort.
    pub fn populate(
        &self,
        ids: &[String],
        fetcher: &dyn RuleFetcher,
    ) -> Result<Vec<PathBuf>, FetchError> {
        let mut paths = Vec::with_capacity(ids.len());
        for id in ids {
            let path = self.path_for(id);
            if path.exists() {
                debug!(%id, path = %path.display(), "rule config cached");
                paths.push(path);
                continue;
            }

            match fetcher.fetch(id) {
                Ok(body) => {
                    write_atomic(&path, &body)?;
                    info!(%id, path = %path.display(), "fetched rule config");
                    paths.push(path);
                }
                Err(FetchError::Timeout { id }) => {
                    warn!(%id, "timed out fetching rule config, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(paths)
    }
}

/// Write through a uniquely named sibling and rename into place.
///
/// Readers only ever see complete files, and concurrent writers of the same
/// config all produce the same content.
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::other("cache path has no parent directory"))?;
    std::fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(
        ".{}.{}.{:?}.tmp",
        file_name,
        std::process::id(),
        std::thread::current().id()
    ));

    std::fs::write(&tmp, contents)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
