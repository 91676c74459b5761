// # File Store
//
// Store implementation backed by one JSON file.
//
// Rate-limit rows and cache rows outlive the process, so a later run still
// honours a provider backoff and reuses fresh answers.
//
// ## Durability
//
// - Every mutation rewrites the file: temp file, fsync, rename over the original
// - The file being replaced is copied to `<path>.backup` first
// - A file that fails to parse is replaced by its backup on open
// - If the backup is unreadable too, the store opens empty
//
// ## Layout
//
// ```json
// {
//   "version": "1.0",
//   "rate_limits": {
//     "registry.npmjs.org": {
//       "endpoint": "registry.npmjs.org",
//       "request_count": 3,
//       "window_start": "2025-01-09T12:00:00Z",
//       "backoff_until": null,
//       "last_429_at": null
//     }
//   },
//   "check_cache": [
//     {
//       "name": "acme.io", "check_type": "domain", "tld": "io",
//       "available": "taken", "status_code": 200, "extra_data": "{}",
//       "message": "", "checked_at": "...", "expires_at": "..."
//     }
//   ]
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

use crate::Error;
use crate::state::memory::{CacheKey, cache_key};
use crate::traits::store::{CacheEntry, RateLimitState, Store};
use crate::types::CheckType;

/// Layout version written to every file
const FORMAT_VERSION: &str = "1.0";

/// JSON-file store
///
/// Reads are served from memory; every write goes to disk before it returns.
///
/// # Example
///
/// ```rust,no_run
/// use namecheck_core::state::FileStore;
/// use namecheck_core::traits::{RateLimitState, Store};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStore::new("/var/lib/namecheck/state.json").await?;
///     let state = RateLimitState::new("api.github.com", chrono::Utc::now());
///
///     store.update_rate_limit("api.github.com", &state).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    tables: Arc<RwLock<Tables>>,
    /// One writer at a time, so temp files never interleave
    write_lock: Mutex<()>,
}

#[derive(Debug, Default)]
struct Tables {
    rate_limits: HashMap<String, RateLimitState>,
    check_cache: HashMap<CacheKey, CacheEntry>,
    dirty: bool,
}

/// On-disk layout
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Snapshot {
    version: String,
    #[serde(default)]
    rate_limits: HashMap<String, RateLimitState>,
    #[serde(default)]
    check_cache: Vec<CacheEntry>,
}

impl From<Snapshot> for Tables {
    fn from(snapshot: Snapshot) -> Self {
        Tables {
            rate_limits: snapshot.rate_limits,
            check_cache: snapshot
                .check_cache
                .into_iter()
                .map(|entry| (cache_key(&entry), entry))
                .collect(),
            dirty: false,
        }
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::store(format!("Failed to {} {}: {}", action, path.display(), e))
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut sibling = path.to_path_buf();
    sibling.set_extension(extension);
    sibling
}

impl FileStore {
    /// Open the store at `path`, creating parent directories as needed
    ///
    /// A missing file opens empty. A corrupt file is recovered from its
    /// backup when possible.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir).await.map_err(|e| {
                Error::config(format!(
                    "Cannot create directory {} for the state file: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let tables = Self::open_tables(&path).await?;

        Ok(Self {
            path,
            tables: Arc::new(RwLock::new(tables)),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the main file, falling back to the backup on a parse error
    ///
    /// Read errors other than parsing are returned as they are.
    async fn open_tables(path: &Path) -> Result<Tables, Error> {
        let parse_err = match Self::read_snapshot(path).await {
            Ok(tables) => {
                tracing::debug!(
                    "Opened {}: {} rate-limit rows, {} cache rows",
                    path.display(),
                    tables.rate_limits.len(),
                    tables.check_cache.len()
                );
                return Ok(tables);
            }
            Err(e @ Error::Json(_)) => e,
            Err(e) => return Err(e),
        };

        let backup = Self::backup_path(path);
        tracing::warn!(
            "{} is unreadable ({}), trying {}",
            path.display(),
            parse_err,
            backup.display()
        );

        if !backup.exists() {
            tracing::warn!("No backup to recover from, opening an empty store");
            return Ok(Tables::default());
        }

        match Self::read_snapshot(&backup).await {
            Ok(tables) => {
                tracing::info!(
                    "Recovered {} rate-limit rows and {} cache rows from backup",
                    tables.rate_limits.len(),
                    tables.check_cache.len()
                );
                if let Err(e) = fs::copy(&backup, path).await {
                    tracing::error!("Could not put the backup back in place: {}", e);
                }
                Ok(tables)
            }
            Err(e) => {
                tracing::error!("Backup is unreadable too ({}), opening an empty store", e);
                Ok(Tables::default())
            }
        }
    }

    async fn read_snapshot(path: &Path) -> Result<Tables, Error> {
        if !path.exists() {
            tracing::debug!("No state file at {} yet", path.display());
            return Ok(Tables::default());
        }

        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| io_error("read", path, e))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;

        if snapshot.version != FORMAT_VERSION {
            tracing::warn!(
                "{} has layout version {}, expected {}; reading it anyway",
                path.display(),
                snapshot.version,
                FORMAT_VERSION
            );
        }

        Ok(snapshot.into())
    }

    /// Serialize the tables and swap them in over the current file
    async fn persist(&self) -> Result<(), Error> {
        let _writer = self.write_lock.lock().await;

        let json = {
            let tables = self.tables.read().await;
            let mut check_cache: Vec<CacheEntry> = tables.check_cache.values().cloned().collect();
            check_cache.sort_by(|a, b| {
                (a.check_type, &a.name, &a.tld).cmp(&(b.check_type, &b.name, &b.tld))
            });

            serde_json::to_string_pretty(&Snapshot {
                version: FORMAT_VERSION.to_string(),
                rate_limits: tables.rate_limits.clone(),
                check_cache,
            })
            .map_err(|e| Error::store(format!("Cannot serialize state: {}", e)))?
        };

        let tmp = sibling(&self.path, "tmp");
        let mut file = fs::File::create(&tmp)
            .await
            .map_err(|e| io_error("create", &tmp, e))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(|e| io_error("write", &tmp, e))?;
        file.sync_all()
            .await
            .map_err(|e| io_error("sync", &tmp, e))?;
        drop(file);

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("Skipping backup of {}: {}", self.path.display(), e);
        }

        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error("replace state file with", &tmp, e))?;

        self.tables.write().await.dirty = false;
        tracing::trace!("Persisted {}", self.path.display());
        Ok(())
    }

    fn backup_path(path: &Path) -> PathBuf {
        sibling(path, "backup")
    }

    /// Change the tables, then persist
    async fn mutate<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T, Error> {
        let out = {
            let mut tables = self.tables.write().await;
            tables.dirty = true;
            f(&mut tables)
        };

        self.persist().await?;
        Ok(out)
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get_rate_limit(&self, endpoint: &str) -> Result<Option<RateLimitState>, Error> {
        let tables = self.tables.read().await;
        Ok(tables.rate_limits.get(endpoint).cloned())
    }

    async fn update_rate_limit(&self, endpoint: &str, state: &RateLimitState) -> Result<(), Error> {
        let state = state.clone();
        self.mutate(|s| {
            s.rate_limits.insert(endpoint.to_string(), state);
        })
        .await
    }

    async fn list_rate_limits(&self, prefix: &str) -> Result<Vec<RateLimitState>, Error> {
        let tables = self.tables.read().await;
        let mut rows: Vec<RateLimitState> = tables
            .rate_limits
            .values()
            .filter(|state| state.endpoint.starts_with(prefix))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        Ok(rows)
    }

    async fn delete_rate_limit(&self, endpoint: &str) -> Result<bool, Error> {
        self.mutate(|s| s.rate_limits.remove(endpoint).is_some())
            .await
    }

    async fn delete_rate_limits(&self, prefix: &str) -> Result<usize, Error> {
        self.mutate(|s| {
            let before = s.rate_limits.len();
            s.rate_limits
                .retain(|endpoint, _| !endpoint.starts_with(prefix));
            before - s.rate_limits.len()
        })
        .await
    }

    async fn get_cache_entry(
        &self,
        name: &str,
        check_type: CheckType,
        tld: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, Error> {
        let tables = self.tables.read().await;
        let key = (name.to_string(), check_type, tld.to_string());
        Ok(tables
            .check_cache
            .get(&key)
            .filter(|entry| entry.is_live(now))
            .cloned())
    }

    async fn upsert_cache_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.mutate(|s| {
            s.check_cache.insert(cache_key(&entry), entry);
        })
        .await
    }

    async fn purge_expired_cache(&self, now: DateTime<Utc>) -> Result<usize, Error> {
        self.mutate(|s| {
            let before = s.check_cache.len();
            s.check_cache.retain(|_, entry| entry.is_live(now));
            before - s.check_cache.len()
        })
        .await
    }

    async fn flush(&self) -> Result<(), Error> {
        let dirty = self.tables.read().await.dirty;
        if dirty {
            self.persist().await
        } else {
            Ok(())
        }
    }
}
