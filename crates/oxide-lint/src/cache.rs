//! Persistent verdict cache.
//!
//! A store maps a [`CacheKey`] (migration identity, content fingerprint,
//! dialect and analysis-context fingerprint) to the verdict computed for it.
//! Stores are JSON files, one per analysis scope:
//!
//! ```json
//! {
//!   "version": 1,
//!   "store": "shop_postgres",
//!   "saved_at": "2026-10-17T09:12:44Z",
//!   "entries": [
//!     { "key": { "app": "users", "name": "0001_initial", "fingerprint": "…",
//!                "dialect": "postgres", "policy": "…" },
//!       "result": "ERR",
//!       "errors": [ { "message": "DROPPING columns", "code": "DROP_COLUMN",
//!                     "table": "users", "column": "email" } ] }
//!   ]
//! }
//! ```
//!
//! Reading never fails: a missing, corrupt or foreign-version file is an empty
//! store. Writing replaces the file atomically.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::analyzer::Verdict;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::migration::MigrationId;
use crate::rules::Diagnostic;

/// Format version written to and expected from store files.
pub const CACHE_VERSION: u32 = 1;

/// Everything a cached verdict depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    /// Owning app.
    pub app: String,
    /// Migration name.
    pub name: String,
    /// Fingerprint of the migration's serialized source.
    pub fingerprint: Fingerprint,
    /// Target dialect.
    pub dialect: Dialect,
    /// Fingerprint of the analysis context (matching ignore rules, catalog).
    pub policy: Fingerprint,
}

impl CacheKey {
    /// Creates a key.
    #[must_use]
    pub fn new(
        id: &MigrationId,
        fingerprint: Fingerprint,
        dialect: Dialect,
        policy: Fingerprint,
    ) -> Self {
        Self {
            app: id.app.clone(),
            name: id.name.clone(),
            fingerprint,
            dialect,
            policy,
        }
    }
}

/// A stored verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The key the verdict was computed for.
    pub key: CacheKey,
    /// The verdict.
    pub result: Verdict,
    /// Diagnostics; empty unless `result` is `ERR`.
    #[serde(default)]
    pub errors: Vec<Diagnostic>,
}

impl CacheEntry {
    /// Creates an entry.
    #[must_use]
    pub const fn new(key: CacheKey, result: Verdict, errors: Vec<Diagnostic>) -> Self {
        Self {
            key,
            result,
            errors,
        }
    }
}

#[derive(Serialize)]
struct StoreFileRef<'a> {
    version: u32,
    store: &'a str,
    saved_at: DateTime<Utc>,
    entries: Vec<&'a CacheEntry>,
}

#[derive(Deserialize)]
struct StoreHeader {
    version: u32,
}

#[derive(Deserialize)]
struct StoreFile {
    #[serde(default)]
    entries: Vec<CacheEntry>,
}

/// Returns the default store name for a scope and dialect.
///
/// Characters that are unsafe in file names become `_`.
#[must_use]
pub fn store_name(scope: &str, dialect: Dialect) -> String {
    let scope: String = scope
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{dialect}", scope.trim_matches('_'))
}

/// A file-backed cache store.
#[derive(Debug)]
pub struct CacheStore {
    name: String,
    path: PathBuf,
    entries: BTreeMap<CacheKey, CacheEntry>,
    loaded: bool,
}

impl CacheStore {
    /// Opens the store `name` in `dir` without reading it.
    ///
    /// The file is read on first access.
    #[must_use]
    pub fn open(dir: impl AsRef<Path>, name: impl Into<String>) -> Self {
        let name = name.into();
        let path = dir.as_ref().join(format!("{name}.json"));
        Self {
            name,
            path,
            entries: BTreeMap::new(),
            loaded: false,
        }
    }

    /// Opens and reads the store `name` in `dir`.
    #[must_use]
    pub fn load(dir: impl AsRef<Path>, name: impl Into<String>) -> Self {
        let mut store = Self::open(dir, name);
        store.ensure_loaded();
        store
    }

    /// Returns the store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_loaded(&mut self) {
        if !self.loaded {
            self.entries = read_entries(&self.path);
            self.loaded = true;
        }
    }

    /// Looks up the verdict stored for `key`.
    pub fn get(&mut self, key: &CacheKey) -> Option<&CacheEntry> {
        self.ensure_loaded();
        self.entries.get(key)
    }

    /// Stores `entry`, replacing any entry with the same key.
    pub fn put(&mut self, entry: CacheEntry) {
        self.ensure_loaded();
        self.entries.insert(entry.key.clone(), entry);
    }

    /// Drops every entry for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&CacheEntry) -> bool) {
        self.ensure_loaded();
        self.entries.retain(|_, entry| keep(entry));
    }

    /// Empties the store in memory. The file changes on the next [`save`].
    ///
    /// [`save`]: Self::save
    pub fn clear(&mut self) {
        self.entries.clear();
        self.loaded = true;
    }

    /// Returns the number of entries.
    pub fn len(&mut self) -> usize {
        self.ensure_loaded();
        self.entries.len()
    }

    /// Returns true if the store has no entries.
    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Returns the entries in key order.
    pub fn entries(&mut self) -> impl Iterator<Item = &CacheEntry> {
        self.ensure_loaded();
        self.entries.values()
    }

    /// Writes the store, replacing the file atomically.
    ///
    /// Creates the directory if needed.
    pub fn save(&mut self) -> Result<()> {
        self.ensure_loaded();

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let file = StoreFileRef {
            version: CACHE_VERSION,
            store: &self.name,
            saved_at: Utc::now(),
            entries: self.entries.values().collect(),
        };

        let temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, &file)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        debug!(
            store = %self.name,
            entries = self.entries.len(),
            path = %self.path.display(),
            "Saved cache"
        );
        Ok(())
    }
}

/// Reads store entries, decaying to empty on any problem.
fn read_entries(path: &Path) -> BTreeMap<CacheKey, CacheEntry> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No cache file yet");
            return BTreeMap::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read cache, starting empty");
            return BTreeMap::new();
        }
    };

    let header: StoreHeader = match serde_json::from_slice(&raw) {
        Ok(header) => header,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt cache, starting empty");
            return BTreeMap::new();
        }
    };
    if header.version != CACHE_VERSION {
        warn!(
            path = %path.display(),
            found = header.version,
            expected = CACHE_VERSION,
            "Cache version mismatch, starting empty"
        );
        return BTreeMap::new();
    }

    match serde_json::from_slice::<StoreFile>(&raw) {
        Ok(file) => file
            .entries
            .into_iter()
            .map(|entry| (entry.key.clone(), entry))
            .collect(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt cache, starting empty");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LintError;
    use crate::fingerprint::of_source;
    use crate::rules::IssueCode;

    fn key(name: &str, dialect: Dialect) -> CacheKey {
        CacheKey::new(
            &MigrationId::new("users", name),
            of_source(name.as_bytes()),
            dialect,
            of_source(b"[]"),
        )
    }

    fn err_entry(name: &str) -> CacheEntry {
        CacheEntry::new(
            key(name, Dialect::Postgres),
            Verdict::Err,
            vec![Diagnostic::new(IssueCode::NotNull, Some("users"), Some("age"))],
        )
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::load(dir.path(), "shop_postgres");
        assert!(store.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), "shop_postgres");
        store.put(err_entry("0001"));
        store.put(CacheEntry::new(
            key("0002", Dialect::Postgres),
            Verdict::Ok,
            Vec::new(),
        ));
        store.save().unwrap();

        let mut reloaded = CacheStore::load(dir.path(), "shop_postgres");
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.get(&key("0001", Dialect::Postgres)),
            Some(&err_entry("0001"))
        );
        assert!(reloaded.get(&key("0001", Dialect::Sqlite)).is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), "s");
        store.put(err_entry("0001"));
        store.put(CacheEntry::new(
            key("0001", Dialect::Postgres),
            Verdict::Ignore,
            Vec::new(),
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(&key("0001", Dialect::Postgres)).unwrap().result,
            Verdict::Ignore
        );
    }

    #[test]
    fn test_save_creates_directory_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut store = CacheStore::open(&nested, "s");
        store.put(err_entry("0001"));
        store.save().unwrap();

        let files: Vec<_> = fs::read_dir(&nested).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert!(nested.join("s.json").exists());
    }

    #[test]
    fn test_save_into_file_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("cache");
        fs::write(&blocker, "").unwrap();

        let mut store = CacheStore::open(&blocker, "s");
        store.put(err_entry("0001"));
        assert!(matches!(store.save(), Err(LintError::Io(_))));
        assert_eq!(fs::read(&blocker).unwrap(), b"");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_save_keeps_previous_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), "s");
        store.put(err_entry("0001"));
        store.save().unwrap();
        let path = dir.path().join("s.json");
        let before = fs::read(&path).unwrap();

        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();
        store.put(CacheEntry::new(
            key("0002", Dialect::Postgres),
            Verdict::Ok,
            Vec::new(),
        ));
        let result = store.save();
        let writable = fs::write(dir.path().join("canary"), "").is_ok();
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

        // Read-only directories do not stop privileged users.
        if writable {
            return;
        }
        assert!(matches!(result, Err(LintError::Io(_))));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("s.json"), "{ not json").unwrap();
        assert!(CacheStore::load(dir.path(), "s").is_empty());
    }

    #[test]
    fn test_version_mismatch_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), "s");
        store.put(err_entry("0001"));
        store.save().unwrap();

        let path = dir.path().join("s.json");
        let raw = fs::read_to_string(&path).unwrap();
        fs::write(&path, raw.replace("\"version\": 1", "\"version\": 99")).unwrap();

        assert!(CacheStore::load(dir.path(), "s").is_empty());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), "s");
        store.put(err_entry("0001"));
        store.save().unwrap();

        let path = dir.path().join("s.json");
        let mut json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        json["generator"] = serde_json::json!("someone else");
        json["entries"][0]["note"] = serde_json::json!(42);
        fs::write(&path, json.to_string()).unwrap();

        assert_eq!(CacheStore::load(dir.path(), "s").len(), 1);
    }

    #[test]
    fn test_clear_only_hits_disk_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), "s");
        store.put(err_entry("0001"));
        store.save().unwrap();

        let mut cleared = CacheStore::open(dir.path(), "s");
        cleared.clear();
        assert!(cleared.is_empty());
        assert_eq!(CacheStore::load(dir.path(), "s").len(), 1);

        cleared.save().unwrap();
        assert!(CacheStore::load(dir.path(), "s").is_empty());
    }

    #[test]
    fn test_retain() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path(), "s");
        store.put(err_entry("0001"));
        store.put(CacheEntry::new(
            key("0002", Dialect::Sqlite),
            Verdict::Ok,
            Vec::new(),
        ));

        store.retain(|entry| entry.key.dialect == Dialect::Sqlite);
        let names: Vec<_> = store.entries().map(|e| e.key.name.clone()).collect();
        assert_eq!(names, vec!["0002"]);
    }

    #[test]
    fn test_store_name() {
        assert_eq!(
            store_name("/srv/shop/migrations", Dialect::Postgres),
            "srv_shop_migrations_postgres"
        );
        assert_eq!(store_name("shop", Dialect::Sqlite), "shop_sqlite");
    }
}
