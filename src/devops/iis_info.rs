use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::environment::EnvironmentType;
use crate::error::Result;

/// How long a parsed file is served from memory.
pub const IIS_INFO_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CachedInfo {
    loaded_at: Instant,
    modified: Option<SystemTime>,
    info: Option<Value>,
}

/// Reader for the `IISInfo_<env>.json` files dropped next to the tool by the
/// deployment agents.
///
/// Parsed documents are kept in memory. An entry is re-read once it is older
/// than the TTL, or earlier when the file's modification time changes.
pub struct IisInfoCache {
    dir: PathBuf,
    ttl: Duration,
    entries: HashMap<EnvironmentType, CachedInfo>,
}

impl IisInfoCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: IIS_INFO_TTL,
            entries: HashMap::new(),
        }
    }

    pub fn file_path(&self, env: EnvironmentType) -> PathBuf {
        self.dir.join(format!("IISInfo_{env}.json"))
    }

    /// Loads the info of each environment in the given order.
    ///
    /// Environments without a file are left out. A file holding `null` maps
    /// to `None`.
    ///
    /// # Errors
    ///
    /// Returns an error when a file exists but cannot be read or parsed.
    pub fn load(
        &mut self,
        environments: &[EnvironmentType],
    ) -> Result<IndexMap<EnvironmentType, Option<Value>>> {
        let mut result = IndexMap::new();
        for &env in environments {
            if result.contains_key(&env) {
                continue;
            }
            let path = self.file_path(env);
            if !path.is_file() {
                self.entries.remove(&env);
                continue;
            }
            let info = self.load_one(env, &path)?;
            result.insert(env, info);
        }
        Ok(result)
    }

    fn load_one(&mut self, env: EnvironmentType, path: &Path) -> Result<Option<Value>> {
        let modified = fs::metadata(path)?.modified().ok();

        if let Some(cached) = self.entries.get(&env) {
            if cached.loaded_at.elapsed() < self.ttl && cached.modified == modified {
                debug!("IIS info cache hit for {env}");
                return Ok(cached.info.clone());
            }
        }

        let content = fs::read_to_string(path)?;
        let info = match serde_json::from_str::<Value>(&content)? {
            Value::Null => None,
            value => Some(value),
        };
        debug!("Loaded IIS info for {env} from {}", path.display());

        self.entries.insert(
            env,
            CachedInfo {
                loaded_at: Instant::now(),
                modified,
                info: info.clone(),
            },
        );
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &Path, env: &str, content: &str) -> PathBuf {
        let path = dir.join(format!("IISInfo_{env}.json"));
        fs::write(&path, content).unwrap();
        path
    }

    fn set_modified(path: &Path, time: SystemTime) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    const ORDER: [EnvironmentType; 3] = [
        EnvironmentType::AzureCms,
        EnvironmentType::AzureDev,
        EnvironmentType::AzureProd,
    ];

    #[test]
    fn test_missing_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "AzureDev", r#"{"sites": ["Web"]}"#);
        write(temp_dir.path(), "AzureCMS", "null");

        let mut cache = IisInfoCache::new(temp_dir.path());
        let loaded = cache.load(&ORDER).unwrap();

        let keys: Vec<_> = loaded.keys().copied().collect();
        assert_eq!(keys, vec![EnvironmentType::AzureCms, EnvironmentType::AzureDev]);
        assert_eq!(loaded[&EnvironmentType::AzureCms], None);
        assert_eq!(
            loaded[&EnvironmentType::AzureDev],
            Some(json!({"sites": ["Web"]}))
        );
    }

    #[test]
    fn test_unchanged_file_is_served_from_memory() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(temp_dir.path(), "AzureDev", r#"{"v": 1}"#);
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_modified(&path, stamp);

        let mut cache = IisInfoCache::new(temp_dir.path());
        cache.load(&ORDER).unwrap();

        fs::write(&path, r#"{"v": 2}"#).unwrap();
        set_modified(&path, stamp);

        let loaded = cache.load(&ORDER).unwrap();
        assert_eq!(loaded[&EnvironmentType::AzureDev], Some(json!({"v": 1})));
    }

    #[test]
    fn test_modified_file_is_reloaded() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(temp_dir.path(), "AzureProd", r#"{"v": 1}"#);
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_modified(&path, stamp);

        let mut cache = IisInfoCache::new(temp_dir.path());
        cache.load(&ORDER).unwrap();

        fs::write(&path, r#"{"v": 2}"#).unwrap();
        set_modified(&path, stamp + Duration::from_secs(60));

        let loaded = cache.load(&ORDER).unwrap();
        assert_eq!(loaded[&EnvironmentType::AzureProd], Some(json!({"v": 2})));
    }

    #[test]
    fn test_expired_entry_is_reloaded() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(temp_dir.path(), "AzureDev", r#"{"v": 1}"#);
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_modified(&path, stamp);

        let mut cache = IisInfoCache::new(temp_dir.path());
        cache.ttl = Duration::ZERO;
        cache.load(&ORDER).unwrap();

        fs::write(&path, r#"{"v": 2}"#).unwrap();
        set_modified(&path, stamp);

        let loaded = cache.load(&ORDER).unwrap();
        assert_eq!(loaded[&EnvironmentType::AzureDev], Some(json!({"v": 2})));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "AzureDev", "{not json");

        let mut cache = IisInfoCache::new(temp_dir.path());
        assert!(cache.load(&ORDER).is_err());
    }
}
