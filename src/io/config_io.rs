use std::fs;
use std::path::{Path, PathBuf};

use crate::io::store::FileStore;
use crate::model::config::AppConfig;

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Default config file path, respecting XDG_CONFIG_HOME
pub fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".config"));
    config_dir.join("glasstodo").join("config.toml")
}

/// Default data directory, respecting XDG_DATA_HOME
pub fn default_data_dir() -> PathBuf {
    let data_dir = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".local").join("share"));
    data_dir.join("glasstodo")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Read the config at `path`. A missing file yields the defaults.
pub fn read_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read the config from `explicit`, or from the default location.
pub fn read_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match explicit {
        Some(path) => read_config_from(path),
        None => read_config_from(&config_path()),
    }
}

/// The slot file to use: an explicit path wins, then `storage.dir` from the
/// config, then the XDG data dir.
pub fn resolve_store(config: &AppConfig, explicit: Option<&Path>) -> FileStore {
    if let Some(path) = explicit {
        return FileStore::new(path);
    }
    let dir = config
        .storage
        .dir
        .as_deref()
        .map(expand_home)
        .unwrap_or_else(default_data_dir);
    FileStore::in_dir(&dir, &config.storage.slot)
}

/// Expand a leading `~/` to the home directory
fn expand_home(dir: &str) -> PathBuf {
    match dir.strip_prefix("~/") {
        Some(rest) => dirs_home().join(rest),
        None => PathBuf::from(dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::CorruptPolicy;
    use crate::model::filter::FilterMode;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = read_config_from(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn reads_file_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"[storage]
dir = "/var/lib/todos"
slot = "work"
on_corrupt = "reset"

[display]
default_filter = "completed"
text_width = 40
"#,
        )
        .unwrap();

        let config = read_config(Some(&path)).unwrap();
        assert_eq!(config.storage.dir.as_deref(), Some("/var/lib/todos"));
        assert_eq!(config.storage.slot, "work");
        assert_eq!(config.storage.on_corrupt, CorruptPolicy::Reset);
        assert_eq!(config.display.default_filter, FilterMode::Completed);
        assert_eq!(config.display.text_width, 40);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[storage\nslot = ").unwrap();
        let err = read_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn explicit_store_path_wins() {
        let mut config = AppConfig::default();
        config.storage.dir = Some("/elsewhere".into());
        let store = resolve_store(&config, Some(Path::new("/tmp/mine.json")));
        assert_eq!(store.path(), Path::new("/tmp/mine.json"));
    }

    #[test]
    fn configured_dir_and_slot() {
        let mut config = AppConfig::default();
        config.storage.dir = Some("/srv/todo".into());
        config.storage.slot = "home".into();
        let store = resolve_store(&config, None);
        assert_eq!(store.path(), Path::new("/srv/todo/home.json"));
    }
}
