use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::WorkspaceConfig;

/// Name of the directory holding config and stored data
pub const STORE_DIR: &str = ".leadboard";

const CONFIG_FILE: &str = "config.toml";

/// Error type for workspace discovery and config I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("not a leadboard workspace: no .leadboard/config.toml found (run `lb init`)")]
    NotAWorkspace,
    #[error("a workspace already exists at {0} (use --force to reinitialize)")]
    AlreadyInitialized(PathBuf),
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Walk up from `start` until a directory containing `.leadboard/config.toml`
/// is found, returning that directory.
pub fn discover_workspace(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(STORE_DIR).join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotAWorkspace);
        }
    }
}

pub fn store_dir(root: &Path) -> PathBuf {
    root.join(STORE_DIR)
}

pub fn read_config(store_dir: &Path) -> Result<WorkspaceConfig, ConfigError> {
    let path = store_dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.clone(),
        source: e,
    })?;
    Ok(toml::from_str(&text)?)
}

pub fn write_config(store_dir: &Path, config: &WorkspaceConfig) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(config)?;
    crate::io::storage::atomic_write(&store_dir.join(CONFIG_FILE), text.as_bytes())?;
    Ok(())
}

/// Create `.leadboard/` under `root` with a fresh config. Existing data
/// files are left alone when `force` rewrites the config.
pub fn init_workspace(root: &Path, name: &str, force: bool) -> Result<WorkspaceConfig, ConfigError> {
    let dir = store_dir(root);
    if dir.join(CONFIG_FILE).exists() && !force {
        return Err(ConfigError::AlreadyInitialized(root.to_path_buf()));
    }
    fs::create_dir_all(&dir)?;
    let config = WorkspaceConfig::new(name);
    write_config(&dir, &config)?;
    Ok(config)
}

/// Default workspace name: the directory's own name
pub fn infer_name(root: &Path) -> String {
    root.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("workspace")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_then_discover_from_subdirectory() {
        let tmp = TempDir::new().unwrap();
        init_workspace(tmp.path(), "acme", false).unwrap();
        let nested = tmp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(discover_workspace(&nested).unwrap(), tmp.path());
        let config = read_config(&store_dir(tmp.path())).unwrap();
        assert_eq!(config.workspace.name, "acme");
    }

    #[test]
    fn init_twice_requires_force() {
        let tmp = TempDir::new().unwrap();
        init_workspace(tmp.path(), "acme", false).unwrap();
        assert!(matches!(
            init_workspace(tmp.path(), "acme", false),
            Err(ConfigError::AlreadyInitialized(_))
        ));
        let config = init_workspace(tmp.path(), "renamed", true).unwrap();
        assert_eq!(config.workspace.name, "renamed");
    }

    #[test]
    fn config_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut config = WorkspaceConfig::new("acme");
        config.storage.tasks_key = "board".into();
        config.log.filter = "leadboard=debug".into();
        write_config(tmp.path(), &config).unwrap();
        assert_eq!(read_config(tmp.path()).unwrap(), config);
    }

    #[test]
    fn discover_fails_outside_workspace() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            discover_workspace(tmp.path()),
            Err(ConfigError::NotAWorkspace)
        ));
    }
}
