use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use tracing::{debug, info};

use crate::view::FilterMode;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub default_filter: FilterMode,
    pub show_completed: bool,
}

impl Config {
    /// Reads `config.toml`. An explicit path must exist; the default one
    /// is optional.
    #[tracing::instrument]
    pub fn load(path_override: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path_override {
            Some(path) => expand_tilde(path),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("no config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg = Self::parse(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        info!(config = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tarefas").join("config.toml"))
}

/// `--data-dir` (or its env var) beats the config file, which beats the
/// platform data directory. The directory is created when missing.
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        expand_tilde(path)
    } else if let Some(path) = &cfg.data_dir {
        expand_tilde(path)
    } else {
        dirs::data_dir()
            .map(|dir| dir.join("tarefas"))
            .ok_or_else(|| anyhow!("could not determine a data directory, pass --data-dir"))?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_all_keys() {
        let cfg = Config::parse(
            r#"
data_dir = "/tmp/tarefas"
default_filter = "overdue"
show_completed = true
"#,
        )
        .unwrap();

        assert_eq!(cfg.data_dir, Some(PathBuf::from("/tmp/tarefas")));
        assert_eq!(cfg.default_filter, FilterMode::Overdue);
        assert!(cfg.show_completed);
    }

    #[test]
    fn filter_names_ignore_case() {
        let cfg = Config::parse("default_filter = \"Overdue\"\n").unwrap();
        assert_eq!(cfg.default_filter, FilterMode::Overdue);
        assert!(Config::parse("default_filter = \"someday\"\n").is_err());
    }

    #[test]
    fn empty_file_means_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(Config::parse("colour = \"red\"").is_err());
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn override_dir_wins_and_is_created() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("data");
        let cfg = Config {
            data_dir: Some(dir.path().join("ignored")),
            ..Config::default()
        };

        let resolved = resolve_data_dir(&cfg, Some(&target)).unwrap();

        assert_eq!(resolved, target);
        assert!(target.is_dir());
        assert!(!dir.path().join("ignored").exists());
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/notes")), home.join("notes"));
        }
        assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
    }
}
