//! Configuration loading
//!
//! Each setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_DATABASE: &str = "RUBRIC_DB";
pub const ENV_AUTHOR: &str = "RUBRIC_AUTHOR";
pub const ENV_CONFIG: &str = "RUBRIC_CONFIG";

pub const DEFAULT_DATABASE: &str = "rubrics.db";
pub const DEFAULT_AUTHOR: &str = "teacher";
pub const DEFAULT_TOTAL_SCORE: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    /// Recorded as `created_by` on new rubrics and as the event actor
    pub created_by: String,
    /// Total score used when `create` is not given one
    pub default_total_score: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            created_by: DEFAULT_AUTHOR.to_string(),
            default_total_score: DEFAULT_TOTAL_SCORE,
        }
    }
}

/// Shape of the optional TOML file; every key may be omitted
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub database_path: Option<PathBuf>,
    pub created_by: Option<String>,
    pub default_total_score: Option<i64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Values supplied on the command line
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub created_by: Option<String>,
}

impl Config {
    /// Resolve from CLI values, the process environment and the config file
    pub fn resolve(cli: &CliOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::resolve`] with an injectable environment lookup
    pub fn resolve_with<F>(cli: &CliOverrides, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = cli
            .config_path
            .clone()
            .or_else(|| env(ENV_CONFIG).map(PathBuf::from));

        let file = match config_path {
            Some(path) => FileConfig::load(&path)?,
            None => FileConfig::default(),
        };

        let defaults = Config::default();

        let database_path = cli
            .database_path
            .clone()
            .or_else(|| env(ENV_DATABASE).map(PathBuf::from))
            .or(file.database_path)
            .unwrap_or(defaults.database_path);

        let created_by = cli
            .created_by
            .clone()
            .or_else(|| env(ENV_AUTHOR))
            .or(file.created_by)
            .unwrap_or(defaults.created_by);

        let default_total_score = file
            .default_total_score
            .unwrap_or(defaults.default_total_score);

        if default_total_score < 1 {
            return Err(ConfigError::Invalid(format!(
                "default_total_score must be at least 1, got {}",
                default_total_score
            )));
        }

        if created_by.trim().is_empty() {
            return Err(ConfigError::Invalid("created_by must not be blank".to_string()));
        }

        Ok(Config {
            database_path,
            created_by,
            default_total_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve_with(&CliOverrides::default(), no_env).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_priority_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database_path = \"from_file.db\"\ncreated_by = \"file-author\"\ndefault_total_score = 20"
        )
        .unwrap();

        let env: HashMap<&str, &str> = [(ENV_DATABASE, "from_env.db")].into_iter().collect();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let cli = CliOverrides {
            config_path: Some(file.path().to_path_buf()),
            database_path: None,
            created_by: Some("cli-author".to_string()),
        };

        let config = Config::resolve_with(&cli, lookup).unwrap();

        assert_eq!(config.database_path, PathBuf::from("from_env.db"));
        assert_eq!(config.created_by, "cli-author");
        assert_eq!(config.default_total_score, 20);
    }

    #[test]
    fn test_config_path_from_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "created_by = \"env-file\"").unwrap();
        let path = file.path().display().to_string();

        let lookup = |key: &str| (key == ENV_CONFIG).then(|| path.clone());
        let config = Config::resolve_with(&CliOverrides::default(), lookup).unwrap();

        assert_eq!(config.created_by, "env-file");
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE));
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_total_score = \"ten\"").unwrap();

        let cli = CliOverrides {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        assert!(matches!(
            Config::resolve_with(&cli, no_env),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_rejects_non_positive_total() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_total_score = 0").unwrap();

        let cli = CliOverrides {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        assert!(matches!(
            Config::resolve_with(&cli, no_env),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let cli = CliOverrides {
            config_path: Some(PathBuf::from("/nonexistent/rubric-config.toml")),
            ..Default::default()
        };

        assert!(matches!(
            Config::resolve_with(&cli, no_env),
            Err(ConfigError::Read { .. })
        ));
    }
}
