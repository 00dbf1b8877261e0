use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::SectorSelector;
use crate::error::TessError;

pub const CONFIG_FILE_NAME: &str = "tess-cat.json";
pub const DEFAULT_SECTOR_COUNT: u32 = 27;

/// On-disk configuration. Every field is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default)]
    pub sector_count: Option<u32>,
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub force_redownload: Option<bool>,
    /// `true`, an integer or a list of integers.
    #[serde(default)]
    pub sectors: Option<Value>,
}

/// Process-wide settings, built once and passed into every operation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_path: Utf8PathBuf,
    pub sector_count: u32,
    pub verbose: bool,
    pub force_redownload: bool,
    pub sectors: SectorSelector,
}

impl Settings {
    pub fn with_base_path(base_path: Utf8PathBuf) -> Self {
        Self {
            base_path,
            sector_count: DEFAULT_SECTOR_COUNT,
            verbose: true,
            force_redownload: false,
            sectors: SectorSelector::All,
        }
    }
}

/// Per-call overrides; `Some` replaces the matching [`Settings`] value.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    pub verbose: Option<bool>,
    pub force_redownload: Option<bool>,
}

impl FetchOptions {
    pub fn forced() -> Self {
        Self {
            verbose: None,
            force_redownload: Some(true),
        }
    }

    pub fn verbose(&self, settings: &Settings) -> bool {
        self.verbose.unwrap_or(settings.verbose)
    }

    pub fn force_redownload(&self, settings: &Settings) -> bool {
        self.force_redownload.unwrap_or(settings.force_redownload)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path` when given. Otherwise looks for `tess-cat.json` in the
    /// current directory, then in the user config directory, and falls back
    /// to defaults when neither exists.
    pub fn resolve(path: Option<&str>) -> Result<Settings, TessError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => default_config_paths()
                .into_iter()
                .find(|candidate| candidate.exists()),
        };

        let config = match config_path {
            Some(config_path) => {
                let content = fs::read_to_string(&config_path)
                    .map_err(|_| TessError::ConfigRead(config_path.clone()))?;
                serde_json::from_str(&content)
                    .map_err(|err| TessError::ConfigParse(err.to_string()))?
            }
            None => Config::default(),
        };

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<Settings, TessError> {
        let base_path = match config.base_path {
            Some(path) => Utf8PathBuf::from(path),
            None => default_base_path()?,
        };
        let sectors = match &config.sectors {
            Some(value) => SectorSelector::from_value(value)?,
            None => SectorSelector::All,
        };
        let sector_count = config.sector_count.unwrap_or(DEFAULT_SECTOR_COUNT);
        if sector_count == 0 {
            return Err(TessError::InvalidArgument(
                "sector_count must be at least 1".to_string(),
            ));
        }

        Ok(Settings {
            base_path,
            sector_count,
            verbose: config.verbose.unwrap_or(true),
            force_redownload: config.force_redownload.unwrap_or(false),
            sectors,
        })
    }
}

pub fn default_base_path() -> Result<Utf8PathBuf, TessError> {
    let cwd = std::env::current_dir().map_err(|err| TessError::Filesystem(err.to_string()))?;
    Utf8PathBuf::from_path_buf(cwd.join("data").join("tesstargets"))
        .map_err(|_| TessError::Filesystem("invalid base path".to_string()))
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dirs) = BaseDirs::new() {
        paths.push(dirs.config_dir().join("tess-cat").join("config.json"));
    }
    paths
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::domain::SectorNumber;

    #[test]
    fn defaults_when_empty() {
        let settings = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(settings.sector_count, DEFAULT_SECTOR_COUNT);
        assert!(settings.verbose);
        assert!(!settings.force_redownload);
        assert_eq!(settings.sectors, SectorSelector::All);
        assert!(settings.base_path.ends_with("data/tesstargets"));
    }

    #[test]
    fn per_call_options_override() {
        let settings = Settings::with_base_path(Utf8PathBuf::from("/tmp/tess"));
        let options = FetchOptions {
            verbose: Some(false),
            force_redownload: None,
        };
        assert!(!options.verbose(&settings));
        assert!(!options.force_redownload(&settings));
        assert!(FetchOptions::forced().force_redownload(&settings));
    }

    #[test]
    fn sectors_from_config() {
        let config = Config {
            sectors: Some(json!(5)),
            ..Config::default()
        };
        let settings = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(
            settings.sectors,
            SectorSelector::Single(SectorNumber::new(5).unwrap())
        );

        let config = Config {
            sectors: Some(json!(3.5)),
            ..Config::default()
        };
        assert_matches!(
            ConfigLoader::resolve_config(config),
            Err(TessError::InvalidArgument(_))
        );
    }
}
