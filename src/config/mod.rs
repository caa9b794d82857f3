use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use strum::Display;

pub mod themes;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "TaskCells";
const APP_NAME: &str = "taskcells";
const JAR_FILE_NAME: &str = "cookies.txt";

pub const DEFAULT_COOKIE_NAME: &str = "task-data";
pub const DEFAULT_COOKIE_MAX_AGE_SECS: i64 = 31_536_000;
/// Roughly 400 years; keeps cookie expiry inside the representable date range.
pub const MAX_COOKIE_MAX_AGE_SECS: i64 = 400 * DEFAULT_COOKIE_MAX_AGE_SECS;

/// Command-line overrides for the discovered locations.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover(overrides: &PathOverrides) -> Result<Self> {
        let paths = ConfigPaths::discover(overrides)?;
        Ok(Self { paths })
    }

    pub fn from_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths);
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths);
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub jar_path: PathBuf,
    pub state_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover(overrides: &PathOverrides) -> Result<Self> {
        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = overrides
            .config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = overrides
            .config
            .clone()
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_dir = overrides
            .data_dir
            .clone()
            .unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_dir.join("state"));

        Ok(Self::rooted(config_dir, config_file, data_dir, state_dir))
    }

    /// Lays out every path under explicit roots.
    pub fn rooted(
        config_dir: PathBuf,
        config_file: PathBuf,
        data_dir: PathBuf,
        state_dir: PathBuf,
    ) -> Self {
        Self {
            jar_path: data_dir.join(JAR_FILE_NAME),
            log_dir: state_dir.join("logs"),
            config_dir,
            config_file,
            data_dir,
            state_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.state_dir, &self.log_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub theme: ThemeName,
    pub display: DisplayOptions,
    pub storage: StorageOptions,
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) {
        self.storage.resolve(paths);
        if self.display.max_display_length == 0 {
            tracing::warn!("max_display_length of 0 in config, using 1");
            self.display.max_display_length = 1;
        }
        if self.display.max_task_length == 0 {
            tracing::warn!("max_task_length of 0 in config, using the default");
            self.display.max_task_length = DisplayOptions::default().max_task_length;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    /// Characters of task text shown before shortening kicks in.
    pub max_display_length: usize,
    /// Characters a task may hold at all.
    pub max_task_length: usize,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            max_display_length: 35,
            max_task_length: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// `false` runs without persistence, as a browser with cookies disabled.
    pub enabled: bool,
    pub cookie_name: String,
    pub max_age_secs: i64,
    #[serde(skip)]
    pub jar_path: PathBuf,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age_secs: DEFAULT_COOKIE_MAX_AGE_SECS,
            jar_path: PathBuf::new(),
        }
    }
}

impl StorageOptions {
    fn resolve(&mut self, paths: &ConfigPaths) {
        if self.jar_path.as_os_str().is_empty() {
            self.jar_path = paths.jar_path.clone();
        }
        if self.cookie_name.trim().is_empty() {
            self.cookie_name = DEFAULT_COOKIE_NAME.to_string();
        }
        if self.max_age_secs <= 0 {
            tracing::warn!(
                max_age_secs = self.max_age_secs,
                "non-positive cookie max age, using one year"
            );
            self.max_age_secs = DEFAULT_COOKIE_MAX_AGE_SECS;
        } else if self.max_age_secs > MAX_COOKIE_MAX_AGE_SECS {
            tracing::warn!(
                max_age_secs = self.max_age_secs,
                "cookie max age too large, capping at 400 years"
            );
            self.max_age_secs = MAX_COOKIE_MAX_AGE_SECS;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
    HighContrast,
    Solarized,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let base = root.path();
        let config_dir = base.join("config");
        ConfigPaths::rooted(
            config_dir.clone(),
            config_dir.join("config.toml"),
            base.join("data"),
            base.join("state"),
        )
    }

    #[test]
    fn first_run_writes_defaults() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        let loader = ConfigLoader::from_paths(paths.clone());
        let cfg = loader.load_or_init()?;
        assert!(paths.config_file.exists());
        assert_eq!(cfg.display, DisplayOptions::default());
        assert_eq!(cfg.storage.cookie_name, "task-data");
        assert_eq!(cfg.storage.max_age_secs, 31_536_000);
        assert_eq!(cfg.storage.jar_path, paths.data_dir.join("cookies.txt"));

        let reloaded = loader.load()?;
        assert_eq!(reloaded.theme, ThemeName::Dark);
        assert!(reloaded.storage.enabled);
        Ok(())
    }

    #[test]
    fn partial_toml_overrides_only_named_keys() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "theme = \"high-contrast\"\n\n[display]\nmax_display_length = 20\n\n[storage]\nenabled = false\n",
        )?;
        let cfg = ConfigLoader::from_paths(paths).load()?;
        assert_eq!(cfg.theme, ThemeName::HighContrast);
        assert_eq!(cfg.display.max_display_length, 20);
        assert_eq!(cfg.display.max_task_length, 200);
        assert!(!cfg.storage.enabled);
        assert_eq!(cfg.storage.cookie_name, "task-data");
        Ok(())
    }

    #[test]
    fn degenerate_values_are_repaired() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "[display]\nmax_display_length = 0\n\n[storage]\ncookie_name = \"  \"\nmax_age_secs = -5\n",
        )?;
        let cfg = ConfigLoader::from_paths(paths).load()?;
        assert_eq!(cfg.display.max_display_length, 1);
        assert_eq!(cfg.storage.cookie_name, "task-data");
        assert_eq!(cfg.storage.max_age_secs, 31_536_000);
        Ok(())
    }

    #[test]
    fn oversized_max_age_is_capped() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "[storage]\nmax_age_secs = 1000000000000\n",
        )?;
        let cfg = ConfigLoader::from_paths(paths).load()?;
        assert_eq!(cfg.storage.max_age_secs, MAX_COOKIE_MAX_AGE_SECS);
        Ok(())
    }

    #[test]
    fn unknown_theme_is_a_parse_error() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(&paths.config_file, "theme = \"neon\"\n")?;
        assert!(ConfigLoader::from_paths(paths).load().is_err());
        Ok(())
    }
}
