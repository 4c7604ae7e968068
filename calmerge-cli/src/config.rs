//! User configuration at ~/.config/calmerge/config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use calmerge_core::{Source, SourceId, SourceKind};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

static DEFAULT_EXPORT_PATH: &str = "~/calmerge/merged.ics";
static DEFAULT_CALENDAR_NAME: &str = "Merged bookings";
static DEFAULT_REFRESH_INTERVAL: &str = "15m";
static DEFAULT_FETCH_TIMEOUT: &str = "30s";

fn default_export_path() -> PathBuf {
    PathBuf::from(DEFAULT_EXPORT_PATH)
}

fn is_default_export_path(p: &PathBuf) -> bool {
    *p == default_export_path()
}

fn default_calendar_name() -> String {
    DEFAULT_CALENDAR_NAME.to_string()
}

fn default_refresh_interval() -> String {
    DEFAULT_REFRESH_INTERVAL.to_string()
}

fn default_fetch_timeout() -> String {
    DEFAULT_FETCH_TIMEOUT.to_string()
}

/// One `[[sources]]` table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SourceEntry {
    pub id: SourceId,
    pub name: String,
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SourceEntry {
    /// The core's view of this entry. A `url` wins over a `path`.
    pub fn to_source(&self) -> Source {
        let mut source = Source::new(self.id.clone(), self.name.clone(), self.kind);
        source.color = self.color.clone();
        source.locator = self.url.clone().or_else(|| {
            self.path
                .as_ref()
                .map(|p| shellexpand::tilde(&p.to_string_lossy()).into_owned())
        });
        source
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CalmergeConfig {
    #[serde(default = "default_export_path", skip_serializing_if = "is_default_export_path")]
    pub export_path: PathBuf,

    #[serde(default = "default_calendar_name")]
    pub calendar_name: String,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: String,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: String,

    #[serde(default)]
    pub sources: Vec<SourceEntry>,

    #[serde(skip)]
    path: PathBuf,
}

impl CalmergeConfig {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("calmerge");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config file, creating a commented default on first use.
    /// `CALMERGE_*` environment variables override file values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        let mut config: CalmergeConfig = Config::builder()
            .add_source(File::from(config_path.as_path()).required(false))
            .add_source(Environment::with_prefix("CALMERGE"))
            .build()
            .with_context(|| format!("Could not read {}", config_path.display()))?
            .try_deserialize()
            .with_context(|| format!("Invalid config in {}", config_path.display()))?;

        config.path = config_path;
        tracing::debug!(path = %config.path.display(), sources = config.sources.len(), "loaded config");
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Could not serialize config")?;

        std::fs::write(&self.path, content)
            .with_context(|| format!("Could not write config file {}", self.path.display()))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> Result<()> {
        let contents = format!(
            "\
# calmerge configuration

# Where `calmerge export` writes the merged calendar:
# export_path = \"{DEFAULT_EXPORT_PATH}\"

# Calendar name shown by apps that import the export:
# calendar_name = \"{DEFAULT_CALENDAR_NAME}\"

# How often `calmerge watch` refreshes, and how long one fetch may take:
# refresh_interval = \"{DEFAULT_REFRESH_INTERVAL}\"
# fetch_timeout = \"{DEFAULT_FETCH_TIMEOUT}\"

# Feeds are added with `calmerge sources add`, e.g.:
# [[sources]]
# id = \"...\"
# name = \"Airbnb - Beach house\"
# kind = \"airbnb\"
# url = \"https://www.airbnb.com/calendar/ical/123.ics?s=abc\"
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Could not create config directory")?;
        }

        std::fs::write(path, contents).context("Could not write config file")?;

        Ok(())
    }

    pub fn export_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.export_path.to_string_lossy()).into_owned())
    }

    pub fn refresh_interval(&self) -> Result<Duration> {
        let interval = humantime::parse_duration(&self.refresh_interval)
            .with_context(|| format!("Invalid refresh_interval '{}'", self.refresh_interval))?;
        if interval.is_zero() {
            anyhow::bail!("refresh_interval must be greater than zero");
        }
        Ok(interval)
    }

    pub fn fetch_timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.fetch_timeout)
            .with_context(|| format!("Invalid fetch_timeout '{}'", self.fetch_timeout))
    }

    pub fn sources(&self) -> Vec<Source> {
        self.sources.iter().map(SourceEntry::to_source).collect()
    }

    /// Remove a source by id. Returns the removed entry.
    pub fn remove_source(&mut self, id: &str) -> Option<SourceEntry> {
        let index = self.sources.iter().position(|s| s.id.as_str() == id)?;
        Some(self.sources.remove(index))
    }
}
