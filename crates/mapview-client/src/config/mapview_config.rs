use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::style::StoresStyle;

/// API key baked in at build time, if `WOOSMAP_API_KEY` was set for the build
const BUILD_API_KEY: Option<&str> = option_env!("WOOSMAP_API_KEY");

pub const DEFAULT_SDK_URL: &str = "https://sdk.woosmap.com/map/map.js";

/// Environment variables read at runtime
pub const ENV_API_KEY: &str = "WOOSMAP_API_KEY";
pub const ENV_CENTER_LAT: &str = "MAPVIEW_CENTER_LAT";
pub const ENV_CENTER_LNG: &str = "MAPVIEW_CENTER_LNG";
pub const ENV_ZOOM: &str = "MAPVIEW_ZOOM";
pub const ENV_CONFIG_PATH: &str = "MAPVIEW_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to determine config directory")]
    NoConfigDir,
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("no Woosmap API key configured (set WOOSMAP_API_KEY or api_key in the config file)")]
    MissingApiKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoWindowConfig {
    /// HTML with `{{field}}` placeholders filled from the clicked store
    pub template: String,
}

impl Default for InfoWindowConfig {
    fn default() -> Self {
        Self {
            template: "<div class=\"store-info\"><strong>{{name}}</strong><p>{{address}}</p></div>"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapViewConfig {
    /// Woosmap public API key
    pub api_key: Option<String>,

    /// Map JS SDK location, without the key parameter
    pub sdk_url: String,

    /// Id of the element the map is rendered into
    pub container_id: String,

    pub center: LatLng,
    pub zoom: f64,

    pub stores: StoresStyle,
    pub info_window: InfoWindowConfig,
}

impl Default for MapViewConfig {
    fn default() -> Self {
        Self {
            api_key: BUILD_API_KEY.map(str::to_string),
            sdk_url: DEFAULT_SDK_URL.to_string(),
            container_id: "map".to_string(),
            center: LatLng::new(37.7749, -122.4194),
            zoom: 12.0,
            stores: StoresStyle::default(),
            info_window: InfoWindowConfig::default(),
        }
    }
}

impl MapViewConfig {
    /// `$MAPVIEW_CONFIG` if set, otherwise `config.toml` in the platform config dir
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            return Ok(PathBuf::from(path));
        }

        let proj_dirs = ProjectDirs::from("", "", "mapview").ok_or(ConfigError::NoConfigDir)?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        info!(target: "config", "Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(target: "config", "Saved config to {}", path.display());
        Ok(())
    }

    /// Defaults, then the config file if present, then the process environment
    pub fn resolve() -> Result<Self, ConfigError> {
        let mut config = match Self::load() {
            Ok(config) => config,
            Err(ConfigError::NotFound(path)) => {
                debug!(target: "config", "No config file at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|key| !key.trim().is_empty()) {
            debug!(target: "config", "Using API key from {}", ENV_API_KEY);
            self.api_key = Some(key);
        }
        if let Some(lat) = lookup(ENV_CENTER_LAT) {
            self.center.lat = parse_number(ENV_CENTER_LAT, &lat)?;
        }
        if let Some(lng) = lookup(ENV_CENTER_LNG) {
            self.center.lng = parse_number(ENV_CENTER_LNG, &lng)?;
        }
        if let Some(zoom) = lookup(ENV_ZOOM) {
            self.zoom = parse_number(ENV_ZOOM, &zoom)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sdk_url.trim().is_empty() {
            return Err(ConfigError::Invalid("sdk_url is empty".to_string()));
        }
        if self.container_id.trim().is_empty() {
            return Err(ConfigError::Invalid("container_id is empty".to_string()));
        }
        if !(-90.0..=90.0).contains(&self.center.lat) {
            return Err(ConfigError::Invalid(format!(
                "center latitude {} is out of range",
                self.center.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.center.lng) {
            return Err(ConfigError::Invalid(format!(
                "center longitude {} is out of range",
                self.center.lng
            )));
        }
        if !(0.0..=22.0).contains(&self.zoom) {
            return Err(ConfigError::Invalid(format!("zoom {} is out of range", self.zoom)));
        }
        Ok(())
    }

    /// Full SDK script URL including the API key
    pub fn sdk_script_url(&self) -> Result<String, ConfigError> {
        let key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let separator = if self.sdk_url.contains('?') { '&' } else { '?' };
        Ok(format!("{}{}key={}", self.sdk_url, separator, key))
    }
}

fn parse_number(name: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} is not a number: {:?}", name, value)))
}
