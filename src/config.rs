use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base path prefixed onto every navigation location.
    pub app_path: String,
    /// Directory holding overlay GeoJSON files; defaults to ./data.
    pub data_dir: Option<PathBuf>,
    pub map: MapSettings,
    pub city_bike: CityBikeSettings,
}

/// Base map and viewport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    /// Base tile URL; `{z}/{x}/{y}` and the size suffix are appended.
    pub url: String,
    pub tile_size: u32,
    pub zoom_offset: i32,
    /// Request @2x tiles on high-density displays.
    pub use_retina_tiles: bool,
    /// Vector overlay mode instead of the marker overlays.
    pub use_vector_tiles: bool,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub default_zoom: f64,
    pub default_center_lat: f64,
    pub default_center_lon: f64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            url: "https://cdn.digitransit.fi/map/v1/hsl-map/".to_string(),
            tile_size: 256,
            zoom_offset: 0,
            use_retina_tiles: true,
            use_vector_tiles: false,
            min_zoom: 0.0,
            max_zoom: 18.0,
            default_zoom: 11.0,
            default_center_lat: 60.1699,
            default_center_lon: 24.9384,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CityBikeSettings {
    pub show_city_bikes: bool,
}

impl AppConfig {
    /// Default config file location, `~/.config/transit-map/config.toml` or
    /// the platform equivalent.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("transit-map").join("config.toml")
    }

    /// Load configuration from `path` or the default location. A missing
    /// file is not an error; it yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Where the storage history backend keeps its state.
    pub fn history_state_file(&self) -> PathBuf {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("transit-map").join("history.json")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load(Some(Path::new("no/such/config.toml"))).unwrap();
        assert_eq!(config.map.tile_size, 256);
        assert!(!config.map.use_vector_tiles);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            "app_path = \"/transit\"\n\n[map]\nuse_vector_tiles = true\n"
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.app_path, "/transit");
        assert!(config.map.use_vector_tiles);
        assert_eq!(config.map.zoom_offset, 0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
