use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use crate::{
    model::{ChildKind, ChildSpec, EntityId, PollTarget},
    scheduler::Cadence,
    store::EntityStore,
};

pub const DEFAULT_ENDPOINT: &str = "https://data.hub.api.metoffice.gov.uk/sitespecific/v0";
pub const DEFAULT_PRIMARY_ENTITY: &str = "datahub-weather";

/// Host-wide location, used when the poller has no coordinates of its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Settings as stored on disk. Everything is optional until validated.
///
/// Example TOML:
/// api_key = "..."
/// latitude = 50.72
/// longitude = -3.53
/// children = ["temperature", "humidity"]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub children: Vec<ChildKind>,
    pub primary_entity: String,
    pub endpoint: String,
    pub startup_delay_secs: u64,
    pub poll_interval_secs: u64,
    pub host: Option<HostLocation>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            latitude: None,
            longitude: None,
            children: Vec::new(),
            primary_entity: DEFAULT_PRIMARY_ENTITY.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            startup_delay_secs: 5,
            poll_interval_secs: 15 * 60,
            host: None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("no coordinates configured and no host location to fall back to")]
    MissingLocation,

    #[error("coordinates out of range: latitude {latitude}, longitude {longitude}")]
    InvalidLocation { latitude: f64, longitude: f64 },

    #[error("primary entity id must not be empty")]
    EmptyEntityId,

    #[error("poll interval must be at least one second")]
    ZeroInterval,
}

/// Validated configuration the poller runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    pub children: ChildSpec,
    pub primary_entity: EntityId,
    pub endpoint: String,
    pub cadence: Cadence,
}

impl Settings {
    /// Load settings from `path`, or return defaults if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Save settings to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "datahub-poller", "datahub-poller")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Check the settings once before polling starts.
    ///
    /// Coordinates are taken as a pair: if either is unset, both come from
    /// the host location.
    pub fn validate(&self) -> Result<PollerConfig, ConfigError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?
            .to_string();

        let (latitude, longitude) = match (self.latitude, self.longitude, self.host) {
            (Some(lat), Some(lon), _) => (lat, lon),
            (_, _, Some(host)) => (host.latitude, host.longitude),
            _ => return Err(ConfigError::MissingLocation),
        };

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ConfigError::InvalidLocation {
                latitude,
                longitude,
            });
        }

        let primary = self.primary_entity.trim();
        if primary.is_empty() {
            return Err(ConfigError::EmptyEntityId);
        }

        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(PollerConfig {
            api_key,
            latitude,
            longitude,
            children: self.children.iter().copied().collect(),
            primary_entity: EntityId::new(primary),
            endpoint: self.endpoint.clone(),
            cadence: Cadence {
                startup_delay: Duration::from_secs(self.startup_delay_secs),
                period: Duration::from_secs(self.poll_interval_secs),
            },
        })
    }

    /// Set or replace the API key.
    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }
}

impl PollerConfig {
    /// Create the requested satellite entities and build the poll target.
    ///
    /// A child whose creation fails is logged and left out of the target.
    pub fn build_target(&self, store: &dyn EntityStore) -> PollTarget {
        let mut target = PollTarget::new(self.primary_entity.clone(), self.latitude, self.longitude);

        for &kind in ChildKind::all() {
            if !self.children.contains(kind) {
                continue;
            }

            let id = self.primary_entity.child(kind);
            let label = format!("{} {}", self.primary_entity, kind);
            match store.create_entity(&id, &label) {
                Ok(()) => {
                    tracing::info!(entity = %id, "created child entity");
                    match kind {
                        ChildKind::Temperature => target.temperature = Some(id),
                        ChildKind::Humidity => target.humidity = Some(id),
                    }
                }
                Err(e) => tracing::warn!(entity = %id, error = %e, "child entity not created"),
            }
        }

        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use serde_json::Value;

    fn configured() -> Settings {
        Settings {
            api_key: Some("KEY".into()),
            latitude: Some(50.72),
            longitude: Some(-3.53),
            ..Settings::default()
        }
    }

    #[test]
    fn validate_errors_without_api_key() {
        let settings = Settings {
            api_key: Some("   ".into()),
            ..configured()
        };
        assert_eq!(settings.validate().unwrap_err(), ConfigError::MissingApiKey);

        let settings = Settings {
            api_key: None,
            ..configured()
        };
        assert_eq!(settings.validate().unwrap_err(), ConfigError::MissingApiKey);
    }

    #[test]
    fn validate_uses_explicit_coordinates() {
        let settings = Settings {
            host: Some(HostLocation {
                latitude: 10.0,
                longitude: 20.0,
            }),
            ..configured()
        };

        let cfg = settings.validate().expect("valid settings");
        assert_eq!((cfg.latitude, cfg.longitude), (50.72, -3.53));
        assert_eq!(cfg.api_key, "KEY");
        assert_eq!(cfg.cadence, Cadence::default());
    }

    #[test]
    fn validate_falls_back_to_host_location() {
        let settings = Settings {
            longitude: None,
            host: Some(HostLocation {
                latitude: 10.0,
                longitude: 20.0,
            }),
            ..configured()
        };

        let cfg = settings.validate().expect("valid settings");
        assert_eq!((cfg.latitude, cfg.longitude), (10.0, 20.0));
    }

    #[test]
    fn validate_errors_without_any_location() {
        let settings = Settings {
            latitude: None,
            ..configured()
        };
        assert_eq!(settings.validate().unwrap_err(), ConfigError::MissingLocation);
    }

    #[test]
    fn validate_rejects_out_of_range_coordinates() {
        let settings = Settings {
            latitude: Some(91.0),
            ..configured()
        };
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::InvalidLocation { .. }
        ));
    }

    #[test]
    fn validate_rejects_zero_interval_and_empty_entity() {
        let settings = Settings {
            poll_interval_secs: 0,
            ..configured()
        };
        assert_eq!(settings.validate().unwrap_err(), ConfigError::ZeroInterval);

        let settings = Settings {
            primary_entity: " ".into(),
            ..configured()
        };
        assert_eq!(settings.validate().unwrap_err(), ConfigError::EmptyEntityId);
    }

    #[test]
    fn toml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let settings = Settings {
            children: vec![ChildKind::Humidity],
            ..configured()
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Settings::default());
        assert!(loaded.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            api_key = "KEY"
            children = ["temperature"]

            [host]
            latitude = 51.5
            longitude = -0.12
            "#,
        )
        .unwrap();

        let cfg = settings.validate().unwrap();
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.primary_entity, EntityId::from(DEFAULT_PRIMARY_ENTITY));
        assert!(cfg.children.temperature);
        assert!(!cfg.children.humidity);
    }

    #[test]
    fn build_target_creates_requested_children() {
        let store = MemoryStore::new();
        let cfg = Settings {
            children: vec![ChildKind::Temperature],
            ..configured()
        }
        .validate()
        .unwrap();

        let target = cfg.build_target(&store);

        assert_eq!(
            target.temperature,
            Some(EntityId::from("datahub-weather-temperature"))
        );
        assert_eq!(target.humidity, None);
        assert_eq!(store.entity_ids(), vec![EntityId::from("datahub-weather-temperature")]);
    }

    struct RefusingStore;

    impl EntityStore for RefusingStore {
        fn get(&self, _entity: &EntityId, _key: &str) -> Option<Value> {
            None
        }

        fn set(&self, _entity: &EntityId, _key: &str, _value: Value) {}

        fn create_entity(&self, entity: &EntityId, _label: &str) -> Result<(), StoreError> {
            Err(StoreError::CreateFailed(entity.clone(), "driver missing".into()))
        }
    }

    #[test]
    fn failed_child_creation_leaves_id_unset() {
        let cfg = Settings {
            children: vec![ChildKind::Temperature, ChildKind::Humidity],
            ..configured()
        }
        .validate()
        .unwrap();

        let target = cfg.build_target(&RefusingStore);

        assert_eq!(target.temperature, None);
        assert_eq!(target.humidity, None);
    }
}
