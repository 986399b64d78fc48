use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Host-side identifier of an entity (a device exposing a key-value surface).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of a satellite entity hanging off this one, e.g. `weather-temperature`.
    pub fn child(&self, kind: ChildKind) -> Self {
        Self(format!("{}-{}", self.0, kind.as_str()))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Satellite entities that may be materialised next to the primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildKind {
    Temperature,
    Humidity,
}

impl ChildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildKind::Temperature => "temperature",
            ChildKind::Humidity => "humidity",
        }
    }

    pub const fn all() -> &'static [ChildKind] {
        &[ChildKind::Temperature, ChildKind::Humidity]
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which satellite entities should exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildSpec {
    pub temperature: bool,
    pub humidity: bool,
}

impl ChildSpec {
    pub fn contains(&self, kind: ChildKind) -> bool {
        match kind {
            ChildKind::Temperature => self.temperature,
            ChildKind::Humidity => self.humidity,
        }
    }
}

impl FromIterator<ChildKind> for ChildSpec {
    fn from_iter<I: IntoIterator<Item = ChildKind>>(iter: I) -> Self {
        let mut spec = ChildSpec::default();
        for kind in iter {
            match kind {
                ChildKind::Temperature => spec.temperature = true,
                ChildKind::Humidity => spec.humidity = true,
            }
        }
        spec
    }
}

/// Everything a poll cycle needs to know about where to fetch and publish.
///
/// Built once at startup and never mutated. The optional ids are only set
/// when the matching child was requested and its entity was created.
#[derive(Debug, Clone, PartialEq)]
pub struct PollTarget {
    pub primary: EntityId,
    pub temperature: Option<EntityId>,
    pub humidity: Option<EntityId>,
    pub latitude: f64,
    pub longitude: f64,
}

impl PollTarget {
    /// Target with no satellite entities.
    pub fn new(primary: impl Into<EntityId>, latitude: f64, longitude: f64) -> Self {
        Self {
            primary: primary.into(),
            temperature: None,
            humidity: None,
            latitude,
            longitude,
        }
    }
}

/// Output of the reading mapper: formatted values ready to publish.
///
/// Numeric fields are `None` when the source value was missing or not a number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedValues {
    pub temperature: Option<String>,
    pub humidity: Option<String>,
    pub pressure: Option<String>,
    pub location_name: Option<String>,
    pub model_run_date: Option<Value>,
    pub reading_time: Option<String>,
    /// The latest time-series entry, copied verbatim.
    pub latest: Map<String, Value>,
}

impl MappedValues {
    /// True when at least one derived numeric value is missing.
    pub fn is_partial(&self) -> bool {
        self.temperature.is_none() || self.humidity.is_none() || self.pressure.is_none()
    }
}
