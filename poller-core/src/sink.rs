//! Publishes mapped values onto host entities.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    model::{EntityId, MappedValues, PollTarget},
    store::EntityStore,
};

pub const CURRENT_TEMPERATURE: &str = "CurrentTemperature";
pub const MAX_TEMP: &str = "MaxTemp";
pub const MIN_TEMP: &str = "MinTemp";
pub const CURRENT_LEVEL: &str = "CurrentLevel";
pub const PRESSURE: &str = "Pressure";
pub const LOCATION_NAME: &str = "LocationName";
pub const MODEL_RUN_DATE: &str = "modelRunDate";
pub const LAST_UPDATE: &str = "LastUpdate";

/// Prefix for the verbatim copy of the latest time-series entry.
pub const LATEST_OBSERVATION_PREFIX: &str = "latestObservation.";

#[derive(Clone)]
pub struct StateSink {
    store: Arc<dyn EntityStore>,
}

impl StateSink {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Write `values` to the target's entities.
    ///
    /// Absent values leave their keys untouched. Max/min temperature receive
    /// the current reading every cycle; tracking real extremes is left to
    /// whatever aggregates the stream downstream.
    pub fn publish(&self, target: &PollTarget, values: &MappedValues) {
        let primary = &target.primary;

        if let Some(name) = &values.location_name {
            self.set_str(primary, LOCATION_NAME, name);
        }
        if let Some(run_date) = &values.model_run_date {
            self.store.set(primary, MODEL_RUN_DATE, run_date.clone());
        }

        for (key, value) in &values.latest {
            self.store
                .set(primary, &format!("{LATEST_OBSERVATION_PREFIX}{key}"), value.clone());
        }

        if let Some(temperature) = &values.temperature {
            for key in [CURRENT_TEMPERATURE, MAX_TEMP, MIN_TEMP] {
                self.set_str(primary, key, temperature);
            }
            if let Some(child) = &target.temperature {
                self.set_str(child, CURRENT_TEMPERATURE, temperature);
            }
        }

        if let Some(humidity) = &values.humidity {
            self.set_str(primary, CURRENT_LEVEL, humidity);
            if let Some(child) = &target.humidity {
                self.set_str(child, CURRENT_LEVEL, humidity);
            }
        }

        if let Some(pressure) = &values.pressure {
            self.set_str(primary, PRESSURE, pressure);
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.set_str(primary, LAST_UPDATE, &now);

        tracing::info!(
            entity = %primary,
            reading_time = values.reading_time.as_deref().unwrap_or("<none>"),
            "published latest reading"
        );
    }

    fn set_str(&self, entity: &EntityId, key: &str, value: &str) {
        self.store.set(entity, key, Value::String(value.to_owned()));
    }
}
