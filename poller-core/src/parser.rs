//! Validation of the raw hourly payload.
//!
//! Only `features[0].properties` is checked here; everything below it is
//! treated as untrusted and picked apart field by field by the mapper.

use serde_json::{Map, Value};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("payload has no features[0].properties object")]
    MissingProperties,
}

/// Receives every successfully decoded document, for manual inspection only.
pub trait PayloadRecorder: Send + Sync {
    fn record(&self, document: &Value);
}

/// Keeps the most recent decoded document; last writer wins.
#[derive(Debug, Default)]
pub struct LastPayload {
    slot: Mutex<Option<Value>>,
}

impl LastPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<Value> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl PayloadRecorder for LastPayload {
    fn record(&self, document: &Value) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(document.clone());
        }
    }
}

/// Decode `raw` and return the first feature's `properties` object.
///
/// The recorder sees every call: the decoded document, or `null` when `raw`
/// is not JSON.
pub fn parse(
    raw: &[u8],
    recorder: Option<&dyn PayloadRecorder>,
) -> Result<Map<String, Value>, ParseError> {
    let decoded = serde_json::from_slice::<Value>(raw);

    if let Some(recorder) = recorder {
        recorder.record(decoded.as_ref().unwrap_or(&Value::Null));
    }

    let mut document = decoded?;

    match document
        .get_mut("features")
        .and_then(|features| features.get_mut(0))
        .and_then(|feature| feature.get_mut("properties"))
        .map(Value::take)
    {
        Some(Value::Object(properties)) => Ok(properties),
        _ => Err(ParseError::MissingProperties),
    }
}
