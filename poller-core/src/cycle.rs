//! One fetch, parse, map and publish pass.

use std::sync::Arc;

use crate::{
    client::{HourlyClient, truncate_body},
    mapper,
    model::PollTarget,
    parser::{self, ParseError, PayloadRecorder},
    sink::StateSink,
};

/// What a single cycle achieved. Never an error: failures are logged and
/// contained here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Values were published; `partial` when some numeric readings were absent.
    Published { partial: bool },
    /// Nothing was published.
    Aborted(CycleFailure),
}

/// Why a cycle published nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleFailure {
    Malformed,
    MissingProperties,
}

impl CycleOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, CycleOutcome::Published { .. })
    }
}

#[derive(Clone)]
pub struct PollCycle {
    client: Arc<dyn HourlyClient>,
    sink: StateSink,
    recorder: Option<Arc<dyn PayloadRecorder>>,
}

impl PollCycle {
    pub fn new(client: Arc<dyn HourlyClient>, sink: StateSink) -> Self {
        Self {
            client,
            sink,
            recorder: None,
        }
    }

    /// Offer every decoded response to `recorder` for inspection.
    pub fn with_recorder(mut self, recorder: Arc<dyn PayloadRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub async fn run(&self, target: &PollTarget) -> CycleOutcome {
        // Transport failures fall through as an empty body and fail parsing.
        let raw = match self
            .client
            .fetch_hourly(target.latitude, target.longitude)
            .await
        {
            Ok(reply) if reply.is_ok() => reply.body,
            Ok(reply) => {
                tracing::warn!(
                    status = reply.status,
                    body = %truncate_body(&reply.body),
                    "hourly request failed"
                );
                String::new()
            }
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "hourly request failed");
                String::new()
            }
        };

        let properties = match parser::parse(raw.as_bytes(), self.recorder.as_deref()) {
            Ok(properties) => properties,
            Err(err) => {
                tracing::error!(error = %err, raw = %raw, "unusable hourly response");
                let failure = match err {
                    ParseError::Malformed(_) => CycleFailure::Malformed,
                    ParseError::MissingProperties => CycleFailure::MissingProperties,
                };
                return CycleOutcome::Aborted(failure);
            }
        };

        let values = mapper::map(&properties);
        self.sink.publish(target, &values);

        CycleOutcome::Published {
            partial: values.is_partial(),
        }
    }
}
