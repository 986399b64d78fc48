//! Core library for the `datahub-poller` service.
//!
//! This crate defines:
//! - Settings handling and validation
//! - The hourly point-forecast client
//! - Parsing, mapping and publishing of the latest reading
//! - The poll cycle and the fixed-period scheduler driving it
//!
//! The host's entity store and delayed-execution facility are traits
//! ([`EntityStore`], [`DelayedExecutor`]) so the core can run inside any host.

pub mod client;
pub mod config;
pub mod cycle;
pub mod mapper;
pub mod model;
pub mod parser;
pub mod scheduler;
pub mod sink;
pub mod store;

pub use client::{DataHubClient, HourlyClient, HourlyReply};
pub use config::{HostLocation, PollerConfig, Settings};
pub use cycle::{CycleFailure, CycleOutcome, PollCycle};
pub use model::{ChildKind, ChildSpec, EntityId, MappedValues, PollTarget};
pub use parser::{LastPayload, ParseError, PayloadRecorder};
pub use scheduler::{Cadence, DelayedExecutor, Scheduler, TokioDelay};
pub use sink::StateSink;
pub use store::{EntityStore, MemoryStore};
