use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use datahub_poller_core::{
    ChildKind, CycleOutcome, DataHubClient, EntityId, EntityStore, LastPayload, MemoryStore,
    PollCycle, PollerConfig, Scheduler, Settings, StateSink, TokioDelay,
    sink::LAST_UPDATE,
    store::StoreError,
};
use inquire::{CustomType, MultiSelect, Password, PasswordDisplayMode};
use serde_json::{Map, Value};
use std::{path::PathBuf, sync::Arc};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "datahub-poller", version, about = "Site-specific weather poller")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set the API key, location and child entities.
    Configure,

    /// Run a single poll cycle and print the resulting entity state.
    Once,

    /// Poll on the configured interval until interrupted.
    ///
    /// Each published entity state is logged at info level; individual key
    /// writes at debug.
    Run,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let path = match self.config {
            Some(path) => path,
            None => Settings::config_file_path()?,
        };

        match self.command {
            Command::Configure => configure(&path),
            Command::Once => once(&load_validated(&path)?).await,
            Command::Run => run(&load_validated(&path)?).await,
        }
    }
}

fn load_validated(path: &std::path::Path) -> Result<PollerConfig> {
    let settings = Settings::load_from(path)?;
    settings.validate().with_context(|| {
        format!(
            "Invalid configuration in {}.\n\
             Hint: run `datahub-poller configure` first.",
            path.display()
        )
    })
}

fn configure(path: &std::path::Path) -> Result<()> {
    let mut settings = Settings::load_from(path)?;

    let api_key = Password::new("DataHub API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;
    settings.set_api_key(api_key.trim().to_string());

    let mut latitude = CustomType::<f64>::new("Latitude:");
    if let Some(current) = settings.latitude {
        latitude = latitude.with_default(current);
    }
    settings.latitude = Some(latitude.prompt()?);

    let mut longitude = CustomType::<f64>::new("Longitude:");
    if let Some(current) = settings.longitude {
        longitude = longitude.with_default(current);
    }
    settings.longitude = Some(longitude.prompt()?);

    settings.children =
        MultiSelect::new("Child entities:", ChildKind::all().to_vec()).prompt()?;

    settings
        .validate()
        .context("Entered settings are not usable")?;
    settings.save_to(path)?;

    println!("Saved configuration to {}", path.display());
    Ok(())
}

/// Memory store that logs every write; `run` has no other view of entity
/// state.
#[derive(Debug, Default)]
struct LoggedStore {
    inner: MemoryStore,
}

impl EntityStore for LoggedStore {
    fn get(&self, entity: &EntityId, key: &str) -> Option<Value> {
        self.inner.get(entity, key)
    }

    fn set(&self, entity: &EntityId, key: &str, value: Value) {
        tracing::debug!(entity = %entity, key, value = %value, "state updated");
        self.inner.set(entity, key, value);

        // LastUpdate is the final write of every publish.
        if key == LAST_UPDATE {
            tracing::info!(
                entity = %entity,
                state = %serde_json::Value::Object(self.inner.snapshot(entity)),
                "entity state"
            );
        }
    }

    fn create_entity(&self, entity: &EntityId, label: &str) -> Result<(), StoreError> {
        self.inner.create_entity(entity, label)
    }
}

fn all_state(store: &MemoryStore) -> Value {
    let mut state = Map::new();
    for id in store.entity_ids() {
        state.insert(id.to_string(), Value::Object(store.snapshot(&id)));
    }
    Value::Object(state)
}

fn build_cycle(cfg: &PollerConfig, store: Arc<dyn EntityStore>) -> PollCycle {
    let client = DataHubClient::new(cfg.api_key.clone(), cfg.endpoint.clone());
    PollCycle::new(Arc::new(client), StateSink::new(store))
}

async fn once(cfg: &PollerConfig) -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let target = cfg.build_target(store.as_ref());
    let recorder = Arc::new(LastPayload::new());
    let cycle = build_cycle(cfg, store.clone()).with_recorder(recorder.clone());

    let outcome = cycle.run(&target).await;
    if let CycleOutcome::Aborted(failure) = &outcome {
        tracing::warn!(?failure, "no update produced");
    }

    println!("{}", serde_json::to_string_pretty(&all_state(&store))?);

    Ok(())
}

async fn run(cfg: &PollerConfig) -> Result<()> {
    let store = Arc::new(LoggedStore::default());
    let target = cfg.build_target(store.as_ref());
    let cycle = build_cycle(cfg, store);

    let handle = Scheduler::new(cycle, target, Arc::new(TokioDelay), cfg.cadence).spawn();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        res = handle => {
            res.context("Polling task failed")?;
            tracing::warn!("Polling stopped");
        }
    }

    Ok(())
}
