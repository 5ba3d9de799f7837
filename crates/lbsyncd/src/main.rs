// # lbsyncd - Load Balancer Reconciliation Daemon
//
// A thin integration layer over lbsync-core:
// 1. Reading configuration from environment variables
// 2. Loading the declared load balancers
// 3. Registering the remote client and state store
// 4. Reconciling every declared load balancer on its own task
//
// All reconciliation logic lives in lbsync-core. Retry policy belongs to
// whatever runs this binary: a failed run exits non-zero and can be re-run.
//
// ## Configuration
//
// ### Action
// - `LBSYNC_ACTION`: apply (default), refresh or destroy
// - `LBSYNC_DESIRED_PATH`: JSON file holding an array of load balancers
//
// ### Provider
// - `LBSYNC_PROVIDER_TYPE`: Provider type (azure)
// - `LBSYNC_SUBSCRIPTION_ID`: Subscription owning the resource groups
// - `LBSYNC_ACCESS_TOKEN`: OAuth bearer token
// - `LBSYNC_ENDPOINT`: Management endpoint override (optional)
//
// ### State Store
// - `LBSYNC_STATE_STORE_TYPE`: Type of state store (file, memory)
// - `LBSYNC_STATE_STORE_PATH`: Path to state file (for file store)
//
// ### Engine
// - `LBSYNC_POLL_INTERVAL_SECS`: Delay between provisioning polls
// - `LBSYNC_PROVISIONING_TIMEOUT_SECS`: Upper bound on a provisioning wait
// - `LBSYNC_LOG_LEVEL`: trace, debug, info, warn or error
//
// ## Example
//
// ```bash
// export LBSYNC_DESIRED_PATH=/etc/lbsync/load-balancers.json
// export LBSYNC_SUBSCRIPTION_ID=00000000-0000-0000-0000-000000000000
// export LBSYNC_ACCESS_TOKEN=$(az account get-access-token --query accessToken -o tsv)
// export LBSYNC_STATE_STORE_PATH=/var/lib/lbsync/state.json
//
// lbsyncd
// ```

use anyhow::{Context, Result};
use lbsync_core::config::{EngineConfig, LbsyncConfig, ProviderConfig, StateStoreConfig};
use lbsync_core::resource::LoadBalancer;
use lbsync_core::{
    ClientRegistry, LoadBalancerClient, ReconcileEvent, Reconciler, StateRecord, StateStore,
};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Every declared load balancer reconciled
/// - 1: Configuration or startup error
/// - 2: At least one load balancer failed, or the run was interrupted
#[derive(Debug, Clone, Copy)]
enum LbsyncExitCode {
    Reconciled = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<LbsyncExitCode> for ExitCode {
    fn from(code: LbsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// What to do with each declared load balancer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Create or update to match the declaration
    Apply,
    /// Re-read the last known state from the remote
    Refresh,
    /// Delete remotely and forget
    Destroy,
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "apply" => Ok(Action::Apply),
            "refresh" => Ok(Action::Refresh),
            "destroy" => Ok(Action::Destroy),
            other => anyhow::bail!(
                "LBSYNC_ACTION '{}' is not supported. Supported actions: apply, refresh, destroy",
                other
            ),
        }
    }
}

/// Application configuration
struct Config {
    action: String,
    desired_path: String,
    provider_type: String,
    subscription_id: String,
    access_token: String,
    endpoint: Option<String>,
    state_store_type: String,
    state_store_path: Option<String>,
    poll_interval_secs: Option<u64>,
    provisioning_timeout_secs: Option<u64>,
    log_level: String,
}

fn parse_secs(var: &str) -> Result<Option<u64>> {
    env::var(var)
        .ok()
        .map(|s| s.parse::<u64>())
        .transpose()
        .with_context(|| format!("{} must be a whole number of seconds", var))
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            action: env::var("LBSYNC_ACTION").unwrap_or_else(|_| "apply".to_string()),
            desired_path: env::var("LBSYNC_DESIRED_PATH").unwrap_or_default(),
            provider_type: env::var("LBSYNC_PROVIDER_TYPE").unwrap_or_else(|_| "azure".to_string()),
            subscription_id: env::var("LBSYNC_SUBSCRIPTION_ID").unwrap_or_default(),
            access_token: env::var("LBSYNC_ACCESS_TOKEN").unwrap_or_default(),
            endpoint: env::var("LBSYNC_ENDPOINT").ok().filter(|s| !s.is_empty()),
            state_store_type: env::var("LBSYNC_STATE_STORE_TYPE")
                .unwrap_or_else(|_| "file".to_string()),
            state_store_path: env::var("LBSYNC_STATE_STORE_PATH").ok(),
            poll_interval_secs: parse_secs("LBSYNC_POLL_INTERVAL_SECS")?,
            provisioning_timeout_secs: parse_secs("LBSYNC_PROVISIONING_TIMEOUT_SECS")?,
            log_level: env::var("LBSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        Action::from_str(&self.action)?;

        if self.desired_path.is_empty() {
            anyhow::bail!(
                "LBSYNC_DESIRED_PATH is required. \
                Set it via: export LBSYNC_DESIRED_PATH=/etc/lbsync/load-balancers.json"
            );
        }

        match self.provider_type.as_str() {
            "azure" => {}
            _ => anyhow::bail!(
                "LBSYNC_PROVIDER_TYPE '{}' is not supported. Supported providers: azure",
                self.provider_type
            ),
        }

        if self.subscription_id.is_empty() {
            anyhow::bail!("LBSYNC_SUBSCRIPTION_ID is required");
        }
        if self.access_token.is_empty() {
            anyhow::bail!(
                "LBSYNC_ACCESS_TOKEN is required. \
                Set it via: export LBSYNC_ACCESS_TOKEN=$(az account get-access-token --query accessToken -o tsv)"
            );
        }

        if let Some(ref endpoint) = self.endpoint
            && !endpoint.starts_with("https://")
            && !endpoint.starts_with("http://")
        {
            anyhow::bail!(
                "LBSYNC_ENDPOINT must use HTTP or HTTPS scheme. Got: {}",
                endpoint
            );
        }

        match self.state_store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "LBSYNC_STATE_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.state_store_type
            ),
        }

        if self.state_store_type == "file" {
            match self.state_store_path.as_deref() {
                None | Some("") => anyhow::bail!(
                    "LBSYNC_STATE_STORE_PATH is required when LBSYNC_STATE_STORE_TYPE=file. \
                    Set it via: export LBSYNC_STATE_STORE_PATH=/var/lib/lbsync/state.json"
                ),
                Some(path) => {
                    if let Some(parent) = std::path::Path::new(path).parent()
                        && !parent.as_os_str().is_empty()
                        && !parent.exists()
                    {
                        anyhow::bail!(
                            "LBSYNC_STATE_STORE_PATH parent directory does not exist: {}. \
                            Create it first: sudo mkdir -p {}",
                            parent.display(),
                            parent.display()
                        );
                    }
                }
            }
        }

        if let Some(interval) = self.poll_interval_secs
            && !(1..=300).contains(&interval)
        {
            anyhow::bail!(
                "LBSYNC_POLL_INTERVAL_SECS must be between 1 and 300 seconds. Got: {}",
                interval
            );
        }

        if let Some(timeout) = self.provisioning_timeout_secs
            && !(10..=3600).contains(&timeout)
        {
            anyhow::bail!(
                "LBSYNC_PROVISIONING_TIMEOUT_SECS must be between 10 and 3600 seconds. Got: {}",
                timeout
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "LBSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn action(&self) -> Result<Action> {
        Action::from_str(&self.action)
    }

    /// Build the core configuration, reading the declared load balancers
    fn to_lbsync_config(&self) -> Result<LbsyncConfig> {
        let raw = std::fs::read_to_string(&self.desired_path)
            .with_context(|| format!("Failed to read {}", self.desired_path))?;
        let load_balancers: Vec<LoadBalancer> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", self.desired_path))?;

        let mut engine = EngineConfig::default();
        if let Some(secs) = self.poll_interval_secs {
            engine.poll_interval_secs = secs;
        }
        if let Some(secs) = self.provisioning_timeout_secs {
            engine.provisioning_timeout_secs = secs;
        }

        let state_store = match self.state_store_type.as_str() {
            "file" => StateStoreConfig::File {
                path: self.state_store_path.clone().unwrap_or_default(),
            },
            _ => StateStoreConfig::Memory,
        };

        let config = LbsyncConfig {
            provider: ProviderConfig::Azure {
                subscription_id: self.subscription_id.clone(),
                access_token: self.access_token.clone(),
                endpoint: self.endpoint.clone(),
                api_version: None,
            },
            state_store,
            load_balancers,
            engine,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return LbsyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return LbsyncExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return LbsyncExitCode::ConfigError.into();
    }

    let loaded = config
        .action()
        .and_then(|action| config.to_lbsync_config().map(|cfg| (action, cfg)));
    let (action, lbsync_config) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return LbsyncExitCode::ConfigError.into();
        }
    };

    info!("Starting lbsyncd ({:?})", action);
    info!(
        "Configuration loaded: {} load balancer(s)",
        lbsync_config.load_balancers.len()
    );

    let registry = ClientRegistry::with_builtin_state_stores();
    register_providers(&registry);

    let client = match registry.create_client(&lbsync_config.provider) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create {} client: {}", lbsync_config.provider.type_name(), e);
            return LbsyncExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return LbsyncExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(&registry, client, lbsync_config, action).await {
            Ok(summary) if summary.failed == 0 => {
                info!("{} load balancer(s) reconciled", summary.reconciled);
                LbsyncExitCode::Reconciled
            }
            Ok(summary) => {
                error!(
                    "{} load balancer(s) failed, {} reconciled",
                    summary.failed, summary.reconciled
                );
                LbsyncExitCode::RuntimeError
            }
            Err(e) => {
                error!("Daemon error: {:#}", e);
                LbsyncExitCode::RuntimeError
            }
        }
    });

    code.into()
}

fn register_providers(registry: &ClientRegistry) {
    #[cfg(feature = "azure")]
    {
        debug!("Registering Azure client");
        lbsync_provider_azure::register(registry);
    }

    if registry.list_clients().is_empty() {
        warn!("No remote clients compiled in");
    }
}

/// Outcome of one run
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    reconciled: usize,
    failed: usize,
}

/// Reconcile every declared load balancer, one task each
async fn run_daemon(
    registry: &ClientRegistry,
    client: Arc<dyn LoadBalancerClient>,
    config: LbsyncConfig,
    action: Action,
) -> Result<Summary> {
    let store: Arc<dyn StateStore> =
        Arc::from(registry.create_state_store(&config.state_store).await?);
    info!("State store: {}", config.state_store.type_name());

    let (reconciler, events) = Reconciler::new(client, &config.engine)?;
    let event_task = tokio::spawn(log_events(events));

    let mut tasks = JoinSet::new();
    for lb in config.load_balancers {
        let reconciler = reconciler.clone();
        let store = store.clone();
        tasks.spawn(async move {
            let key = lb.state_key();
            let result = reconcile_one(&reconciler, store.as_ref(), action, lb).await;
            (key, result)
        });
    }
    // Tasks hold the remaining clones; the event channel closes with them
    drop(reconciler);

    let summary = collect(&mut tasks).await;

    store.flush().await?;
    if let Err(e) = event_task.await {
        warn!("Event logger ended abnormally: {}", e);
    }

    Ok(summary)
}

/// Wait for every task, or abandon them on a shutdown signal
async fn collect(tasks: &mut JoinSet<(String, lbsync_core::Result<()>)>) -> Summary {
    let mut summary = Summary::default();

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);
    let mut listening = true;

    loop {
        tokio::select! {
            joined = tasks.join_next() => match joined {
                None => break,
                Some(Ok((key, Ok(())))) => {
                    info!("Load balancer {} reconciled", key);
                    summary.reconciled += 1;
                }
                Some(Ok((key, Err(e)))) => {
                    error!("Load balancer {} failed: {}", key, e);
                    summary.failed += 1;
                }
                Some(Err(e)) => {
                    error!("Reconcile task ended abnormally: {}", e);
                    summary.failed += 1;
                }
            },
            signal = &mut shutdown, if listening => match signal {
                Ok(name) => {
                    let in_flight = tasks.len();
                    warn!(
                        "Received {}, abandoning {} in-flight reconciliation(s)",
                        name, in_flight
                    );
                    tasks.shutdown().await;
                    summary.failed += in_flight;
                    break;
                }
                Err(e) => {
                    warn!("{:#}; continuing without signal handling", e);
                    listening = false;
                }
            },
        }
    }

    summary
}

/// Apply one action to one declared load balancer
async fn reconcile_one(
    reconciler: &Reconciler,
    store: &dyn StateStore,
    action: Action,
    mut lb: LoadBalancer,
) -> lbsync_core::Result<()> {
    let key = lb.state_key();
    let prior = store.get(&key).await?;

    match action {
        Action::Apply => {
            if let Some(id) = prior.and_then(|record| record.resource.id) {
                lb.id = Some(id);
            }
            if lb.exists() {
                reconciler.update(&mut lb).await?;
            } else {
                reconciler.create(&mut lb).await?;
            }
            store.put(&key, &StateRecord::new(lb)).await?;
        }
        Action::Refresh => {
            let Some(record) = prior else {
                warn!("Load balancer {} has no recorded state, nothing to refresh", key);
                return Ok(());
            };
            let mut known = record.resource;
            reconciler.read(&mut known).await?;
            if known.exists() {
                store.put(&key, &StateRecord::new(known)).await?;
            } else {
                info!("Load balancer {} is gone remotely, forgetting it", key);
                store.delete(&key).await?;
            }
        }
        Action::Destroy => {
            let mut target = prior.map(|record| record.resource).unwrap_or(lb);
            reconciler.delete(&mut target).await?;
            store.delete(&key).await?;
        }
    }

    Ok(())
}

/// Log reconcile events until every reconciler is dropped
async fn log_events(mut events: mpsc::Receiver<ReconcileEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ReconcileEvent::StateChanged { resource, from, to } => {
                info!("{}: {} -> {}", resource, from, to);
            }
            ReconcileEvent::PollObserved {
                resource,
                status,
                attempt,
            } => {
                debug!("{}: provisioning state {} (poll {})", resource, status, attempt);
            }
            ReconcileEvent::SubResourceMerged {
                resource,
                kind,
                name,
            } => {
                info!("{}: merged {} {}", resource, kind, name);
            }
            ReconcileEvent::Absent { resource } => {
                warn!("{}: not found remotely", resource);
            }
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
