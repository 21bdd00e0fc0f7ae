use crate::{registry::NodeRegistry, WorkflowExecutor};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use vizcore::{
    EngineError, EventChannel, EventStream, ExecutionEvent, ExecutionGraph, ExecutionResult, RunId,
    WorkflowStructure,
};

/// Where a submitted run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Submitted, waiting for its first subscriber
    Pending,
    Running,
    Finished,
}

enum RunSlot {
    Pending {
        graph: Arc<ExecutionGraph>,
        submitted_at: Instant,
    },
    Running(EventChannel),
    Finished {
        result: Arc<ExecutionResult>,
        history: Vec<ExecutionEvent>,
        finished_at: Instant,
    },
}

impl RunSlot {
    fn state(&self) -> RunState {
        match self {
            RunSlot::Pending { .. } => RunState::Pending,
            RunSlot::Running(_) => RunState::Running,
            RunSlot::Finished { .. } => RunState::Finished,
        }
    }

    /// When the retention clock started; running runs never expire
    fn idle_since(&self) -> Option<Instant> {
        match self {
            RunSlot::Pending { submitted_at, .. } => Some(*submitted_at),
            RunSlot::Running(_) => None,
            RunSlot::Finished { finished_at, .. } => Some(*finished_at),
        }
    }
}

/// Drop runs idle for longer than the retention window, then the oldest
/// finished runs beyond the configured cap.
fn prune(runs: &mut HashMap<RunId, RunSlot>, config: &RuntimeConfig) {
    let now = Instant::now();
    if let Some(retention) = config.run_retention {
        runs.retain(|run_id, slot| match slot.idle_since() {
            Some(since) if now.duration_since(since) > retention => {
                tracing::debug!("Expiring {:?} run {}", slot.state(), run_id);
                false
            }
            _ => true,
        });
    }

    let mut finished: Vec<(Instant, RunId)> = runs
        .iter()
        .filter_map(|(run_id, slot)| match slot {
            RunSlot::Finished { finished_at, .. } => Some((*finished_at, *run_id)),
            _ => None,
        })
        .collect();
    if finished.len() > config.max_finished_runs {
        finished.sort();
        let excess = finished.len() - config.max_finished_runs;
        for (_, run_id) in finished.into_iter().take(excess) {
            tracing::debug!("Evicting finished run {}", run_id);
            runs.remove(&run_id);
        }
    }
}

/// Main runtime: owns the registry and a store of submitted runs keyed by
/// run id.
#[derive(Clone)]
pub struct VizRuntime {
    registry: Arc<NodeRegistry>,
    executor: Arc<WorkflowExecutor>,
    config: RuntimeConfig,
    runs: Arc<RwLock<HashMap<RunId, RunSlot>>>,
}

impl VizRuntime {
    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            executor: Arc::new(WorkflowExecutor::new()),
            config,
            runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// A fresh event channel sized by the runtime configuration
    pub fn new_channel(&self) -> EventChannel {
        EventChannel::new().with_history(self.config.event_history)
    }

    /// Validate a submitted workflow and park it until someone subscribes
    pub async fn submit(&self, structure: WorkflowStructure) -> Result<RunId, EngineError> {
        let graph = ExecutionGraph::from_structure(structure)?;
        Ok(self.submit_graph(graph).await)
    }

    pub async fn submit_graph(&self, graph: ExecutionGraph) -> RunId {
        let run_id = RunId::new_v4();
        tracing::info!("Workflow submitted as run {} ({} nodes)", run_id, graph.node_count());
        let mut runs = self.runs.write().await;
        prune(&mut runs, &self.config);
        runs.insert(
            run_id,
            RunSlot::Pending {
                graph: Arc::new(graph),
                submitted_at: Instant::now(),
            },
        );
        run_id
    }

    /// Attach to a run's events.
    ///
    /// The first subscription to a pending run starts it, so that
    /// subscriber observes every event. Subscribing to a running run joins
    /// it mid-stream; subscribing to a finished run yields the retained
    /// history, if any.
    pub async fn subscribe(&self, run_id: RunId) -> Result<EventStream, EngineError> {
        let mut runs = self.runs.write().await;
        let slot = runs
            .get(&run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;

        let graph = match slot {
            RunSlot::Running(channel) => return Ok(channel.subscribe_until_terminal()),
            RunSlot::Finished { history, .. } => {
                return Ok(stream::iter(history.clone()).boxed());
            }
            RunSlot::Pending { graph, .. } => graph.clone(),
        };

        let channel = self.new_channel();
        let events = channel.subscribe_until_terminal();
        runs.insert(run_id, RunSlot::Running(channel.clone()));
        drop(runs);

        self.spawn_run(run_id, graph, channel);
        Ok(events)
    }

    fn spawn_run(&self, run_id: RunId, graph: Arc<ExecutionGraph>, channel: EventChannel) {
        let registry = self.registry.clone();
        let executor = self.executor.clone();
        let runs = self.runs.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            let result = executor
                .execute_run(run_id, &graph, &registry, &channel)
                .await;
            let history = channel.history();
            let mut runs = runs.write().await;
            runs.insert(
                run_id,
                RunSlot::Finished {
                    result: Arc::new(result),
                    history,
                    finished_at: Instant::now(),
                },
            );
            prune(&mut runs, &config);
        });
    }

    /// Execute a graph directly and wait for the result
    pub async fn execute(&self, graph: &ExecutionGraph, events: &EventChannel) -> ExecutionResult {
        self.executor.execute(graph, &self.registry, events).await
    }

    pub async fn state(&self, run_id: RunId) -> Option<RunState> {
        self.runs.read().await.get(&run_id).map(RunSlot::state)
    }

    /// Result of a finished run. `Ok(None)` while it is pending or running.
    pub async fn result(&self, run_id: RunId) -> Result<Option<Arc<ExecutionResult>>, EngineError> {
        match self.runs.read().await.get(&run_id) {
            None => Err(EngineError::RunNotFound(run_id.to_string())),
            Some(RunSlot::Finished { result, .. }) => Ok(Some(result.clone())),
            Some(_) => Ok(None),
        }
    }

    /// Drop a run from the store. Running runs cannot be forgotten.
    pub async fn forget(&self, run_id: RunId) -> Result<(), EngineError> {
        let mut runs = self.runs.write().await;
        match runs.get(&run_id) {
            None => Err(EngineError::RunNotFound(run_id.to_string())),
            Some(RunSlot::Running(_)) => Err(EngineError::RunAlreadyStarted(run_id.to_string())),
            Some(_) => {
                runs.remove(&run_id);
                Ok(())
            }
        }
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Events retained per run for late subscribers; 0 disables replay
    pub event_history: usize,
    /// Finished runs kept for result lookups; the oldest go first
    pub max_finished_runs: usize,
    /// How long a pending or finished run is kept; `None` keeps them until
    /// evicted by `max_finished_runs` or forgotten
    pub run_retention: Option<Duration>,
}

impl RuntimeConfig {
    /// Defaults overridden by `VIZFLOW_EVENT_HISTORY`,
    /// `VIZFLOW_MAX_FINISHED_RUNS` and `VIZFLOW_RUN_RETENTION_SECS`
    /// (0 disables expiry)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(history) = env_usize("VIZFLOW_EVENT_HISTORY") {
            config.event_history = history;
        }
        if let Some(max) = env_usize("VIZFLOW_MAX_FINISHED_RUNS") {
            config.max_finished_runs = max;
        }
        if let Some(secs) = env_usize("VIZFLOW_RUN_RETENTION_SECS") {
            config.run_retention = (secs > 0).then(|| Duration::from_secs(secs as u64));
        }
        config
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_history: 0,
            max_finished_runs: 256,
            run_retention: Some(Duration::from_secs(3600)),
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a number", name, raw);
            None
        }
    }
}
