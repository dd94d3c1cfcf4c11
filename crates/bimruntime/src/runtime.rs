use crate::{GraphExecutor, HandlerRegistry, RunOutcome};
use bimcore::{EngineError, EventBus, Graph, GraphError, RunEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Facade owning the registry, the event bus, and a store of named
/// graphs. This is what embedders (CLI, editor backend) talk to.
pub struct PipelineRuntime {
    executor: Arc<GraphExecutor>,
    event_bus: Arc<EventBus>,
    graphs: Arc<RwLock<HashMap<String, Graph>>>,
}

impl PipelineRuntime {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(HandlerRegistry::new()), RuntimeConfig::default())
    }

    pub fn with_registry(registry: Arc<HandlerRegistry>, config: RuntimeConfig) -> Self {
        Self {
            executor: Arc::new(GraphExecutor::new(registry)),
            event_bus: Arc::new(EventBus::new(config.event_buffer_size)),
            graphs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        self.executor.registry()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<RunEvent> {
        self.event_bus.subscribe()
    }

    /// Store a graph under its name for later execution.
    pub async fn register_graph(&self, graph: Graph) {
        let mut graphs = self.graphs.write().await;
        graphs.insert(graph.name.clone(), graph);
    }

    /// Execute a previously registered graph.
    pub async fn execute_graph(&self, name: &str) -> Result<RunOutcome, EngineError> {
        let graph = {
            let graphs = self.graphs.read().await;
            graphs
                .get(name)
                .cloned()
                .ok_or_else(|| GraphError::GraphNotFound(name.to_string()))?
        };
        self.executor.execute(&graph, &self.event_bus).await
    }

    /// Execute a graph snapshot directly, without registration.
    pub async fn execute(&self, graph: &Graph) -> Result<RunOutcome, EngineError> {
        self.executor.execute(graph, &self.event_bus).await
    }

    /// Cooperative stop of the current run, if any.
    pub fn stop(&self) {
        self.executor.stop();
    }

    pub fn is_running(&self) -> bool {
        self.executor.is_running()
    }
}

impl Default for PipelineRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Runtime knobs.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
        }
    }
}
