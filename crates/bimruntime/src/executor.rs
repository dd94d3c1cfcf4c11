use crate::registry::HandlerRegistry;
use crate::sorter::topo_sort;
use bimcore::{
    EngineError, EventBus, Graph, GraphError, HandlerContext, NodeId, RunEvent, RunId, Value,
};
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Executes one graph snapshot as a single, sequential, memoized run.
///
/// A run visits nodes strictly in topological order; independent
/// branches are not parallelized. Only one run may be in flight at a
/// time: a second `execute` call while running is rejected without
/// touching the run in progress. Each run gets a fresh memo cache that
/// is discarded on abort and returned to the caller on success.
pub struct GraphExecutor {
    registry: Arc<HandlerRegistry>,
    running: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl GraphExecutor {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            running: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request cooperative cancellation of the current run.
    ///
    /// No further unstarted nodes will be dispatched. A handler already
    /// awaiting I/O is not interrupted; it must poll the token from its
    /// context to stop early.
    pub fn stop(&self) {
        self.cancel.lock().expect("cancel token lock poisoned").cancel();
    }

    /// Run the graph once and return the per-node results.
    pub async fn execute(&self, graph: &Graph, bus: &EventBus) -> Result<RunOutcome, EngineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EngineError::AlreadyRunning);
        }
        let _guard = RunGuard {
            flag: &self.running,
        };

        let cancel = CancellationToken::new();
        *self.cancel.lock().expect("cancel token lock poisoned") = cancel.clone();

        let run_id = RunId::new_v4();
        let start = Instant::now();

        bus.emit(RunEvent::RunStarted {
            run_id,
            graph: graph.name.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(graph = %graph.name, %run_id, "Starting pipeline run");

        let result = self.walk(graph, bus, run_id, &cancel, start).await;

        bus.emit(RunEvent::RunCompleted {
            run_id,
            success: result.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });

        result
    }

    /// Validate, order, then visit every node. The pull-based resolver
    /// inside `run_node` may execute a predecessor ahead of this loop;
    /// the cache check makes that at-most-once either way.
    async fn walk(
        &self,
        graph: &Graph,
        bus: &EventBus,
        run_id: RunId,
        cancel: &CancellationToken,
        start: Instant,
    ) -> Result<RunOutcome, EngineError> {
        let order = topo_sort(graph)?;
        let mut cache: HashMap<NodeId, Value> = HashMap::new();

        for node_id in &order {
            if cancel.is_cancelled() {
                tracing::info!(%run_id, "Run cancelled, remaining nodes skipped");
                return Err(EngineError::Cancelled);
            }
            self.run_node(graph, node_id, &mut cache, bus, run_id, cancel)
                .await?;
        }

        let completed_nodes = cache.len();
        Ok(RunOutcome {
            run_id,
            results: cache,
            completed_nodes,
            total_nodes: graph.nodes.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Execute one node unless it is already cached this run.
    ///
    /// Inputs are pulled from the cache; a missing predecessor result
    /// triggers that node recursively within the same run. When two
    /// edges target the same port, the later-declared edge wins.
    fn run_node<'a>(
        &'a self,
        graph: &'a Graph,
        node_id: &'a str,
        cache: &'a mut HashMap<NodeId, Value>,
        bus: &'a EventBus,
        run_id: RunId,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), EngineError>> {
        async move {
            if cache.contains_key(node_id) {
                return Ok(());
            }
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            let node = graph
                .find_node(node_id)
                .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;

            let mut inputs: HashMap<String, Value> = HashMap::new();
            for edge in graph.incoming_edges(node_id) {
                if !cache.contains_key(edge.source.as_str()) {
                    self.run_node(graph, edge.source.as_str(), &mut *cache, bus, run_id, cancel)
                        .await?;
                }
                let value = cache
                    .get(edge.source.as_str())
                    .cloned()
                    .ok_or_else(|| GraphError::NodeNotFound(edge.source.clone()))?;
                inputs.insert(edge.target_port.clone(), value);
            }

            bus.emit(RunEvent::NodeStarted {
                run_id,
                node_id: node.id.clone(),
                kind: node.kind.clone(),
                timestamp: Utc::now(),
            });

            let sink = bus.node_sink(run_id, node.id.clone());
            let dispatch_start = Instant::now();

            let result = match self.registry.get(&node.kind) {
                Some(handler) => {
                    let ctx = HandlerContext {
                        node_id: node.id.clone(),
                        properties: node.properties.clone(),
                        inputs,
                        sink: sink.clone(),
                        cancellation: cancel.clone(),
                    };
                    handler.run(ctx).await
                }
                None => {
                    // Tolerated: a graph from a newer editor may carry
                    // kinds this runtime does not know.
                    tracing::warn!(
                        node = %node.id,
                        kind = %node.kind,
                        "No handler registered, node resolves to null"
                    );
                    Ok(Value::Null)
                }
            };
            let duration_ms = dispatch_start.elapsed().as_millis() as u64;

            match result {
                Ok(value) => {
                    tracing::debug!(node = %node.id, result = value.type_name(), duration_ms, "Node completed");
                    bus.emit(RunEvent::NodeCompleted {
                        run_id,
                        node_id: node.id.clone(),
                        result_type: value.type_name().to_string(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                    cache.insert(node.id.clone(), value);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(node = %node.id, error = %e, "Node failed, aborting run");
                    sink.error(e.to_string());
                    bus.emit(RunEvent::NodeFailed {
                        run_id,
                        node_id: node.id.clone(),
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    Err(EngineError::NodeFailed {
                        node_id: node.id.clone(),
                        source: e,
                    })
                }
            }
        }
        .boxed()
    }
}

/// Result of a completed run: the authoritative node id -> value map.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub results: HashMap<NodeId, Value>,
    pub completed_nodes: usize,
    pub total_nodes: usize,
    pub duration_ms: u64,
}

impl RunOutcome {
    pub fn result(&self, node_id: &str) -> Option<&Value> {
        self.results.get(node_id)
    }
}

/// Clears the running flag on every exit path of `execute`.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
