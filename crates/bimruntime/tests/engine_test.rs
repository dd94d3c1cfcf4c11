use async_trait::async_trait;
use bimcore::{
    port, EngineError, EventBus, Graph, GraphError, HandlerContext, HandlerError, NodeHandler,
    NodeSpec, RunEvent, Value,
};
use bimruntime::{GraphExecutor, HandlerRegistry};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Records the order handlers were invoked in; result is the node id.
struct TraceHandler {
    kind: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl NodeHandler for TraceHandler {
    fn kind(&self) -> &str {
        self.kind
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        self.log.lock().unwrap().push(ctx.node_id.clone());
        Ok(Value::String(ctx.node_id))
    }
}

/// Result is an object mirroring the resolved input bag.
struct EchoHandler;

#[async_trait]
impl NodeHandler for EchoHandler {
    fn kind(&self) -> &str {
        "echo"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        Ok(Value::Object(ctx.inputs))
    }
}

struct FailHandler;

#[async_trait]
impl NodeHandler for FailHandler {
    fn kind(&self) -> &str {
        "boom"
    }

    async fn run(&self, _ctx: HandlerContext) -> Result<Value, HandlerError> {
        Err(HandlerError::ExecutionFailed("boom".to_string()))
    }
}

/// Signals `started`, then blocks until `gate` receives a permit.
struct GateHandler {
    started: Arc<Semaphore>,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl NodeHandler for GateHandler {
    fn kind(&self) -> &str {
        "gate"
    }

    async fn run(&self, _ctx: HandlerContext) -> Result<Value, HandlerError> {
        self.started.add_permits(1);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| HandlerError::ExecutionFailed(e.to_string()))?;
        permit.forget();
        Ok(Value::Bool(true))
    }
}

struct ProgressHandler;

#[async_trait]
impl NodeHandler for ProgressHandler {
    fn kind(&self) -> &str {
        "progress"
    }

    async fn run(&self, ctx: HandlerContext) -> Result<Value, HandlerError> {
        ctx.sink.progress(50.0, "halfway");
        Ok(Value::Null)
    }
}

fn trace_registry(kind: &'static str, log: &Arc<Mutex<Vec<String>>>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(TraceHandler {
        kind,
        log: log.clone(),
    }));
    registry
}

fn executor(registry: HandlerRegistry) -> GraphExecutor {
    GraphExecutor::new(Arc::new(registry))
}

fn graph_of(kind: &str, nodes: &[&str], edges: &[(&str, &str, &str)]) -> Graph {
    let mut graph = Graph::new("test");
    for id in nodes {
        graph.add_node(NodeSpec::new(*id, kind));
    }
    for (from, to, target_port) in edges {
        graph.connect(*from, port::OUTPUT, *to, *target_port);
    }
    graph
}

fn position(log: &[String], id: &str) -> usize {
    log.iter().position(|n| n == id).unwrap()
}

#[tokio::test]
async fn producers_run_before_consumers() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let executor = executor(trace_registry("step", &log));
    let bus = EventBus::new(64);

    let edges = [
        ("a", "b", "input"),
        ("a", "c", "input"),
        ("b", "d", "input"),
        ("c", "d", "reference"),
        ("d", "e", "input"),
    ];
    let graph = graph_of("step", &["e", "d", "c", "b", "a"], &edges);

    let outcome = executor.execute(&graph, &bus).await.unwrap();
    assert_eq!(outcome.completed_nodes, 5);

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 5);
    for (u, v, _) in edges {
        assert!(
            position(&log, u) < position(&log, v),
            "{} must run before {}",
            u,
            v
        );
    }
}

#[tokio::test]
async fn cyclic_graph_runs_no_handler() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let executor = executor(trace_registry("step", &log));
    let bus = EventBus::new(64);

    let graph = graph_of(
        "step",
        &["a", "b"],
        &[("a", "b", "input"), ("b", "a", "input")],
    );

    let err = executor.execute(&graph, &bus).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Graph(GraphError::CyclicGraph)
    ));
    assert!(log.lock().unwrap().is_empty(), "no handler may run");
}

#[tokio::test]
async fn fan_out_evaluates_producer_once() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let executor = executor(trace_registry("step", &log));
    let bus = EventBus::new(64);

    let graph = graph_of(
        "step",
        &["p", "c1", "c2"],
        &[("p", "c1", "input"), ("p", "c2", "input")],
    );

    executor.execute(&graph, &bus).await.unwrap();

    let invocations = log
        .lock()
        .unwrap()
        .iter()
        .filter(|id| id.as_str() == "p")
        .count();
    assert_eq!(invocations, 1);
}

#[tokio::test]
async fn second_execute_is_rejected_while_running() {
    let started = Arc::new(Semaphore::new(0));
    let gate = Arc::new(Semaphore::new(0));

    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(GateHandler {
        started: started.clone(),
        gate: gate.clone(),
    }));
    let executor = Arc::new(GraphExecutor::new(Arc::new(registry)));
    let bus = Arc::new(EventBus::new(64));

    let graph = Arc::new(graph_of("gate", &["a"], &[]));

    let first = tokio::spawn({
        let executor = executor.clone();
        let bus = bus.clone();
        let graph = graph.clone();
        async move { executor.execute(&graph, &bus).await }
    });

    // Wait until the first run is inside its handler.
    let permit = started.acquire().await.unwrap();
    permit.forget();

    let err = executor.execute(&graph, &bus).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyRunning));

    gate.add_permits(1);
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.result("a"), Some(&Value::Bool(true)));
}

#[tokio::test]
async fn target_ports_route_into_named_slots() {
    let mut registry = HandlerRegistry::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    registry.register(Arc::new(TraceHandler {
        kind: "step",
        log: log.clone(),
    }));
    registry.register(Arc::new(EchoHandler));
    let executor = executor(registry);
    let bus = EventBus::new(64);

    let mut graph = Graph::new("test");
    graph.add_node(NodeSpec::new("b", "step"));
    graph.add_node(NodeSpec::new("c", "step"));
    graph.add_node(NodeSpec::new("d", "echo"));
    graph.connect("b", port::OUTPUT, "d", port::INPUT);
    graph.connect("c", port::OUTPUT, "d", port::REFERENCE);

    let outcome = executor.execute(&graph, &bus).await.unwrap();

    let mut expected = HashMap::new();
    expected.insert("input".to_string(), Value::String("b".to_string()));
    expected.insert("reference".to_string(), Value::String("c".to_string()));
    assert_eq!(outcome.result("d"), Some(&Value::Object(expected)));
}

#[tokio::test]
async fn omitted_target_port_defaults_to_input() {
    let json = r#"{
        "name": "default-port",
        "nodes": [
            {"id": "a", "kind": "step"},
            {"id": "b", "kind": "echo"}
        ],
        "edges": [
            {"source": "a", "target": "b"}
        ]
    }"#;
    let graph: Graph = serde_json::from_str(json).unwrap();

    let mut registry = HandlerRegistry::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    registry.register(Arc::new(TraceHandler {
        kind: "step",
        log,
    }));
    registry.register(Arc::new(EchoHandler));
    let executor = executor(registry);
    let bus = EventBus::new(64);

    let outcome = executor.execute(&graph, &bus).await.unwrap();
    let Some(Value::Object(inputs)) = outcome.result("b") else {
        panic!("expected echoed input bag");
    };
    assert_eq!(inputs.get("input"), Some(&Value::String("a".to_string())));
}

#[tokio::test]
async fn unknown_kind_resolves_to_null_and_run_continues() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(EchoHandler));
    let executor = executor(registry);
    let bus = EventBus::new(64);

    let mut graph = Graph::new("test");
    graph.add_node(NodeSpec::new("mystery", "futureNode"));
    graph.add_node(NodeSpec::new("sink", "echo"));
    graph.connect("mystery", port::OUTPUT, "sink", port::INPUT);

    let outcome = executor.execute(&graph, &bus).await.unwrap();
    assert_eq!(outcome.result("mystery"), Some(&Value::Null));

    let Some(Value::Object(inputs)) = outcome.result("sink") else {
        panic!("expected echoed input bag");
    };
    assert_eq!(inputs.get("input"), Some(&Value::Null));
}

#[tokio::test]
async fn handler_failure_aborts_run_and_skips_downstream() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(TraceHandler {
        kind: "step",
        log: log.clone(),
    }));
    registry.register(Arc::new(FailHandler));
    let executor = executor(registry);
    let bus = EventBus::new(64);

    let mut graph = Graph::new("test");
    graph.add_node(NodeSpec::new("a", "step"));
    graph.add_node(NodeSpec::new("x", "boom"));
    graph.add_node(NodeSpec::new("z", "step"));
    graph.connect("a", port::OUTPUT, "x", port::INPUT);
    graph.connect("x", port::OUTPUT, "z", port::INPUT);

    let err = executor.execute(&graph, &bus).await.unwrap_err();
    match err {
        EngineError::NodeFailed { node_id, .. } => assert_eq!(node_id, "x"),
        other => panic!("unexpected error: {:?}", other),
    }

    let log = log.lock().unwrap();
    assert_eq!(*log, vec!["a".to_string()], "z must never run");
}

#[tokio::test]
async fn fan_in_on_one_port_keeps_last_declared_edge() {
    let mut registry = HandlerRegistry::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    registry.register(Arc::new(TraceHandler {
        kind: "step",
        log,
    }));
    registry.register(Arc::new(EchoHandler));
    let executor = executor(registry);
    let bus = EventBus::new(64);

    let mut graph = Graph::new("test");
    graph.add_node(NodeSpec::new("first", "step"));
    graph.add_node(NodeSpec::new("second", "step"));
    graph.add_node(NodeSpec::new("sink", "echo"));
    graph.connect("first", port::OUTPUT, "sink", port::INPUT);
    graph.connect("second", port::OUTPUT, "sink", port::INPUT);

    let outcome = executor.execute(&graph, &bus).await.unwrap();
    let Some(Value::Object(inputs)) = outcome.result("sink") else {
        panic!("expected echoed input bag");
    };
    assert_eq!(
        inputs.get("input"),
        Some(&Value::String("second".to_string()))
    );
}

#[tokio::test]
async fn stop_prevents_dispatch_of_unstarted_nodes() {
    let started = Arc::new(Semaphore::new(0));
    let gate = Arc::new(Semaphore::new(0));
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(GateHandler {
        started: started.clone(),
        gate: gate.clone(),
    }));
    registry.register(Arc::new(TraceHandler {
        kind: "step",
        log: log.clone(),
    }));
    let executor = Arc::new(GraphExecutor::new(Arc::new(registry)));
    let bus = Arc::new(EventBus::new(64));

    let mut graph = Graph::new("test");
    graph.add_node(NodeSpec::new("slow", "gate"));
    graph.add_node(NodeSpec::new("after", "step"));
    graph.connect("slow", port::OUTPUT, "after", port::INPUT);
    let graph = Arc::new(graph);

    let run = tokio::spawn({
        let executor = executor.clone();
        let bus = bus.clone();
        let graph = graph.clone();
        async move { executor.execute(&graph, &bus).await }
    });

    let permit = started.acquire().await.unwrap();
    permit.forget();

    // Cancel while "slow" is in flight; the handler itself ignores the
    // token, so it still finishes, but "after" must not be dispatched.
    executor.stop();
    gate.add_permits(1);

    let err = run.await.unwrap().unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    assert!(log.lock().unwrap().is_empty());
    assert!(!executor.is_running());
}

#[tokio::test]
async fn run_emits_lifecycle_and_progress_events() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(ProgressHandler));
    let executor = executor(registry);
    let bus = EventBus::new(64);
    let mut events = bus.subscribe();

    let mut graph = Graph::new("evented");
    graph.add_node(NodeSpec::new("p", "progress"));

    executor.execute(&graph, &bus).await.unwrap();

    let mut saw_progress = false;
    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            RunEvent::RunStarted { .. } => kinds.push("runStarted"),
            RunEvent::NodeStarted { .. } => kinds.push("nodeStarted"),
            RunEvent::NodeStatus { node_id, patch, .. } => {
                assert_eq!(node_id, "p");
                assert_eq!(patch.progress_percentage, Some(50.0));
                assert_eq!(patch.progress_message.as_deref(), Some("halfway"));
                saw_progress = true;
            }
            RunEvent::NodeCompleted { .. } => kinds.push("nodeCompleted"),
            RunEvent::RunCompleted { success, .. } => {
                assert!(success);
                kinds.push("runCompleted");
            }
            RunEvent::NodeFailed { .. } => panic!("no failure expected"),
        }
    }
    assert!(saw_progress);
    assert_eq!(
        kinds,
        vec!["runStarted", "nodeStarted", "nodeCompleted", "runCompleted"]
    );
}

#[tokio::test]
async fn runs_do_not_share_caches() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let executor = executor(trace_registry("step", &log));
    let bus = EventBus::new(64);

    let graph = graph_of("step", &["a", "b"], &[("a", "b", "input")]);

    executor.execute(&graph, &bus).await.unwrap();
    executor.execute(&graph, &bus).await.unwrap();

    // Each run evaluates every node again.
    assert_eq!(log.lock().unwrap().len(), 4);
}
