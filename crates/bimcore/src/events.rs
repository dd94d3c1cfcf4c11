use crate::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type RunId = Uuid;

/// Events emitted while a run executes.
///
/// This is the advisory side channel: the engine never reads any of it
/// back into the data-flow graph. Consumers are UI layers (progress
/// bars, node badges) and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum RunEvent {
    RunStarted {
        run_id: RunId,
        graph: String,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        run_id: RunId,
        node_id: NodeId,
        kind: String,
        timestamp: DateTime<Utc>,
    },
    NodeCompleted {
        run_id: RunId,
        node_id: NodeId,
        /// Shape of the cached result, e.g. "elements".
        result_type: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        run_id: RunId,
        node_id: NodeId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// A handler-authored patch of UI-facing node metadata.
    NodeStatus {
        run_id: RunId,
        node_id: NodeId,
        patch: NodeStatusPatch,
        timestamp: DateTime<Utc>,
    },
}

/// Partial update of a node's external metadata. Every field is
/// optional; absent fields leave the previous state untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatusPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loading: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-node emitter handed to handlers for progress reporting.
#[derive(Clone)]
pub struct NodeSink {
    run_id: RunId,
    node_id: NodeId,
    sender: broadcast::Sender<RunEvent>,
}

impl NodeSink {
    pub fn new(run_id: RunId, node_id: NodeId, sender: broadcast::Sender<RunEvent>) -> Self {
        Self {
            run_id,
            node_id,
            sender,
        }
    }

    /// Fire-and-forget metadata write. Dropped if nobody listens.
    pub fn report(&self, patch: NodeStatusPatch) {
        let _ = self.sender.send(RunEvent::NodeStatus {
            run_id: self.run_id,
            node_id: self.node_id.clone(),
            patch,
            timestamp: Utc::now(),
        });
    }

    pub fn progress(&self, percentage: f64, message: impl Into<String>) {
        self.report(NodeStatusPatch {
            progress_percentage: Some(percentage.clamp(0.0, 100.0)),
            progress_message: Some(message.into()),
            ..Default::default()
        });
    }

    pub fn loading(&self, loading: bool) {
        self.report(NodeStatusPatch {
            loading: Some(loading),
            ..Default::default()
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.report(NodeStatusPatch {
            loading: Some(false),
            error: Some(message.into()),
            ..Default::default()
        });
    }
}

/// Broadcast bus carrying run events to any number of subscribers.
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn node_sink(&self, run_id: RunId, node_id: NodeId) -> NodeSink {
        NodeSink::new(run_id, node_id, self.sender.clone())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}
