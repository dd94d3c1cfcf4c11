use bimcore::NodeHandler;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of node-kind handlers.
///
/// Kinds are free strings; each maps to one handler instance shared by
/// all nodes of that kind. A graph node whose kind is missing here is
/// tolerated at dispatch time (it resolves to null), so the registry
/// never needs to know the full kind vocabulary of future graphs.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn NodeHandler>>,
    info: HashMap<String, HandlerInfo>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            info: HashMap::new(),
        }
    }

    /// Register a handler under its kind tag.
    pub fn register(&mut self, handler: Arc<dyn NodeHandler>) {
        let kind = handler.kind().to_string();
        tracing::info!("Registering node kind: {}", kind);
        self.handlers.insert(kind, handler);
    }

    /// Register a handler together with descriptive metadata.
    pub fn register_with_info(&mut self, handler: Arc<dyn NodeHandler>, info: HandlerInfo) {
        self.info.insert(handler.kind().to_string(), info);
        self.register(handler);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// All registered kind tags, sorted for stable listings.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.handlers.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn info(&self, kind: &str) -> Option<&HandlerInfo> {
        self.info.get(kind)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptive metadata about a node kind, for listings and editors.
#[derive(Debug, Clone)]
pub struct HandlerInfo {
    pub description: String,
    pub category: String,
    pub inputs: Vec<PortSpec>,
}

impl Default for HandlerInfo {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            inputs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortSpec {
    pub name: String,
    pub required: bool,
}

impl PortSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bimcore::{HandlerContext, HandlerError, Value};

    struct NullHandler;

    #[async_trait]
    impl NodeHandler for NullHandler {
        fn kind(&self) -> &str {
            "nullNode"
        }

        async fn run(&self, _ctx: HandlerContext) -> Result<Value, HandlerError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn lookup_by_kind() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(NullHandler));

        assert!(registry.contains("nullNode"));
        assert!(!registry.contains("ghostNode"));
        assert!(registry.get("nullNode").is_some());
        assert!(registry.get("ghostNode").is_none());
        assert_eq!(registry.kinds(), vec!["nullNode"]);
    }

    #[test]
    fn metadata_travels_with_registration() {
        let mut registry = HandlerRegistry::new();
        registry.register_with_info(
            Arc::new(NullHandler),
            HandlerInfo {
                description: "does nothing".to_string(),
                category: "debug".to_string(),
                inputs: vec![PortSpec::optional("input")],
            },
        );

        let info = registry.info("nullNode").unwrap();
        assert_eq!(info.category, "debug");
        assert!(!info.inputs[0].required);
    }
}
