//! Hook registration port
//!
//! An external hook manager dispatches raw JSON payloads to named handlers.
//! The pipeline registers its handlers through this port.

use serde_json::Value;
use std::sync::Arc;

/// Handler for one hook event.
///
/// Payloads come straight from the hook manager and may be null or
/// malformed; handlers validate them and never fail the caller.
pub trait HookHandler: Send + Sync {
    /// Handle a payload, returning an optional JSON reply.
    fn handle(&self, payload: &Value) -> Option<Value>;
}

/// Registry the hook manager exposes to integrations.
pub trait HookRegistry: Send + Sync {
    fn register(&self, name: &str, handler: Arc<dyn HookHandler>);
}

/// In-process registry that dispatches by name.
#[derive(Default)]
pub struct LocalHookRegistry {
    handlers: std::sync::RwLock<std::collections::HashMap<String, Arc<dyn HookHandler>>>,
}

impl LocalHookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Dispatch a payload; `None` if no handler is registered under `name`.
    pub fn dispatch(&self, name: &str, payload: &Value) -> Option<Value> {
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()?;
        handler.handle(payload)
    }
}

impl HookRegistry for LocalHookRegistry {
    fn register(&self, name: &str, handler: Arc<dyn HookHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), handler);
    }
}
