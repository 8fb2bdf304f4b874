use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use weft_core::error::{Result, WeftError};
use weft_core::traits::Unit;

/// Registry of available units, keyed by `agent_id` / `tool_id`.
pub struct UnitRegistry {
    units: HashMap<String, Arc<dyn Unit>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
        }
    }

    /// Register a unit.
    pub fn register(&mut self, unit: impl Unit) {
        let id = unit.id().to_string();
        self.units.insert(id, Arc::new(unit));
    }

    /// Get a unit by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Unit>> {
        self.units.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    /// All registered unit ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.units.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Execute a unit by id, enforcing its timeout.
    ///
    /// A unit that overruns its own `timeout_secs` counts as failed,
    /// exactly like a unit that returns an error.
    pub async fn execute(&self, id: &str, inputs: Value, config: Value) -> Result<Value> {
        let unit = self
            .get(id)
            .ok_or_else(|| WeftError::UnitNotFound(id.to_string()))?;

        let timeout = std::time::Duration::from_secs(unit.timeout_secs());

        match tokio::time::timeout(timeout, unit.execute(inputs, config)).await {
            Ok(result) => result,
            Err(_) => Err(WeftError::UnitTimeout {
                unit: id.to_string(),
                timeout_secs: unit.timeout_secs(),
            }),
        }
    }

    /// Create a registry with all built-in action units registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(crate::builtin::buttons::ApprovalButtonsUnit);
        registry.register(crate::builtin::webhook::WebhookUnit::new());
        registry
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}
