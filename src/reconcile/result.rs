//! Action record and module result document

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Append-only list of state-changing operations performed in one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionRecord {
    entries: Vec<String>,
}

impl ActionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: impl Into<String>) {
        let action = action.into();
        tracing::info!("{}", action);
        self.entries.push(action);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Output of one module invocation: `changed`, `actions` and named payloads
#[derive(Debug, Clone, Default)]
pub struct ModuleResult {
    pub actions: ActionRecord,
    payload: Map<String, Value>,
}

impl ModuleResult {
    /// Create a result whose payload fields start out as `null`
    pub fn with_fields(fields: &[&str]) -> Self {
        Self {
            actions: ActionRecord::new(),
            payload: fields.iter().map(|f| (f.to_string(), Value::Null)).collect(),
        }
    }

    /// True iff at least one action was recorded
    pub fn changed(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn register_action(&mut self, action: impl Into<String>) {
        self.actions.register(action);
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.payload.insert(field.to_string(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }

    /// Render as a JSON document
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Failure document carrying whatever actions completed before the error
    pub fn to_failure(&self, msg: &str) -> Value {
        serde_json::json!({
            "failed": true,
            "changed": self.changed(),
            "actions": self.actions.entries(),
            "msg": msg,
        })
    }
}

impl Serialize for ModuleResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.payload.len() + 2))?;
        map.serialize_entry("changed", &self.changed())?;
        map.serialize_entry("actions", self.actions.entries())?;
        for (key, value) in &self.payload {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_changed_follows_actions() {
        let mut result = ModuleResult::with_fields(&["database"]);
        assert!(!result.changed());
        assert_eq!(
            result.to_value(),
            json!({"changed": false, "actions": [], "database": null})
        );

        result.register_action("Created database my-db");
        result.set("database", json!({"label": "my-db"}));
        assert!(result.changed());
        assert_eq!(
            result.to_value(),
            json!({
                "changed": true,
                "actions": ["Created database my-db"],
                "database": {"label": "my-db"}
            })
        );
    }

    #[test]
    fn test_failure_document_keeps_partial_actions() {
        let mut result = ModuleResult::with_fields(&[]);
        result.register_action("Created database my-db");
        let failure = result.to_failure("Timed out");
        assert_eq!(failure["failed"], true);
        assert_eq!(failure["changed"], true);
        assert_eq!(failure["actions"][0], "Created database my-db");
        assert_eq!(failure["msg"], "Timed out");
    }
}
