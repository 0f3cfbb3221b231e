use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{HolonError, Result};

/// Initiating intent record. Only `intent_id` is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDescriptor {
    /// Opaque intent identifier.
    pub intent_id: String,
    /// Remaining descriptor fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IntentDescriptor {
    /// Load a descriptor from a JSON file.
    ///
    /// A missing file, invalid JSON, or a missing, non-string or empty
    /// `intent_id` is an input error.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| HolonError::input(path, format!("cannot read intent file: {e}")))?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| HolonError::input(path, format!("invalid JSON: {e}")))?;
        Self::from_value(value).map_err(|message| HolonError::input(path, message))
    }

    fn from_value(value: Value) -> std::result::Result<Self, String> {
        let Value::Object(mut fields) = value else {
            return Err("intent descriptor must be a JSON object".to_string());
        };

        let intent_id = match fields.remove("intent_id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            Some(Value::String(_)) => return Err("intent_id is empty".to_string()),
            Some(other) => return Err(format!("intent_id must be a string, got {other}")),
            None => return Err("missing required field intent_id".to_string()),
        };

        Ok(Self {
            intent_id,
            extra: fields,
        })
    }
}

/// Candidate plan for an intent, as appended to `plans.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Owning intent.
    pub intent_id: String,
    /// Plan identifier, unique per intent.
    pub plan_id: String,
    /// Predicted likelihood of successful execution.
    pub p_success: f64,
    /// Uncertainty associated with the plan.
    pub entropy: f64,
    /// Collaborator-owned fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Plan {
    /// Build a plan with no extra fields.
    pub fn new(
        intent_id: impl Into<String>,
        plan_id: impl Into<String>,
        p_success: f64,
        entropy: f64,
    ) -> Self {
        Self {
            intent_id: intent_id.into(),
            plan_id: plan_id.into(),
            p_success,
            entropy,
            extra: Map::new(),
        }
    }

    /// Expected-value score: `p_success - entropy`.
    pub fn score(&self) -> f64 {
        self.p_success - self.entropy
    }
}
