//! Policy and boundary payloads, the two consumers of [`RuleGroup`]

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::rules::RuleGroup;
use crate::errors::{ArmisError, Result};

/// Action attached to a policy (alert, tag, ...). `params` is passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyAction {
    /// Wire name `type`
    #[serde(rename = "type")]
    pub action_type: String,
    /// Action-specific parameters, opaque to the client
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

/// Writable fields of a policy (request body of create/update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySettings {
    /// Display name, must not be blank
    pub name: String,
    /// Optional, sent as `""` when empty
    #[serde(default)]
    pub description: String,
    /// Disabled policies are stored but never evaluated
    #[serde(default)]
    pub is_enabled: bool,
    /// Rule domain, e.g. `DEVICE` or `ACTIVITY`
    pub rule_type: String,
    /// Free-form labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// MITRE ATT&CK technique labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mitre_attack_labels: Vec<String>,
    /// Tags applied to matching devices
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// What happens on a match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<PolicyAction>,
    /// Match condition; at least one leaf
    pub rules: RuleGroup,
}

impl PolicySettings {
    /// Checks performed before any request is built.
    ///
    /// # Errors
    /// [`ArmisError::Validation`] for a blank name or rule type, or an empty
    /// rule tree.
    pub fn validate(&self) -> Result<()> {
        require_non_blank("policy name", &self.name)?;
        require_non_blank("policy rule type", &self.rule_type)?;
        self.rules.validate()
    }
}

/// Policy as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Server-assigned identifier, stringified when numeric
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    /// Writable fields, flattened into the same object
    #[serde(flatten)]
    pub settings: PolicySettings,
}

/// Writable fields of a boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundarySettings {
    /// Display name, must not be blank
    pub name: String,
    /// Sites the boundary applies to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_sites: Vec<String>,
    /// Membership condition, wire name `rule_aql`
    pub rule_aql: RuleGroup,
}

impl BoundarySettings {
    /// # Errors
    /// [`ArmisError::Validation`] for a blank name or an empty rule tree.
    pub fn validate(&self) -> Result<()> {
        require_non_blank("boundary name", &self.name)?;
        self.rule_aql.validate()
    }
}

/// Boundary as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// Server-assigned identifier
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    /// See [`BoundarySettings`]
    #[serde(flatten)]
    pub settings: BoundarySettings,
}

/// `data` of a create response; only the identifier is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResource {
    /// Identifier of the new resource
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ArmisError::Validation(format!("{field} required")));
    }
    Ok(())
}

/// Identifiers are numeric for some resources and strings for others.
fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!("unsupported id value: {other}"))),
    }
}
