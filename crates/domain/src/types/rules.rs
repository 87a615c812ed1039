//! Recursive AND/OR rule trees for policy and boundary conditions
//!
//! The API encodes a rule as an object carrying an `and` list, an `or` list,
//! or both. Each list element is either a plain string (an opaque AQL
//! condition) or a nested rule object:
//!
//! ```json
//! { "and": ["protocol:BMS", { "or": ["content:(iPhone)", "content:(Android)"] }] }
//! ```
//!
//! Arrays are heterogeneous, so (de)serialization switches on each element's
//! JSON kind instead of relying on a derived structural mapping. Condition
//! strings are never parsed or validated here.
//!
//! When both lists are populated on the same object, how the server combines
//! them is server-defined; the client passes both through unchanged.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::errors::{ArmisError, Result};
use crate::impl_wire_enum_conversions;

/// Boolean operator of a rule list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Every child must match
    And,
    /// At least one child must match
    Or,
}

impl_wire_enum_conversions!(Operator {
    And => "and",
    Or => "or",
});

/// A single element of a rule list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleNode {
    /// Opaque AQL condition fragment, transmitted verbatim.
    Leaf(String),
    /// Nested rule object.
    Group(RuleGroup),
}

impl RuleNode {
    /// Convenience constructor for a condition leaf.
    pub fn leaf(expression: impl Into<String>) -> Self {
        Self::Leaf(expression.into())
    }

    /// Encode as a JSON string (leaf) or nested object (group).
    pub fn encode(&self) -> Value {
        match self {
            Self::Leaf(expression) => Value::String(expression.clone()),
            Self::Group(group) => group.encode(),
        }
    }

    /// Decode one list element by peeking at its JSON kind.
    ///
    /// # Errors
    /// [`ArmisError::Decode`] for anything other than a string or an object.
    pub fn decode(value: &Value) -> Result<Self> {
        match value {
            Value::String(expression) => Ok(Self::Leaf(expression.clone())),
            Value::Object(_) => RuleGroup::decode(value).map(Self::Group),
            other => Err(ArmisError::Decode(format!(
                "unsupported rule element type: {}",
                json_kind(other)
            ))),
        }
    }
}

impl From<RuleGroup> for RuleNode {
    fn from(group: RuleGroup) -> Self {
        Self::Group(group)
    }
}

impl From<&str> for RuleNode {
    fn from(expression: &str) -> Self {
        Self::Leaf(expression.to_string())
    }
}

impl From<String> for RuleNode {
    fn from(expression: String) -> Self {
        Self::Leaf(expression)
    }
}

/// A rule object with independent `and` and `or` lists
///
/// Decoding is lenient: an object with neither list, or with both empty, is
/// accepted as an empty group because it comes from the server. Outbound
/// rules are built with [`RuleGroup::new`] (or checked with
/// [`RuleGroup::validate`]), which rejects the empty case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleGroup {
    /// Children joined by AND, wire key `and`
    pub and: Vec<RuleNode>,
    /// Children joined by OR, wire key `or`
    pub or: Vec<RuleNode>,
}

impl RuleGroup {
    /// Build a top-level rule for an outbound request.
    ///
    /// # Errors
    /// [`ArmisError::Validation`] when both lists are empty.
    pub fn new(and: Vec<RuleNode>, or: Vec<RuleNode>) -> Result<Self> {
        let group = Self { and, or };
        group.validate()?;
        Ok(group)
    }

    /// AND group (`{"and": [...]}`).
    pub fn all<I, N>(children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<RuleNode>,
    {
        Self { and: children.into_iter().map(Into::into).collect(), or: Vec::new() }
    }

    /// OR group (`{"or": [...]}`).
    pub fn any<I, N>(children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<RuleNode>,
    {
        Self { and: Vec::new(), or: children.into_iter().map(Into::into).collect() }
    }

    /// Group with a single populated list.
    pub fn with_operator<I, N>(operator: Operator, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<RuleNode>,
    {
        match operator {
            Operator::And => Self::all(children),
            Operator::Or => Self::any(children),
        }
    }

    /// Append a child to the list selected by `operator`.
    pub fn push(&mut self, operator: Operator, node: impl Into<RuleNode>) {
        self.children_mut(operator).push(node.into());
    }

    /// The list selected by `operator`.
    pub fn children(&self, operator: Operator) -> &[RuleNode] {
        match operator {
            Operator::And => &self.and,
            Operator::Or => &self.or,
        }
    }

    fn children_mut(&mut self, operator: Operator) -> &mut Vec<RuleNode> {
        match operator {
            Operator::And => &mut self.and,
            Operator::Or => &mut self.or,
        }
    }

    /// The operator when exactly one list is populated.
    pub fn operator(&self) -> Option<Operator> {
        match (self.and.is_empty(), self.or.is_empty()) {
            (false, true) => Some(Operator::And),
            (true, false) => Some(Operator::Or),
            _ => None,
        }
    }

    /// True when neither list has children.
    pub fn is_empty(&self) -> bool {
        self.and.is_empty() && self.or.is_empty()
    }

    /// Reject a rule with no conditions before it is sent anywhere.
    ///
    /// Only the top level is checked; nested groups are passed through.
    ///
    /// # Errors
    /// [`ArmisError::Validation`] when both lists are empty.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ArmisError::Validation(
                "rule must contain at least one \"and\" or \"or\" condition".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of condition leaves in the whole tree.
    pub fn leaf_count(&self) -> usize {
        self.and
            .iter()
            .chain(self.or.iter())
            .map(|node| match node {
                RuleNode::Leaf(_) => 1,
                RuleNode::Group(group) => group.leaf_count(),
            })
            .sum()
    }

    /// Nesting depth; a group holding only leaves has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .and
            .iter()
            .chain(self.or.iter())
            .filter_map(|node| match node {
                RuleNode::Group(group) => Some(group.depth()),
                RuleNode::Leaf(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Encode to the wire shape. Empty lists are omitted.
    pub fn encode(&self) -> Value {
        let mut object = Map::new();
        for operator in [Operator::And, Operator::Or] {
            let children = self.children(operator);
            if !children.is_empty() {
                object.insert(
                    operator.as_str().to_string(),
                    Value::Array(children.iter().map(RuleNode::encode).collect()),
                );
            }
        }
        Value::Object(object)
    }

    /// Decode a rule object, recursing into nested objects.
    ///
    /// Missing or `null` lists decode as empty. Keys other than `and`/`or`
    /// are ignored.
    ///
    /// # Errors
    /// [`ArmisError::Decode`] when `value` is not an object, a list is not an
    /// array, or an element is neither a string nor an object.
    pub fn decode(value: &Value) -> Result<Self> {
        let Value::Object(object) = value else {
            return Err(ArmisError::Decode(format!(
                "rule must be a JSON object, found {}",
                json_kind(value)
            )));
        };

        Ok(Self {
            and: decode_list(object, Operator::And)?,
            or: decode_list(object, Operator::Or)?,
        })
    }
}

fn decode_list(object: &Map<String, Value>, operator: Operator) -> Result<Vec<RuleNode>> {
    match object.get(operator.as_str()) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(RuleNode::decode).collect(),
        Some(other) => Err(ArmisError::Decode(format!(
            "rule \"{}\" list must be an array, found {}",
            operator,
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Serialize for RuleGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.encode().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RuleGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::decode(&value).map_err(D::Error::custom)
    }
}

impl Serialize for RuleNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Leaf(expression) => serializer.serialize_str(expression),
            Self::Group(group) => group.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RuleNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::decode(&value).map_err(D::Error::custom)
    }
}
