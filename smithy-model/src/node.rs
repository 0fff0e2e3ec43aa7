use serde::{Deserialize, Serialize};

use crate::SourceLocation;

/// A JSON-like value with a source location on every node.
///
/// Trait values and metadata are represented as `Node`s. Array elements keep
/// their own locations so contributions from different files can be told
/// apart after merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub value: NodeValue,
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Node>),
    /// Key order is the order keys appeared in the source.
    Object(Vec<(String, Node)>),
}

impl Node {
    #[must_use]
    pub fn new(value: NodeValue, source: SourceLocation) -> Self {
        Self { value, source }
    }

    /// A `null` node with no source, used for traits applied without a value.
    #[must_use]
    pub fn null() -> Self {
        Self {
            value: NodeValue::Null,
            source: SourceLocation::NONE,
        }
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.value, NodeValue::Array(_))
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Node]> {
        match &self.value {
            NodeValue::Array(elements) => Some(elements),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            NodeValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self.value {
            NodeValue::Integer(n) => Some(n),
            _ => None,
        }
    }

    /// Look up a key in an object node.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        match &self.value {
            NodeValue::Object(fields) => fields
                .iter()
                .find_map(|(k, node)| (k == key).then_some(node)),
            _ => None,
        }
    }

    /// Structural equality ignoring source locations.
    #[must_use]
    pub fn value_eq(&self, other: &Node) -> bool {
        match (&self.value, &other.value) {
            (NodeValue::Array(a), NodeValue::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.value_eq(y))
            }
            (NodeValue::Object(a), NodeValue::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.value_eq(vb))
            }
            (a, b) => a == b,
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            NodeValue::Null => write!(f, "null"),
            NodeValue::Bool(b) => write!(f, "{b}"),
            NodeValue::Integer(n) => write!(f, "{n}"),
            NodeValue::Float(n) => write!(f, "{n}"),
            NodeValue::String(s) => write!(f, "{s:?}"),
            NodeValue::Array(elements) => {
                write!(f, "[")?;
                for (idx, element) in elements.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            NodeValue::Object(fields) => {
                write!(f, "{{")?;
                for (idx, (key, node)) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {node}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
