use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Node, SourceLocation};

/// An absolute shape id: `namespace#name`, optionally `namespace#name$member`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ShapeId {
    pub namespace: String,
    pub name: String,
    pub member: Option<String>,
}

impl ShapeId {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            member: None,
        }
    }

    #[must_use]
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    /// The id without its member part.
    #[must_use]
    pub fn without_member(&self) -> ShapeId {
        ShapeId::new(self.namespace.clone(), self.name.clone())
    }
}

impl FromStr for ShapeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, rest) = s
            .split_once('#')
            .ok_or_else(|| Error::InvalidShapeId(s.to_string()))?;
        if namespace.is_empty() || rest.is_empty() {
            return Err(Error::InvalidShapeId(s.to_string()));
        }
        let (name, member) = match rest.split_once('$') {
            Some((name, member)) if !name.is_empty() && !member.is_empty() => {
                (name, Some(member.to_string()))
            }
            Some(_) => return Err(Error::InvalidShapeId(s.to_string())),
            None => (rest, None),
        };
        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            member,
        })
    }
}

impl std::fmt::Display for ShapeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.namespace, self.name)?;
        if let Some(member) = &self.member {
            write!(f, "${member}")?;
        }
        Ok(())
    }
}

/// The kind of a shape statement.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeType {
    Blob,
    Boolean,
    String,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
    Timestamp,
    Document,
    Enum,
    IntEnum,
    List,
    Map,
    Structure,
    Union,
    Service,
    Operation,
    Resource,
}

impl ShapeType {
    /// Parse an IDL shape statement keyword.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "blob" => Self::Blob,
            "boolean" => Self::Boolean,
            "string" => Self::String,
            "byte" => Self::Byte,
            "short" => Self::Short,
            "integer" => Self::Integer,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "bigInteger" => Self::BigInteger,
            "bigDecimal" => Self::BigDecimal,
            "timestamp" => Self::Timestamp,
            "document" => Self::Document,
            "enum" => Self::Enum,
            "intEnum" => Self::IntEnum,
            "list" => Self::List,
            "map" => Self::Map,
            "structure" => Self::Structure,
            "union" => Self::Union,
            "service" => Self::Service,
            "operation" => Self::Operation,
            "resource" => Self::Resource,
            _ => return None,
        })
    }

    #[must_use]
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::BigInteger => "bigInteger",
            Self::BigDecimal => "bigDecimal",
            Self::Timestamp => "timestamp",
            Self::Document => "document",
            Self::Enum => "enum",
            Self::IntEnum => "intEnum",
            Self::List => "list",
            Self::Map => "map",
            Self::Structure => "structure",
            Self::Union => "union",
            Self::Service => "service",
            Self::Operation => "operation",
            Self::Resource => "resource",
        }
    }

    /// Whether shapes of this type carry a member list in the IDL.
    #[must_use]
    pub fn has_members(&self) -> bool {
        matches!(
            self,
            Self::Enum | Self::IntEnum | Self::List | Self::Map | Self::Structure | Self::Union
        )
    }
}

impl std::fmt::Display for ShapeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A member of an aggregate shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    /// Target shape id. Best-effort when resolution failed; the resolution
    /// event carries the failure.
    pub target: ShapeId,
    pub traits: BTreeMap<ShapeId, Node>,
    pub source: SourceLocation,
}

/// An assembled shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub shape_type: ShapeType,
    pub source: SourceLocation,
    /// Trait id to merged trait value. Applied traits from other files end up
    /// here too; each value's `Node` sources tell the contributions apart.
    pub traits: BTreeMap<ShapeId, Node>,
    pub members: Vec<Member>,
}

impl Shape {
    #[must_use]
    pub fn new(id: ShapeId, shape_type: ShapeType, source: SourceLocation) -> Self {
        Self {
            id,
            shape_type,
            source,
            traits: BTreeMap::new(),
            members: Vec::new(),
        }
    }

    /// Look up a trait by its name, ignoring the namespace.
    #[must_use]
    pub fn get_trait(&self, name: &str) -> Option<&Node> {
        self.traits
            .iter()
            .find_map(|(id, node)| (id.name == name).then_some(node))
    }

    #[must_use]
    pub fn has_trait(&self, name: &str) -> bool {
        self.get_trait(name).is_some()
    }

    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_id_round_trips() {
        let id: ShapeId = "com.foo#Bar".parse().unwrap();
        assert_eq!(id.namespace, "com.foo");
        assert_eq!(id.name, "Bar");
        assert_eq!(id.to_string(), "com.foo#Bar");

        let member: ShapeId = "com.foo#Bar$baz".parse().unwrap();
        assert_eq!(member.member.as_deref(), Some("baz"));
        assert_eq!(member.without_member().to_string(), "com.foo#Bar");
    }

    #[test]
    fn shape_id_rejects_relative_ids() {
        assert!("Bar".parse::<ShapeId>().is_err());
        assert!("#Bar".parse::<ShapeId>().is_err());
        assert!("com.foo#".parse::<ShapeId>().is_err());
        assert!("com.foo#Bar$".parse::<ShapeId>().is_err());
    }

    #[test]
    fn trait_lookup_by_name() {
        let mut shape = Shape::new(
            ShapeId::new("com.foo", "Bar"),
            ShapeType::String,
            SourceLocation::NONE,
        );
        shape
            .traits
            .insert(ShapeId::new("smithy.api", "length"), Node::null());
        assert!(shape.has_trait("length"));
        assert!(!shape.has_trait("pattern"));
    }
}
