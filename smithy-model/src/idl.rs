//! Smithy IDL parser.
//!
//! Parses the statement subset the server works with: control statements,
//! metadata, `namespace`, `use`, shape statements with traits and members,
//! and `apply` statements. The grammar is implemented with the `peg` parser
//! generator and stamps a [`SourceLocation`] on every statement and node.

use crate::location::LineMap;
use crate::{Error, Node, NodeValue, ShapeId, ShapeType, SourceLocation};

/// The parse tree of one IDL file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedIdl {
    pub filename: String,
    /// `$version` control statement value, when present.
    pub version: Option<(String, SourceLocation)>,
    pub namespace: Option<(String, SourceLocation)>,
    pub uses: Vec<UseStatement>,
    pub metadata: Vec<MetadataStatement>,
    pub shapes: Vec<ShapeStatement>,
    pub applies: Vec<ApplyStatement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseStatement {
    pub target: ShapeId,
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataStatement {
    pub key: String,
    pub value: Node,
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeStatement {
    pub name: String,
    pub shape_type: ShapeType,
    pub traits: Vec<TraitApplication>,
    pub members: Vec<MemberStatement>,
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberStatement {
    pub name: String,
    /// Raw target text; resolution happens at assembly. `None` for enum
    /// members.
    pub target: Option<String>,
    pub traits: Vec<TraitApplication>,
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyStatement {
    /// Raw target text, absolute or relative, possibly with a `$member`.
    pub target: String,
    pub applied: TraitApplication,
    pub source: SourceLocation,
}

/// One `@trait` or `@trait(...)` application.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitApplication {
    /// Raw trait id text; resolution happens at assembly.
    pub name: String,
    pub value: Node,
    pub source: SourceLocation,
}

impl ParsedIdl {
    /// Parse `text` as IDL. The returned tree stamps `filename` into every
    /// source location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] with a 1-indexed position on syntax errors.
    pub fn parse(filename: &str, text: &str) -> Result<Self, Error> {
        let ctx = ParseContext {
            filename: filename.to_string(),
            lines: LineMap::new(text),
        };
        let statements = idl_parser::idl(text, &ctx).map_err(|err| Error::Parse {
            message: format!("expected {}", err.expected),
            location: SourceLocation::new(filename, err.location.line, err.location.column),
        })?;

        let mut parsed = ParsedIdl {
            filename: filename.to_string(),
            ..ParsedIdl::default()
        };
        for statement in statements {
            match statement {
                Statement::Control(name, node, source) => {
                    if name == "version" && parsed.version.is_none() {
                        if let NodeValue::String(version) = node.value {
                            parsed.version = Some((version, source));
                        }
                    }
                }
                Statement::Metadata(stmt) => parsed.metadata.push(stmt),
                Statement::Namespace(name, source) => {
                    if parsed.namespace.is_none() {
                        parsed.namespace = Some((name, source));
                    }
                }
                Statement::Use(stmt) => parsed.uses.push(stmt),
                Statement::Shape(stmt) => parsed.shapes.push(stmt),
                Statement::Apply(stmt) => parsed.applies.push(stmt),
            }
        }
        Ok(parsed)
    }

    /// The namespace of this file, when declared.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_ref().map(|(name, _)| name.as_str())
    }

    /// Absolute ids of the shapes this file defines. Empty when the file has
    /// no namespace.
    #[must_use]
    pub fn defined_shape_ids(&self) -> Vec<ShapeId> {
        let Some(namespace) = self.namespace() else {
            return Vec::new();
        };
        self.shapes
            .iter()
            .map(|shape| ShapeId::new(namespace, shape.name.clone()))
            .collect()
    }

    /// The `use` target matching a bare `name`, when one exists.
    #[must_use]
    pub fn use_target(&self, name: &str) -> Option<&ShapeId> {
        self.uses
            .iter()
            .map(|stmt| &stmt.target)
            .find(|target| target.name == name)
    }
}

enum Statement {
    Control(String, Node, SourceLocation),
    Metadata(MetadataStatement),
    Namespace(String, SourceLocation),
    Use(UseStatement),
    Shape(ShapeStatement),
    Apply(ApplyStatement),
}

struct ParseContext {
    filename: String,
    lines: LineMap,
}

impl ParseContext {
    fn locate(&self, offset: usize) -> SourceLocation {
        let (line, column) = self.lines.locate(offset);
        SourceLocation::new(self.filename.clone(), line, column)
    }
}

peg::parser! {
    grammar idl_parser(ctx: &ParseContext) for str {
        pub rule idl() -> Vec<Statement>
            = _ statements:(statement:statement() _ { statement })* ![_] { statements }

        rule statement() -> Statement
            = control() / metadata() / namespace() / use_statement() / apply() / shape()

        rule control() -> Statement
            = p:position!() "$" name:identifier() _ ":" _ value:node() {
                Statement::Control(name, value, ctx.locate(p))
            }

        rule metadata() -> Statement
            = p:position!() "metadata" wsr() key:object_key() _ "=" _ value:node() {
                Statement::Metadata(MetadataStatement { key, value, source: ctx.locate(p) })
            }

        rule namespace() -> Statement
            = p:position!() "namespace" wsr() name:namespace_name() {
                Statement::Namespace(name, ctx.locate(p))
            }

        rule use_statement() -> Statement
            = p:position!() "use" wsr() target:absolute_id() {
                Statement::Use(UseStatement { target, source: ctx.locate(p) })
            }

        rule apply() -> Statement
            = p:position!() "apply" wsr() target:id_text() _ applied:trait_application() {
                Statement::Apply(ApplyStatement { target, applied, source: ctx.locate(p) })
            }

        rule shape() -> Statement
            = traits:(t:trait_application() _ { t })*
              p:position!() shape_type:shape_type() wsr() name:identifier()
              members:shape_body(shape_type) {
                Statement::Shape(ShapeStatement {
                    name,
                    shape_type,
                    traits,
                    members,
                    source: ctx.locate(p),
                })
            }

        rule shape_type() -> ShapeType
            = keyword:$(['a'..='z'] ident_char()*) !ident_char() {?
                ShapeType::from_keyword(keyword).ok_or("shape type")
            }

        rule shape_body(shape_type: ShapeType) -> Vec<MemberStatement>
            = members:member_block() {?
                if shape_type.has_members() { Ok(members) } else { Err("simple shape") }
            }
            / object_body(shape_type)
            / { Vec::new() }

        rule member_block() -> Vec<MemberStatement>
            = _ "{" _ members:(member:member() _ { member })* "}" { members }

        rule member() -> MemberStatement
            = traits:(t:trait_application() _ { t })*
              p:position!() name:identifier() target:member_target()? _ ","? {
                MemberStatement { name, target, traits, source: ctx.locate(p) }
            }

        rule member_target() -> String
            = _ ":" _ target:id_text() { target }

        // Service closure shapes carry node-object bodies the lifecycle
        // engine does not interpret; parse and discard.
        rule object_body(shape_type: ShapeType) -> Vec<MemberStatement>
            = _ node_object() {?
                match shape_type {
                    ShapeType::Service | ShapeType::Operation | ShapeType::Resource => {
                        Ok(Vec::new())
                    }
                    _ => Err("member block"),
                }
            }

        rule trait_application() -> TraitApplication
            = p:position!() "@" name:id_text() value:trait_value()? {
                TraitApplication {
                    name,
                    value: value.unwrap_or_else(Node::null),
                    source: ctx.locate(p),
                }
            }

        rule trait_value() -> Node
            = "(" _ value:(trait_fields() / node()) _ ")" { value }
            / p:position!() "(" _ ")" {
                Node::new(NodeValue::Object(Vec::new()), ctx.locate(p))
            }

        rule trait_fields() -> Node
            = p:position!() fields:(field() ++ value_separator()) {
                Node::new(NodeValue::Object(fields), ctx.locate(p))
            }

        rule node() -> Node
            = node_object() / node_array() / node_string() / node_number()
            / node_keyword() / node_shape_ref()

        rule node_object() -> Node
            = p:position!() "{" _ fields:(field() ** value_separator()) _ "}" {
                Node::new(NodeValue::Object(fields), ctx.locate(p))
            }

        rule node_array() -> Node
            = p:position!() "[" _ elements:(node() ** value_separator()) _ "]" {
                Node::new(NodeValue::Array(elements), ctx.locate(p))
            }

        rule field() -> (String, Node)
            = key:object_key() _ ":" _ value:node() { (key, value) }

        rule node_string() -> Node
            = p:position!() value:quoted_string() {
                Node::new(NodeValue::String(value), ctx.locate(p))
            }

        rule node_number() -> Node
            = p:position!() text:$("-"? ['0'..='9']+ ("." ['0'..='9']+)? (['e' | 'E'] ['+' | '-']? ['0'..='9']+)?) {?
                let value = if text.contains(['.', 'e', 'E']) {
                    NodeValue::Float(text.parse().map_err(|_| "number")?)
                } else {
                    NodeValue::Integer(text.parse().map_err(|_| "number")?)
                };
                Ok(Node::new(value, ctx.locate(p)))
            }

        rule node_keyword() -> Node
            = p:position!() keyword:$("true" / "false" / "null") !ident_char() {
                let value = match keyword {
                    "true" => NodeValue::Bool(true),
                    "false" => NodeValue::Bool(false),
                    _ => NodeValue::Null,
                };
                Node::new(value, ctx.locate(p))
            }

        // Bare shape references inside node values (service closures).
        rule node_shape_ref() -> Node
            = p:position!() text:id_text() {
                Node::new(NodeValue::String(text), ctx.locate(p))
            }

        rule object_key() -> String
            = quoted_string() / identifier()

        rule quoted_string() -> String
            = "\"" parts:string_part()* "\"" { parts.concat() }

        rule string_part() -> String
            = chars:$([^ '"' | '\\']+) { chars.to_string() }
            / "\\" escaped:escape() { escaped }

        rule escape() -> String
            = "n" { "\n".to_string() }
            / "t" { "\t".to_string() }
            / "r" { "\r".to_string() }
            / "\"" { "\"".to_string() }
            / "\\" { "\\".to_string() }
            / "/" { "/".to_string() }

        rule identifier() -> String
            = text:$(['a'..='z' | 'A'..='Z' | '_'] ident_char()*) { text.to_string() }

        rule namespace_name() -> String
            = text:$(identifier() ++ ".") { text.to_string() }

        rule absolute_id() -> ShapeId
            = text:id_text() {? text.parse().map_err(|_| "absolute shape id") }

        // Shape-id token text: alphanumerics, `_`, `.`, `#`, `$`.
        rule id_text() -> String
            = text:$(['a'..='z' | 'A'..='Z' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '.' | '#' | '$']*) {
                text.to_string()
            }

        rule ident_char() = ['a'..='z' | 'A'..='Z' | '0'..='9' | '_']

        rule value_separator()
            = _ "," _
            / ws_char()+ _

        rule wsr() = ws_char()+ comment()? _

        rule _() = quiet!{ (ws_char()+ / comment())* }

        rule ws_char() = [' ' | '\t' | '\r' | '\n']

        rule comment() = "//" [^ '\n']*
    }
}
