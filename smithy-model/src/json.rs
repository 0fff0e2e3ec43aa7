//! JSON AST model files.
//!
//! Parses the `{"smithy": "2.0", "shapes": {...}, "metadata": {...}}` subset
//! of the JSON model format. `serde_json` carries no positions, so every
//! element is stamped with the file at line 1.

use serde_json::Value;

use crate::{Error, Member, Node, NodeValue, Shape, ShapeId, ShapeType, SourceLocation};

pub(crate) struct JsonModelFile {
    pub shapes: Vec<Shape>,
    pub metadata: Vec<(String, Node)>,
}

pub(crate) fn parse(filename: &str, text: &str) -> Result<JsonModelFile, Error> {
    let root: Value = serde_json::from_str(text)
        .map_err(|err| Error::JsonModel(filename.to_string(), err.to_string()))?;
    let source = SourceLocation::new(filename, 1, 1);

    let mut shapes = Vec::new();
    if let Some(Value::Object(entries)) = root.get("shapes") {
        for (id_text, body) in entries {
            let id: ShapeId = id_text
                .parse()
                .map_err(|_| Error::JsonModel(filename.to_string(), format!("bad shape id `{id_text}`")))?;
            shapes.push(parse_shape(filename, id, body, &source)?);
        }
    }

    let mut metadata = Vec::new();
    if let Some(Value::Object(entries)) = root.get("metadata") {
        for (key, value) in entries {
            metadata.push((key.clone(), to_node(value, &source)));
        }
    }

    Ok(JsonModelFile { shapes, metadata })
}

fn parse_shape(
    filename: &str,
    id: ShapeId,
    body: &Value,
    source: &SourceLocation,
) -> Result<Shape, Error> {
    let type_name = body
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::JsonModel(filename.to_string(), format!("shape `{id}` has no type")))?;
    let shape_type = ShapeType::from_keyword(type_name).ok_or_else(|| {
        Error::JsonModel(filename.to_string(), format!("unknown shape type `{type_name}`"))
    })?;

    let mut shape = Shape::new(id, shape_type, source.clone());

    if let Some(Value::Object(traits)) = body.get("traits") {
        for (trait_id, value) in traits {
            let trait_id: ShapeId = trait_id.parse().map_err(|_| {
                Error::JsonModel(filename.to_string(), format!("bad trait id `{trait_id}`"))
            })?;
            shape.traits.insert(trait_id, to_node(value, source));
        }
    }

    if let Some(Value::Object(members)) = body.get("members") {
        for (name, member_body) in members {
            let target = member_body
                .get("target")
                .and_then(Value::as_str)
                .unwrap_or("smithy.api#Document");
            let target: ShapeId = target.parse().map_err(|_| {
                Error::JsonModel(filename.to_string(), format!("bad member target `{target}`"))
            })?;
            let mut member = Member {
                name: name.clone(),
                target,
                traits: Default::default(),
                source: source.clone(),
            };
            if let Some(Value::Object(traits)) = member_body.get("traits") {
                for (trait_id, value) in traits {
                    if let Ok(trait_id) = trait_id.parse::<ShapeId>() {
                        member.traits.insert(trait_id, to_node(value, source));
                    }
                }
            }
            shape.members.push(member);
        }
    }

    Ok(shape)
}

fn to_node(value: &Value, source: &SourceLocation) -> Node {
    let node_value = match value {
        Value::Null => NodeValue::Null,
        Value::Bool(b) => NodeValue::Bool(*b),
        Value::Number(n) => n
            .as_i64()
            .map_or_else(|| NodeValue::Float(n.as_f64().unwrap_or(0.0)), NodeValue::Integer),
        Value::String(s) => NodeValue::String(s.clone()),
        Value::Array(elements) => {
            NodeValue::Array(elements.iter().map(|v| to_node(v, source)).collect())
        }
        Value::Object(fields) => NodeValue::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), to_node(v, source)))
                .collect(),
        ),
    };
    Node::new(node_value, source.clone())
}
