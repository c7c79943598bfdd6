//! Chute schema document parser.
//!
//! Chutes publish their interface at `/openapi.json`. Most are FastAPI apps
//! emitting OpenAPI 3.1, which the typed `openapiv3` model does not always
//! accept, so the parser tries the typed model first and falls back to a
//! lenient walk over the raw JSON. Both paths only look at POST operations.

use crate::error::{OpenApiError, Result};
use crate::types::{EndpointDescriptor, SchemaDocument};
use openapiv3::{OpenAPI, Operation, Parameter, ReferenceOr};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

/// Maximum `$ref` hops followed before giving up on a schema.
const MAX_REF_DEPTH: usize = 8;

enum Source {
    Typed(Box<OpenAPI>),
    Lenient(Value),
}

/// Parser for chute schema documents.
pub struct SchemaParser {
    source: Source,
}

impl SchemaParser {
    /// Parse a schema document from a string.
    ///
    /// Automatically detects JSON or YAML format.
    pub fn from_str(content: &str) -> Result<Self> {
        // Try JSON first
        let value: Value = serde_json::from_str(content)
            .or_else(|_| serde_yaml::from_str(content))
            .map_err(|e| OpenApiError::ParseError(e.to_string()))?;

        Self::from_value(value)
    }

    /// Parse a schema document from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let content =
            std::str::from_utf8(bytes).map_err(|e| OpenApiError::ParseError(e.to_string()))?;
        Self::from_str(content)
    }

    /// Build a parser from an already decoded document.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.get("paths").is_some_and(Value::is_object) {
            return Err(OpenApiError::InvalidSpec(
                "document has no 'paths' object".to_string(),
            ));
        }

        let source = match serde_json::from_value::<OpenAPI>(value.clone()) {
            Ok(spec) => Source::Typed(Box::new(spec)),
            Err(e) => {
                debug!("Typed OpenAPI parse failed ({}), using lenient walk", e);
                Source::Lenient(value)
            }
        };

        Ok(Self { source })
    }

    /// Whether the strict OpenAPI 3.0 model accepted the document.
    pub fn is_typed(&self) -> bool {
        matches!(self.source, Source::Typed(_))
    }

    /// Extract every POST endpoint in declaration order.
    pub fn parse(&self) -> Result<SchemaDocument> {
        let document = match &self.source {
            Source::Typed(spec) => parse_typed(spec)?,
            Source::Lenient(value) => parse_lenient(value),
        };

        debug!("Parsed {} POST endpoints", document.endpoints.len());
        Ok(document)
    }
}

fn parse_typed(spec: &OpenAPI) -> Result<SchemaDocument> {
    // Walked as JSON so both parse paths share one resolver
    let root = json!({ "components": serde_json::to_value(&spec.components)? });
    let mut endpoints = Vec::new();

    for (path, path_item_ref) in &spec.paths.paths {
        let path_item = match path_item_ref {
            ReferenceOr::Item(item) => item,
            ReferenceOr::Reference { .. } => {
                warn!("Path references not yet supported: {}", path);
                continue;
            }
        };

        let Some(operation) = &path_item.post else {
            continue;
        };

        let mut fields = query_parameter_names(&path_item.parameters, &root);
        fields.extend(query_parameter_names(&operation.parameters, &root));

        let body_schema = typed_body_schema(operation, &root)?;
        endpoints.push(build_endpoint(path, fields, body_schema.as_ref(), &root));
    }

    Ok(SchemaDocument {
        title: Some(spec.info.title.clone()).filter(|t| !t.is_empty()),
        version: Some(spec.info.version.clone()).filter(|v| !v.is_empty()),
        endpoints,
    })
}

/// Query parameter names; `$ref`s go through `#/components/parameters`.
fn query_parameter_names(params: &[ReferenceOr<Parameter>], root: &Value) -> Vec<String> {
    params
        .iter()
        .filter_map(|param_ref| match param_ref {
            ReferenceOr::Item(Parameter::Query { parameter_data, .. }) => {
                Some(parameter_data.name.clone())
            }
            ReferenceOr::Item(_) => None,
            ReferenceOr::Reference { reference } => lookup(reference, root)
                .map(|p| resolve(p, root))
                .filter(|p| p.get("in").and_then(Value::as_str) == Some("query"))
                .and_then(|p| p.get("name").and_then(Value::as_str))
                .map(str::to_string),
        })
        .collect()
}

fn typed_body_schema(operation: &Operation, root: &Value) -> Result<Option<Value>> {
    let Some(request_body_ref) = &operation.request_body else {
        return Ok(None);
    };

    let value = match request_body_ref {
        ReferenceOr::Item(request_body) => {
            let media_type = request_body
                .content
                .get("application/json")
                .or_else(|| request_body.content.values().next());
            match media_type.and_then(|m| m.schema.as_ref()) {
                Some(schema_ref) => Some(serde_json::to_value(schema_ref)?),
                None => None,
            }
        }
        ReferenceOr::Reference { reference } => lookup(reference, root)
            .map(|rb| resolve(rb, root))
            .and_then(media_schema)
            .cloned(),
    };

    Ok(value)
}

fn parse_lenient(doc: &Value) -> SchemaDocument {
    let mut endpoints = Vec::new();

    if let Some(paths) = doc.get("paths").and_then(Value::as_object) {
        for (path, item) in paths {
            let item = resolve(item, doc);
            let Some(operation) = item.get("post").filter(|o| o.is_object()) else {
                continue;
            };

            let mut fields = lenient_query_names(item.get("parameters"), doc);
            fields.extend(lenient_query_names(operation.get("parameters"), doc));

            let body_schema = operation
                .get("requestBody")
                .map(|rb| resolve(rb, doc))
                .and_then(media_schema)
                .cloned();

            endpoints.push(build_endpoint(path, fields, body_schema.as_ref(), doc));
        }
    }

    let info = doc.get("info");
    let text = |key: &str| {
        info.and_then(|i| i.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    SchemaDocument {
        title: text("title"),
        version: text("version"),
        endpoints,
    }
}

/// Schema of a request body's JSON media type, or of its first one.
fn media_schema(request_body: &Value) -> Option<&Value> {
    let content = request_body.get("content")?.as_object()?;
    content
        .get("application/json")
        .or_else(|| content.values().next())?
        .get("schema")
}

fn lenient_query_names(params: Option<&Value>, root: &Value) -> Vec<String> {
    params
        .and_then(Value::as_array)
        .map(|params| {
            params
                .iter()
                .map(|p| resolve(p, root))
                .filter(|p| p.get("in").and_then(Value::as_str) == Some("query"))
                .filter_map(|p| p.get("name").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn build_endpoint(
    path: &str,
    query_fields: Vec<String>,
    body_schema: Option<&Value>,
    root: &Value,
) -> EndpointDescriptor {
    let mut endpoint = EndpointDescriptor::new(path);
    let mut body_fields = Vec::new();

    if let Some(schema) = body_schema {
        let properties = collect_properties(schema, root, 0);

        // A lone object-typed property whose own properties carry the inputs
        // means the chute expects a wrapped body
        if let [(name, inner)] = properties.as_slice() {
            let nested = collect_properties(inner, root, 0);
            if !nested.is_empty() {
                endpoint = endpoint.with_wrapper(name.clone());
                body_fields = nested.into_iter().map(|(n, _)| n).collect();
            }
        }

        if endpoint.wrapper.is_none() {
            body_fields = properties.into_iter().map(|(n, _)| n).collect();
        }
    }

    endpoint.with_fields(body_fields).with_fields(query_fields)
}

/// Target of a local reference such as `#/components/requestBodies/Speech`.
fn lookup<'a>(reference: &str, root: &'a Value) -> Option<&'a Value> {
    let target = reference
        .strip_prefix('#')
        .and_then(|pointer| root.pointer(pointer));
    if target.is_none() {
        warn!("Unresolvable schema reference: {}", reference);
    }
    target
}

/// Follow local `$ref`s (`#/components/...`) until a concrete value is found.
fn resolve<'a>(value: &'a Value, root: &'a Value) -> &'a Value {
    let mut current = value;
    for _ in 0..MAX_REF_DEPTH {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return current;
        };
        match lookup(reference, root) {
            Some(target) => current = target,
            None => return current,
        }
    }
    current
}

/// Object properties of a schema, following `$ref`, `allOf` and the first
/// `anyOf`/`oneOf` branch that has any.
fn collect_properties(schema: &Value, root: &Value, depth: usize) -> Vec<(String, Value)> {
    if depth > MAX_REF_DEPTH {
        return Vec::new();
    }

    let schema = resolve(schema, root);
    let mut out: Vec<(String, Value)> = Vec::new();

    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        push_properties(&mut out, props);
    }

    if let Some(parts) = schema.get("allOf").and_then(Value::as_array) {
        for part in parts {
            for (name, value) in collect_properties(part, root, depth + 1) {
                if !out.iter().any(|(n, _)| *n == name) {
                    out.push((name, value));
                }
            }
        }
    }

    if out.is_empty() {
        for key in ["anyOf", "oneOf"] {
            if let Some(branches) = schema.get(key).and_then(Value::as_array) {
                if let Some(props) = branches
                    .iter()
                    .map(|b| collect_properties(b, root, depth + 1))
                    .find(|p| !p.is_empty())
                {
                    return props;
                }
            }
        }
    }

    out
}

fn push_properties(out: &mut Vec<(String, Value)>, props: &Map<String, Value>) {
    for (name, value) in props {
        if !out.iter().any(|(n, _)| n == name) {
            out.push((name.clone(), value.clone()));
        }
    }
}
