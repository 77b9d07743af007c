//! Endpoint extraction from a decoded Swagger/OpenAPI document.
//!
//! The document arrives as an untyped [`serde_json::Value`]. [`SpecExtractor`] walks its
//! `paths` mapping and decodes every parameter through serde into the typed model of
//! [`crate::model`]. Problems with individual entries never abort a run: the offending entry
//! is dropped and reported as a [`SkippedParameter`], and the endpoint and method are still
//! produced with whatever parameters could be decoded.
//!
//! # Supported shapes
//!
//! - Swagger 2 parameters (`type`, `format`, `enum` on the parameter itself)
//! - OpenAPI 3 parameters (the same keys inside an inline `schema`)
//! - `$ref` parameters pointing into the document (`#/parameters/...`,
//!   `#/components/parameters/...`)
//! - parameters whose `schema` references a definition (`#/definitions/...`,
//!   `#/components/schemas/...`); an object definition expands into one parameter per
//!   property, a definition without properties gives its type to the parameter itself
//! - path-level `parameters`, shared by every operation of the path

use crate::model::{Definition, Endpoint, Method, ParamType, Parameter, PropertyDefinition};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Keys of a path item that declare an operation.
const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// How many `$ref` hops are followed before a parameter reference is considered unresolvable.
const MAX_REF_DEPTH: usize = 8;

/// Result of an extraction run.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Endpoints in document order
    pub endpoints: Vec<Endpoint>,
    /// Entries that could not be decoded or resolved
    pub skipped: Vec<SkippedParameter>,
}

/// A parameter (or parameter list) left out of the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedParameter {
    /// Path template the entry belongs to
    pub path: String,
    /// Operation the entry belongs to; `None` for path-level entries
    pub method: Option<String>,
    /// Position in the `parameters` array, when the problem concerns a single entry
    pub index: Option<usize>,
    pub reason: SkipReason,
}

/// Why an entry was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The value does not have the expected structure
    UnsupportedShape(String),
    /// A `$ref` points at nothing in the document
    UnresolvedReference(String),
}

impl fmt::Display for SkippedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        if let Some(method) = &self.method {
            write!(f, " {}", method.to_ascii_uppercase())?;
        }
        if let Some(index) = self.index {
            write!(f, " parameter #{}", index)?;
        }
        match &self.reason {
            SkipReason::UnsupportedShape(detail) => write!(f, ": unsupported shape ({})", detail),
            SkipReason::UnresolvedReference(reference) => {
                write!(f, ": unresolved reference {}", reference)
            }
        }
    }
}

/// Parameter object as written in the document.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawParameter {
    name: String,
    #[serde(rename = "in")]
    location: String,
    #[serde(rename = "type")]
    param_type: Option<Value>,
    format: Option<String>,
    required: bool,
    #[serde(rename = "enum")]
    enum_values: Vec<Value>,
    #[serde(rename = "$ref")]
    reference: Option<String>,
    schema: Option<RawSchema>,
}

/// Schema object, used both for inline parameter schemas and for definitions.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSchema {
    #[serde(rename = "type")]
    schema_type: Option<Value>,
    format: Option<String>,
    #[serde(rename = "enum")]
    enum_values: Vec<Value>,
    #[serde(rename = "$ref")]
    reference: Option<String>,
    required: Vec<String>,
    properties: Map<String, Value>,
}

/// Reads a `type` value, which is a string in Swagger 2 and may be a list in OpenAPI 3.1.
fn type_name(value: Option<&Value>) -> Option<&str> {
    match value? {
        Value::String(name) => Some(name.as_str()),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .find(|name| *name != "null"),
        _ => None,
    }
}

/// Walks the `paths` of a document and builds the endpoint model.
pub struct SpecExtractor<'a> {
    document: &'a Value,
    /// Definitions indexed by the `$ref` string that points at them
    definitions: HashMap<String, Definition>,
}

impl<'a> SpecExtractor<'a> {
    /// Creates an extractor over a decoded document and indexes its definitions.
    pub fn new(document: &'a Value) -> Self {
        let definitions: HashMap<String, Definition> = collect_definitions(document)
            .into_iter()
            .collect();
        debug!("Indexed {} schema definitions", definitions.len());
        Self {
            document,
            definitions,
        }
    }

    /// Extracts every endpoint of the document, in document order.
    pub fn extract(&self) -> Extraction {
        let mut extraction = Extraction::default();

        let Some(paths) = self.document.get("paths").and_then(Value::as_object) else {
            warn!("Document has no 'paths' mapping, nothing to extract");
            return extraction;
        };

        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                self.skip(
                    &mut extraction.skipped,
                    path,
                    None,
                    None,
                    SkipReason::UnsupportedShape("path item is not an object".to_string()),
                );
                continue;
            };

            let shared = match item.get("parameters") {
                Some(list) => self.decode_parameters(path, None, list, &mut extraction.skipped),
                None => Vec::new(),
            };

            let mut endpoint = Endpoint::new(path.as_str());
            for (key, operation) in item {
                if !HTTP_METHODS.contains(&key.to_ascii_lowercase().as_str()) {
                    continue;
                }
                endpoint
                    .methods
                    .push(self.extract_method(path, key, operation, &shared, &mut extraction.skipped));
            }

            debug!(
                "Extracted endpoint {} with {} method(s)",
                endpoint.path,
                endpoint.methods.len()
            );
            extraction.endpoints.push(endpoint);
        }

        extraction
    }

    fn extract_method(
        &self,
        path: &str,
        name: &str,
        operation: &Value,
        shared: &[Parameter],
        skipped: &mut Vec<SkippedParameter>,
    ) -> Method {
        let mut method = Method::new(name);

        let own = match operation {
            Value::Object(fields) => match fields.get("parameters") {
                Some(list) => self.decode_parameters(path, Some(name), list, skipped),
                None => Vec::new(),
            },
            _ => {
                self.skip(
                    skipped,
                    path,
                    Some(name),
                    None,
                    SkipReason::UnsupportedShape("operation is not an object".to_string()),
                );
                Vec::new()
            }
        };

        // Operation-level parameters override path-level ones with the same name and location.
        method.parameters = shared
            .iter()
            .filter(|s| {
                !own.iter()
                    .any(|p| p.name == s.name && p.location == s.location)
            })
            .cloned()
            .collect();
        method.parameters.extend(own);

        method
    }

    fn decode_parameters(
        &self,
        path: &str,
        method: Option<&str>,
        list: &Value,
        skipped: &mut Vec<SkippedParameter>,
    ) -> Vec<Parameter> {
        let Some(entries) = list.as_array() else {
            self.skip(
                skipped,
                path,
                method,
                None,
                SkipReason::UnsupportedShape("'parameters' is not an array".to_string()),
            );
            return Vec::new();
        };

        let mut parameters = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            let mut unresolved = Vec::new();
            match self.decode_parameter(entry, &mut unresolved) {
                Ok(decoded) => parameters.extend(decoded),
                Err(reason) => self.skip(skipped, path, method, Some(index), reason),
            }
            for reason in unresolved {
                self.skip(skipped, path, method, Some(index), reason);
            }
        }
        parameters
    }

    /// Decodes one entry of a `parameters` array into zero or more parameters.
    ///
    /// A named entry whose `schema` reference cannot be resolved is still returned, untyped,
    /// and the reference is pushed to `unresolved`.
    fn decode_parameter(
        &self,
        entry: &Value,
        unresolved: &mut Vec<SkipReason>,
    ) -> Result<Vec<Parameter>, SkipReason> {
        if !entry.is_object() {
            return Err(SkipReason::UnsupportedShape(
                "parameter is not an object".to_string(),
            ));
        }

        let mut via_ref = None;
        let mut raw = decode_raw(entry)?;
        let mut hops = 0;
        while let Some(reference) = raw.reference.take() {
            hops += 1;
            if hops > MAX_REF_DEPTH {
                return Err(SkipReason::UnresolvedReference(reference));
            }
            let target = resolve_pointer(self.document, &reference)
                .ok_or_else(|| SkipReason::UnresolvedReference(reference.clone()))?;
            raw = decode_raw(target)?;
            via_ref = Some(reference);
        }

        let mut schema = raw.schema.take().unwrap_or_default();
        if let Some(reference) = schema.reference.take() {
            match self.definitions.get(&reference) {
                Some(definition) if !definition.properties.is_empty() => {
                    debug!(
                        "Expanding {} into {} parameter(s)",
                        reference,
                        definition.properties.len()
                    );
                    return Ok(definition
                        .properties
                        .iter()
                        .map(|property| Parameter {
                            name: property.name.clone(),
                            location: raw.location.clone(),
                            param_type: property.property_type.clone(),
                            format: property.format.clone(),
                            required: definition.required.contains(&property.name),
                            enum_values: property.enum_values.clone(),
                            schema_ref: Some(reference.clone()),
                        })
                        .collect());
                }
                // A schema without properties types the parameter itself.
                Some(definition) => {
                    schema.schema_type = Some(Value::String(definition.schema_type.clone()));
                    schema.format = Some(definition.format.clone()).filter(|f| !f.is_empty());
                    schema.enum_values = definition.enum_values.clone();
                }
                None if raw.name.is_empty() => {
                    return Err(SkipReason::UnresolvedReference(reference));
                }
                None => unresolved.push(SkipReason::UnresolvedReference(reference.clone())),
            }
            via_ref = via_ref.or(Some(reference));
        }

        if raw.name.is_empty() {
            return Err(SkipReason::UnsupportedShape(
                "parameter has no name".to_string(),
            ));
        }

        let param_type = type_name(raw.param_type.as_ref())
            .or_else(|| type_name(schema.schema_type.as_ref()))
            .map(ParamType::from)
            .unwrap_or_default();
        let enum_values = if raw.enum_values.is_empty() {
            schema.enum_values
        } else {
            raw.enum_values
        };

        Ok(vec![Parameter {
            name: raw.name,
            location: raw.location,
            param_type,
            format: raw.format.or(schema.format).unwrap_or_default(),
            required: raw.required,
            enum_values,
            schema_ref: via_ref,
        }])
    }

    fn skip(
        &self,
        skipped: &mut Vec<SkippedParameter>,
        path: &str,
        method: Option<&str>,
        index: Option<usize>,
        reason: SkipReason,
    ) {
        let entry = SkippedParameter {
            path: path.to_string(),
            method: method.map(str::to_string),
            index,
            reason,
        };
        warn!("Skipping {}", entry);
        skipped.push(entry);
    }
}

fn decode_raw(value: &Value) -> Result<RawParameter, SkipReason> {
    RawParameter::deserialize(value).map_err(|e| SkipReason::UnsupportedShape(e.to_string()))
}

/// Follows a local `#/...` reference.
fn resolve_pointer<'v>(document: &'v Value, reference: &str) -> Option<&'v Value> {
    document.pointer(reference.strip_prefix('#')?)
}

/// Returns every schema definition of the document, from both `definitions` (Swagger 2)
/// and `components.schemas` (OpenAPI 3).
pub fn extract_definitions(document: &Value) -> Vec<Definition> {
    collect_definitions(document)
        .into_iter()
        .map(|(_, definition)| definition)
        .collect()
}

fn collect_definitions(document: &Value) -> Vec<(String, Definition)> {
    let sources = [
        ("#/definitions/", document.get("definitions")),
        (
            "#/components/schemas/",
            document.get("components").and_then(|c| c.get("schemas")),
        ),
    ];

    let mut definitions = Vec::new();
    for (prefix, section) in sources {
        let Some(section) = section.and_then(Value::as_object) else {
            continue;
        };
        for (name, schema) in section {
            match RawSchema::deserialize(schema) {
                Ok(raw) => definitions.push((format!("{}{}", prefix, name), to_definition(name, raw))),
                Err(e) => warn!("Skipping definition {}: {}", name, e),
            }
        }
    }
    definitions
}

fn to_definition(name: &str, raw: RawSchema) -> Definition {
    let properties = raw
        .properties
        .iter()
        .filter_map(|(prop_name, value)| match RawSchema::deserialize(value) {
            Ok(prop) => Some(to_property(prop_name, prop)),
            Err(e) => {
                warn!("Skipping property {}.{}: {}", name, prop_name, e);
                None
            }
        })
        .collect();

    Definition {
        name: name.to_string(),
        schema_type: type_name(raw.schema_type.as_ref())
            .unwrap_or("object")
            .to_string(),
        format: raw.format.unwrap_or_default(),
        enum_values: raw.enum_values,
        required: raw.required,
        properties,
    }
}

fn to_property(name: &str, raw: RawSchema) -> PropertyDefinition {
    let property_type = match (type_name(raw.schema_type.as_ref()), &raw.reference) {
        (Some(declared), _) => ParamType::from(declared),
        (None, Some(_)) => ParamType::Other("object".to_string()),
        (None, None) => ParamType::default(),
    };

    PropertyDefinition {
        name: name.to_string(),
        property_type,
        format: raw.format.unwrap_or_default(),
        reference: raw.reference,
        enum_values: raw.enum_values,
    }
}

/// Orders endpoints by ascending path depth so that deeper paths come after shallower ones.
///
/// The sort is stable: endpoints of equal depth keep their relative order.
pub fn order_endpoints(endpoints: &mut [Endpoint]) {
    endpoints.sort_by_key(Endpoint::depth);
}
