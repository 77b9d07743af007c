//! Typed endpoint model decoded from a Swagger/OpenAPI document.
//!
//! Values are built once per run by [`crate::extractor::SpecExtractor`], consumed by the
//! path translator and the rule emitter, and dropped when the directive list is produced.

use serde_json::Value;

/// A single path template of the API together with its declared operations.
///
/// The path is the raw key of the `paths` mapping and may contain `{name}` placeholders.
/// Paths are unique within one document since they come from the keys of a map.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    /// The path template (e.g. "/users/{id}")
    pub path: String,
    /// Declared operations, in document order
    pub methods: Vec<Method>,
}

/// One HTTP operation declared on an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    /// Verb name as written in the document ("get", "Post", ...)
    pub name: String,
    /// Parameters accepted by the operation
    pub parameters: Vec<Parameter>,
}

/// A decoded operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// The parameter name
    pub name: String,
    /// Where the parameter is carried ("path", "query", "header", "body", ...)
    pub location: String,
    /// Declared primitive type
    pub param_type: ParamType,
    /// Declared format, empty when absent
    pub format: String,
    /// Whether the parameter is required
    pub required: bool,
    /// Enumerated allowed values
    pub enum_values: Vec<Value>,
    /// The `$ref` this parameter was expanded from, if any
    pub schema_ref: Option<String>,
}

/// Primitive parameter types understood by the path translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Boolean,
    Integer,
    Number,
    String,
    /// Any other declared type, or an empty string when no type was declared
    Other(String),
}

/// A named schema from `definitions` or `components.schemas`.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    /// Schema name (the key under `definitions`)
    pub name: String,
    /// Declared schema type, usually "object"
    pub schema_type: String,
    /// Format of a primitive schema
    pub format: String,
    /// Allowed values of a primitive schema
    pub enum_values: Vec<Value>,
    /// Names of the required properties
    pub required: Vec<String>,
    /// Properties in document order
    pub properties: Vec<PropertyDefinition>,
}

/// A property of a [`Definition`].
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    pub name: String,
    pub property_type: ParamType,
    pub format: String,
    /// `$ref` of a nested schema; not followed
    pub reference: Option<String>,
    pub enum_values: Vec<Value>,
}

impl Endpoint {
    /// Create a new Endpoint without methods
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            methods: Vec::new(),
        }
    }

    /// Number of path separators in the template, used to order endpoints
    pub fn depth(&self) -> usize {
        self.path.matches('/').count()
    }

    /// Iterate over every parameter of every method, in declaration order
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.methods.iter().flat_map(|m| m.parameters.iter())
    }
}

impl Method {
    /// Create a new Method without parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// The verb as it appears in emitted directives
    pub fn directive_name(&self) -> String {
        self.name.to_ascii_uppercase()
    }
}

impl Parameter {
    /// Create a new Parameter with no format, enum or reference
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        param_type: ParamType,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            param_type,
            format: String::new(),
            required,
            enum_values: Vec::new(),
            schema_ref: None,
        }
    }

    /// Whether the parameter is carried in the URL path
    pub fn is_path(&self) -> bool {
        self.location.eq_ignore_ascii_case("path")
    }
}

impl ParamType {
    /// The type name as written in a document
    pub fn as_str(&self) -> &str {
        match self {
            ParamType::Boolean => "boolean",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::String => "string",
            ParamType::Other(name) => name,
        }
    }
}

impl From<&str> for ParamType {
    fn from(name: &str) -> Self {
        match name {
            "boolean" => ParamType::Boolean,
            "integer" => ParamType::Integer,
            "number" => ParamType::Number,
            "string" => ParamType::String,
            other => ParamType::Other(other.to_string()),
        }
    }
}

impl Default for ParamType {
    fn default() -> Self {
        ParamType::Other(String::new())
    }
}
