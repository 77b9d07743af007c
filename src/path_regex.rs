//! Path template to regular expression translation.
//!
//! A template such as `/users/{id}/posts/{slug}` is split into literal and placeholder
//! segments. Each placeholder is replaced by a capturing group whose content depends on the
//! declared type of the matching parameter:
//!
//! | type      | fragment          |
//! |-----------|-------------------|
//! | `boolean` | `[0-1]`           |
//! | `integer` | `[+-]?[0-9]*`     |
//! | `number`  | `[+-]?[0-9.,]*`   |
//! | `string`  | `[^/]*`           |
//! | other     | empty             |
//!
//! Literal segments are copied verbatim.

use crate::error::{Error, Result};
use crate::model::{Endpoint, ParamType, Parameter};
use log::debug;

/// A piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied as-is into the pattern
    Literal(&'a str),
    /// The name between `{` and `}`
    Placeholder(&'a str),
}

/// Splits a path template into literal and placeholder segments.
///
/// An opening brace without a matching closing brace is kept as literal text.
pub fn tokenize(path: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = path;

    while let Some(open) = rest.find('{') {
        let Some(len) = rest[open..].find('}') else {
            break;
        };
        if open > 0 {
            segments.push(Segment::Literal(&rest[..open]));
        }
        segments.push(Segment::Placeholder(&rest[open + 1..open + len]));
        rest = &rest[open + len + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }

    segments
}

/// Regular expression fragment matching one value of the given type
pub fn fragment_for(param_type: &ParamType) -> &'static str {
    match param_type {
        ParamType::Boolean => "[0-1]",
        ParamType::Integer => "[+-]?[0-9]*",
        ParamType::Number => "[+-]?[0-9.,]*",
        ParamType::String => "[^/]*",
        ParamType::Other(_) => "",
    }
}

/// Finds the parameter a placeholder refers to, searching every method of the endpoint.
///
/// Path parameters win over same-named parameters carried elsewhere.
fn lookup<'a>(endpoint: &'a Endpoint, name: &str) -> Option<&'a Parameter> {
    endpoint
        .parameters()
        .find(|p| p.name == name && p.is_path())
        .or_else(|| endpoint.parameters().find(|p| p.name == name))
}

/// Translates the endpoint's path template into a single matching pattern.
///
/// # Errors
///
/// Returns [`Error::UnresolvablePathParameter`] when a placeholder names no declared parameter.
pub fn translate(endpoint: &Endpoint) -> Result<String> {
    let mut pattern = String::with_capacity(endpoint.path.len());

    for segment in tokenize(&endpoint.path) {
        match segment {
            Segment::Literal(text) => pattern.push_str(text),
            Segment::Placeholder(name) => {
                let param = lookup(endpoint, name).ok_or_else(|| {
                    Error::UnresolvablePathParameter {
                        path: endpoint.path.clone(),
                        placeholder: name.to_string(),
                    }
                })?;
                debug!(
                    "Placeholder {{{}}} in {} resolved as {}",
                    name,
                    endpoint.path,
                    param.param_type.as_str()
                );
                pattern.push('(');
                pattern.push_str(fragment_for(&param.param_type));
                pattern.push(')');
            }
        }
    }

    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Method;
    use regex::Regex;

    fn endpoint_with(path: &str, params: Vec<Parameter>) -> Endpoint {
        let mut method = Method::new("get");
        method.parameters = params;
        Endpoint {
            path: path.to_string(),
            methods: vec![method],
        }
    }

    fn anchored(fragment: &str) -> Regex {
        Regex::new(&format!("^({})$", fragment)).unwrap()
    }

    #[test]
    fn test_tokenize_mixed_template() {
        assert_eq!(
            tokenize("/users/{id}/posts/{slug}"),
            vec![
                Segment::Literal("/users/"),
                Segment::Placeholder("id"),
                Segment::Literal("/posts/"),
                Segment::Placeholder("slug"),
            ]
        );
    }

    #[test]
    fn test_tokenize_unclosed_brace_is_literal() {
        assert_eq!(tokenize("/a/{b"), vec![Segment::Literal("/a/{b")]);
        assert_eq!(
            tokenize("/{x}/{y"),
            vec![
                Segment::Literal("/"),
                Segment::Placeholder("x"),
                Segment::Literal("/{y"),
            ]
        );
    }

    #[test]
    fn test_boolean_fragment() {
        let re = anchored(fragment_for(&ParamType::Boolean));
        assert!(re.is_match("0"));
        assert!(re.is_match("1"));
        assert!(!re.is_match("2"));
        assert!(!re.is_match("a"));
    }

    #[test]
    fn test_integer_fragment() {
        let re = anchored(fragment_for(&ParamType::Integer));
        assert!(re.is_match("42"));
        assert!(re.is_match("-7"));
        assert!(re.is_match("+3"));
        assert!(!re.is_match("4.2"));
        assert!(!re.is_match("abc"));
    }

    #[test]
    fn test_number_fragment() {
        let re = anchored(fragment_for(&ParamType::Number));
        assert!(re.is_match("4.2"));
        assert!(re.is_match("-1,5"));
        assert!(!re.is_match("1e5"));
    }

    #[test]
    fn test_string_fragment() {
        let re = anchored(fragment_for(&ParamType::String));
        assert!(re.is_match("hello-world_42"));
        assert!(re.is_match(""));
        assert!(!re.is_match("a/b"));
    }

    #[test]
    fn test_unknown_type_has_empty_fragment() {
        assert_eq!(fragment_for(&ParamType::Other("array".to_string())), "");
        assert_eq!(fragment_for(&ParamType::default()), "");
    }

    #[test]
    fn test_translate_integer_placeholder() {
        let endpoint = endpoint_with(
            "/users/{id}",
            vec![Parameter::new("id", "path", ParamType::Integer, true)],
        );
        assert_eq!(translate(&endpoint).unwrap(), "/users/([+-]?[0-9]*)");
    }

    #[test]
    fn test_translate_without_placeholders_is_identity() {
        let endpoint = endpoint_with("/health/check.json", vec![]);
        assert_eq!(translate(&endpoint).unwrap(), "/health/check.json");
    }

    #[test]
    fn test_translate_multiple_placeholders() {
        let endpoint = endpoint_with(
            "/flags/{name}/{enabled}",
            vec![
                Parameter::new("enabled", "path", ParamType::Boolean, true),
                Parameter::new("name", "path", ParamType::String, true),
            ],
        );
        assert_eq!(
            translate(&endpoint).unwrap(),
            "/flags/([^/]*)/([0-1])"
        );
    }

    #[test]
    fn test_translate_searches_all_methods() {
        let mut endpoint = endpoint_with("/items/{id}", vec![]);
        let mut delete = Method::new("delete");
        delete
            .parameters
            .push(Parameter::new("id", "path", ParamType::Number, true));
        endpoint.methods.push(delete);

        assert_eq!(translate(&endpoint).unwrap(), "/items/([+-]?[0-9.,]*)");
    }

    #[test]
    fn test_translate_prefers_path_parameter() {
        let endpoint = endpoint_with(
            "/items/{id}",
            vec![
                Parameter::new("id", "query", ParamType::String, false),
                Parameter::new("id", "path", ParamType::Integer, true),
            ],
        );
        assert_eq!(translate(&endpoint).unwrap(), "/items/([+-]?[0-9]*)");
    }

    #[test]
    fn test_translate_untyped_parameter() {
        let endpoint = endpoint_with(
            "/files/{name}",
            vec![Parameter::new("name", "path", ParamType::default(), true)],
        );
        assert_eq!(translate(&endpoint).unwrap(), "/files/()");
    }

    #[test]
    fn test_translate_unresolvable_placeholder_fails() {
        let endpoint = endpoint_with(
            "/users/{userId}",
            vec![Parameter::new("id", "path", ParamType::Integer, true)],
        );

        match translate(&endpoint) {
            Err(Error::UnresolvablePathParameter { path, placeholder }) => {
                assert_eq!(path, "/users/{userId}");
                assert_eq!(placeholder, "userId");
            }
            other => panic!("expected unresolvable placeholder error, got {:?}", other),
        }
    }

    #[test]
    fn test_translated_pattern_matches_concrete_paths() {
        let endpoint = endpoint_with(
            "/users/{id}/active/{flag}",
            vec![
                Parameter::new("id", "path", ParamType::Integer, true),
                Parameter::new("flag", "path", ParamType::Boolean, true),
            ],
        );
        let re = Regex::new(&format!("^{}$", translate(&endpoint).unwrap())).unwrap();
        assert!(re.is_match("/users/42/active/1"));
        assert!(!re.is_match("/users/42/active/yes"));
        assert!(!re.is_match("/users/abc/active/0"));
    }
}
