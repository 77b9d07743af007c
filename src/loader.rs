//! Loading of the Swagger/OpenAPI document.
//!
//! The document location comes from [`crate::config::Config::url`] and may be an `http://` or
//! `https://` URL, a `file://` URL, or a plain filesystem path. Content is decoded as JSON, and
//! as YAML when it is not valid JSON.

use crate::error::{Error, Result};
use log::{debug, info};
use serde_json::Value;
use std::path::Path;

/// Fetches and decodes the document at `location`.
///
/// # Errors
///
/// Returns [`Error::FetchError`] when the document cannot be retrieved and
/// [`Error::ParseError`] when it is neither JSON nor YAML.
pub fn load_document(location: &str) -> Result<Value> {
    let content = if is_remote(location) {
        fetch_remote(location)?
    } else {
        let path = location.strip_prefix("file://").unwrap_or(location);
        read_local(Path::new(path))?
    };
    debug!("Read {} bytes from {}", content.len(), location);

    let document = decode_document(&content, location)?;
    if let Some(version) = document
        .get("swagger")
        .or_else(|| document.get("openapi"))
        .and_then(Value::as_str)
    {
        info!("Specification version: {}", version);
    }
    Ok(document)
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn fetch_remote(url: &str) -> Result<String> {
    info!("Downloading {}", url);
    let fetch_error = |e: reqwest::Error| Error::FetchError {
        location: url.to_string(),
        message: e.to_string(),
    };

    reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(fetch_error)
}

fn read_local(path: &Path) -> Result<String> {
    info!("Reading {}", path.display());
    std::fs::read_to_string(path).map_err(|e| Error::FetchError {
        location: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Decodes document text, trying JSON first and YAML second.
pub fn decode_document(content: &str, location: &str) -> Result<Value> {
    let document: Value = match serde_json::from_str(content) {
        Ok(document) => document,
        Err(json_err) => {
            debug!("{} is not JSON ({}), trying YAML", location, json_err);
            serde_yaml::from_str(content).map_err(|yaml_err| Error::ParseError {
                location: location.to_string(),
                message: format!("not JSON ({}) nor YAML ({})", json_err, yaml_err),
            })?
        }
    };

    if !document.is_object() {
        return Err(Error::ParseError {
            location: location.to_string(),
            message: "document root is not a mapping".to_string(),
        });
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("swagger.json");
        fs::write(&path, r#"{"swagger": "2.0", "paths": {"/a": {"get": {}}}}"#).unwrap();

        let document = load_document(path.to_str().unwrap()).unwrap();
        assert_eq!(document["swagger"], "2.0");
        assert!(document["paths"]["/a"]["get"].is_object());
    }

    #[test]
    fn test_load_yaml_file_via_file_url() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("openapi.yaml");
        fs::write(
            &path,
            "openapi: 3.0.0\npaths:\n  /pets/{id}:\n    get:\n      parameters:\n        - name: id\n          in: path\n          schema:\n            type: integer\n",
        )
        .unwrap();

        let location = format!("file://{}", path.display());
        let document = load_document(&location).unwrap();
        assert_eq!(document["openapi"], "3.0.0");
        assert_eq!(
            document["paths"]["/pets/{id}"]["get"]["parameters"][0]["schema"]["type"],
            "integer"
        );
    }

    #[test]
    fn test_yaml_keeps_path_order() {
        let document = decode_document("paths:\n  /z: {}\n  /a: {}\n  /m: {}\n", "inline").unwrap();
        let keys: Vec<_> = document["paths"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["/z", "/a", "/m"]);
    }

    #[test]
    fn test_missing_file_is_fetch_error() {
        let err = load_document("/nonexistent/swagger.json").unwrap_err();
        assert!(matches!(err, Error::FetchError { .. }));
    }

    #[test]
    fn test_scalar_document_is_rejected() {
        let err = decode_document("just some text", "inline").unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://petstore.swagger.io/v2/swagger.json"));
        assert!(is_remote("http://localhost:8080/swagger.json"));
        assert!(!is_remote("file:///tmp/swagger.json"));
        assert!(!is_remote("./swagger.json"));
    }
}
