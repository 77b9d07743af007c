//! Swagger to ModSecurity - ModSecurity rules from a REST API description.
//!
//! This library turns a Swagger 2 / OpenAPI 3 document into ModSecurity directives that
//! enforce, for every endpoint of the API:
//!
//! - the allowed HTTP methods
//! - an optional source address allow-list
//! - an optional per-client rate limit
//! - the shape of path parameters, through regular expressions derived from their types
//!
//! Rules are wrapped in `<LocationMatch>` blocks for Apache or in `location` blocks with
//! `modsecurity_rules` for nginx.
//!
//! # Architecture
//!
//! 1. [`loader`] - Fetches the document (URL or file) and decodes JSON or YAML
//! 2. [`extractor`] - Builds the typed [`model`] from the document and orders endpoints
//! 3. [`path_regex`] - Translates path templates into matching patterns
//! 4. [`sequencer`] - Allocates unique rule identifiers
//! 5. [`emitter`] - Emits the directive block of one endpoint
//! 6. [`generator`] - Runs the pipeline over the whole document
//! 7. [`output`] - Renders and writes the directives
//!
//! # Example Usage
//!
//! ```
//! use swagger_modsecurity::{config::Config, generator::generate_rules};
//! use serde_json::json;
//!
//! let config = Config {
//!     webserver: "apache".to_string(),
//!     ..Config::default()
//! };
//! let document = json!({
//!     "swagger": "2.0",
//!     "paths": {
//!         "/users/{id}": {
//!             "get": {"parameters": [{"name": "id", "in": "path", "type": "integer"}]}
//!         }
//!     }
//! });
//!
//! let rules = generate_rules(&config, &document).unwrap();
//! assert_eq!(rules[0], r#"<LocationMatch "^/users/([+-]?[0-9]*)$">"#);
//! assert_eq!(rules.last().unwrap(), "</LocationMatch>");
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod config;
pub mod emitter;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod loader;
pub mod model;
pub mod output;
pub mod path_regex;
pub mod sequencer;
