//! Rule generation for a whole document.
//!
//! Drives extraction, ordering and emission, and concatenates every endpoint block into the
//! final directive list.

use crate::config::Config;
use crate::emitter::RuleEmitter;
use crate::error::Result;
use crate::extractor::{order_endpoints, SkippedParameter, SpecExtractor};
use crate::sequencer::RuleIdSequencer;
use log::{debug, info, warn};
use serde_json::Value;

/// Outcome of a generation run.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    /// Directives, one per line, in evaluation order
    pub rules: Vec<String>,
    /// Number of endpoints a block was emitted for
    pub endpoint_count: usize,
    /// Parameters left out during extraction
    pub skipped: Vec<SkippedParameter>,
}

/// Generates the directives for `document` with a fresh identifier sequence.
///
/// Returns an empty list when the configured web server is not recognized.
///
/// # Errors
///
/// Fails when a path template has a placeholder with no declared parameter.
pub fn generate_rules(config: &Config, document: &Value) -> Result<Vec<String>> {
    generate_rules_with(config, document, &RuleIdSequencer::new())
}

/// Same as [`generate_rules`], drawing identifiers from a caller-owned sequencer.
pub fn generate_rules_with(
    config: &Config,
    document: &Value,
    sequencer: &RuleIdSequencer,
) -> Result<Vec<String>> {
    generate(config, document, sequencer).map(|generation| generation.rules)
}

/// Runs the full pipeline and reports what was produced.
pub fn generate(config: &Config, document: &Value, sequencer: &RuleIdSequencer) -> Result<Generation> {
    let Some(web_server) = config.web_server() else {
        warn!(
            "Unsupported web server '{}', expected 'apache' or 'nginx'; no rules generated",
            config.webserver
        );
        return Ok(Generation::default());
    };

    let extraction = SpecExtractor::new(document).extract();
    let mut endpoints = extraction.endpoints;
    order_endpoints(&mut endpoints);
    info!("Generating {} rules for {} endpoint(s)", web_server, endpoints.len());

    let emitter = RuleEmitter::new(config, web_server, sequencer);
    let mut rules = Vec::new();
    for endpoint in &endpoints {
        let block = emitter.emit(endpoint)?;
        debug!("{}: {} directive(s)", endpoint.path, block.len());
        rules.extend(block);
    }

    Ok(Generation {
        rules,
        endpoint_count: endpoints.len(),
        skipped: extraction.skipped,
    })
}
