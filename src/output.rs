//! Output of generated directives.
//!
//! Rules are rendered one directive per line, ready to be included from an Apache or nginx
//! configuration, and sent either to a rules file or to stdout.

use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Joins directives into configuration text, one per line, with a trailing newline.
///
/// An empty rule list renders as an empty string.
pub fn render_rules(rules: &[String]) -> String {
    let mut content = String::with_capacity(rules.iter().map(|r| r.len() + 1).sum());
    for rule in rules {
        content.push_str(rule);
        content.push('\n');
    }
    content
}

/// Writes the rendered rules to any sink, such as stdout.
pub fn print_rules<W: Write>(rules: &[String], out: &mut W) -> Result<()> {
    out.write_all(render_rules(rules).as_bytes())
        .context("Failed to write rules")?;
    out.flush().context("Failed to flush rules")
}

/// Replaces the rules file at `path` with the rendered rules.
///
/// The output directory is created when missing, so a fresh `conf.d/` can be targeted directly.
/// An empty rule list still produces a file, truncating any rules from an earlier run.
///
/// # Errors
///
/// Returns an error if the directory or the file cannot be written.
pub fn write_rules(rules: &[String], path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create output directory {}", dir.display()))?,
        _ => {}
    }

    fs::write(path, render_rules(rules))
        .with_context(|| format!("Cannot write rules to {}", path.display()))?;

    debug!("Wrote {} directive(s) to {}", rules.len(), path.display());
    Ok(())
}
