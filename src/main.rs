//! Swagger to ModSecurity - Command-line tool for generating ModSecurity rules.
//!
//! This binary reads a JSON configuration file, fetches the Swagger/OpenAPI document it points
//! to, and prints the generated ModSecurity directives for Apache or nginx.
//!
//! # Usage
//!
//! ```bash
//! swagger-modsecurity [OPTIONS] <CONFIG>
//! ```
//!
//! # Examples
//!
//! Print Apache rules for the document configured in `config.json`:
//! ```bash
//! swagger-modsecurity config.json -w apache
//! ```
//!
//! Write nginx rules for a local document to a file:
//! ```bash
//! swagger-modsecurity config.json -w nginx -s ./swagger.yaml -o /etc/nginx/modsec/api.conf
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! swagger-modsecurity config.json -v
//! ```

use anyhow::Result;
use log::info;
use swagger_modsecurity::cli;

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    // The configuration can also ask for verbose output, so it is read before the logger exists
    let config = cli::load_config(&args)?;

    let log_level = if config.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Swagger to ModSecurity starting...");

    cli::run(&args, &config)?;

    info!("ModSecurity rule generation completed successfully");

    Ok(())
}
