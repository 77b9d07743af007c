use crate::config::{Config, WebServer};
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;

/// Swagger to ModSecurity - Generate ModSecurity rules from a Swagger/OpenAPI document
#[derive(Parser, Debug)]
#[command(name = "swagger-modsecurity")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the JSON configuration file
    #[arg(value_name = "CONFIG")]
    pub config_path: PathBuf,

    /// Swagger/OpenAPI document to read instead of the configured url
    #[arg(short = 's', long = "spec", value_name = "URL_OR_PATH")]
    pub spec: Option<String>,

    /// Target web server, overrides the configuration file
    #[arg(short = 'w', long = "webserver", value_enum)]
    pub webserver: Option<WebServer>,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.config_path.exists() {
        anyhow::bail!(
            "Configuration file does not exist: {}",
            args.config_path.display()
        );
    }

    if !args.config_path.is_file() {
        anyhow::bail!(
            "Configuration path is not a file: {}",
            args.config_path.display()
        );
    }

    Ok(args)
}

/// Read the configuration file and apply command line overrides
pub fn load_config(args: &CliArgs) -> Result<Config> {
    let mut config = Config::from_file(&args.config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            args.config_path.display()
        )
    })?;
    apply_overrides(&mut config, args);

    if config.url.trim().is_empty() {
        anyhow::bail!("No specification location: set 'url' in the configuration or pass --spec");
    }

    Ok(config)
}

/// Command line values take precedence over the configuration file
pub fn apply_overrides(config: &mut Config, args: &CliArgs) {
    if let Some(spec) = &args.spec {
        config.url = spec.clone();
    }
    if let Some(webserver) = args.webserver {
        config.webserver = webserver.as_str().to_string();
    }
    config.verbose |= args.verbose;
}

/// Run the main workflow
pub fn run(args: &CliArgs, config: &Config) -> Result<()> {
    use crate::generator::generate;
    use crate::loader::load_document;
    use crate::output::{print_rules, write_rules};
    use crate::sequencer::RuleIdSequencer;

    info!("Configuration: {}", args.config_path.display());
    info!("Specification: {}", config.url);
    info!("Web server: {}", config.webserver);
    if config.rate_limit_enabled() {
        info!(
            "Rate limit: {} requests per {}s, whitelist {}",
            config.ratelimit, config.ratelimit_window, config.ratelimit_whitelist
        );
    } else {
        info!("Rate limit: disabled");
    }
    info!("Restricted endpoints: {}", config.restricted_endpoints.len());

    // Step 1: Fetch and decode the specification
    let document = load_document(&config.url)
        .with_context(|| format!("Failed to load specification from {}", config.url))?;

    // Step 2: Generate rules
    let sequencer = RuleIdSequencer::new();
    let generation = generate(config, &document, &sequencer)?;

    if generation.rules.is_empty() {
        warn!("No rules were generated");
    }

    // Step 3: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_rules(&generation.rules, output_path)?;
    } else {
        print_rules(&generation.rules, &mut std::io::stdout().lock())?;
    }

    // Step 4: Display summary
    info!("Generation complete!");
    info!("Summary:");
    info!("  - Endpoints: {}", generation.endpoint_count);
    info!("  - Directives: {}", generation.rules.len());
    info!("  - Skipped parameters: {}", generation.skipped.len());
    info!("  - Last rule id: {}", sequencer.last_issued());

    Ok(())
}
