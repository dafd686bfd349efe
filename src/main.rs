//! imagify - Render long chat messages as images.
//!
//! The binary offers offline tooling around the library: configuration
//! checks, markup previews and trigger decisions for recorded messages.

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imagify::{
    config::{Cli, Command, ImagifyConfig, MarkupArgs, TriggerArgs},
    element::{content_length, line_count, serialize, serialize_with, Element},
    render::PageValues,
    CacheKey, OutboundMessage,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Check(config) => run_check(config),
        Command::Markup(args) => run_markup(args),
        Command::Trigger(args) => run_trigger(args),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose { "imagify=debug" } else { "imagify=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Read and parse a JSON input file.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&json).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn serialize_seeded(elements: &[Element], seed: Option<u64>) -> String {
    match seed {
        Some(seed) => serialize_with(elements, &mut StdRng::seed_from_u64(seed)),
        None => serialize(elements),
    }
}

// =============================================================================
// Check Command
// =============================================================================

fn run_check(config: ImagifyConfig) -> ExitCode {
    init_logging(config.verbose);

    println!("imagify Configuration Check");
    println!("═══════════════════════════");
    println!();

    if let Err(e) = config.validate() {
        println!("✗ Settings: {}", e);
        return ExitCode::FAILURE;
    }
    println!("✓ Settings");
    println!("  Quality: {}", config.quality);
    println!("  Blur: {}px", config.blur);
    if let Some(ref background) = config.background {
        println!("  Background: {}", background);
    }

    match config.trigger() {
        Ok(trigger) => {
            println!("✓ Trigger: {}", trigger.mode());
            match config.load_rules() {
                Ok(Some(rules)) => println!(
                    "  {} row(s), {} rule(s)",
                    rules.len(),
                    rules.rule_count()
                ),
                Ok(None) => println!(
                    "  Max length: {}, max lines: {}",
                    config.max_length, config.max_line_count
                ),
                Err(e) => {
                    println!("✗ Rules: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        Err(e) => {
            println!("✗ Trigger: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match config.load_style() {
        Ok(style) => println!("✓ Style ({} bytes)", style.len()),
        Err(e) => {
            println!("✗ Style: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match config.load_template() {
        Ok(template) => println!("✓ Template ({} bytes)", template.source().len()),
        Err(e) => {
            println!("✗ Template: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match config.build_store() {
        Ok(Some(store)) => println!(
            "✓ Cache: {} store, threshold {}",
            store.name(),
            config.cache_threshold
        ),
        Ok(None) => println!("✓ Cache: disabled"),
        Err(e) => {
            println!("✗ Cache: {}", e);
            return ExitCode::FAILURE;
        }
    }

    println!(
        "✓ Render pool: {} worker(s), {}ms acquire timeout",
        config.pool_size, config.acquire_timeout_ms
    );

    println!();
    println!("═══════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}

// =============================================================================
// Markup Command
// =============================================================================

fn run_markup(args: MarkupArgs) -> ExitCode {
    init_logging(args.config.verbose);

    let elements: Vec<Element> = match read_json(&args.input) {
        Ok(elements) => elements,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let markup = serialize_seeded(&elements, args.seed);
    if !args.page {
        println!("{}", markup);
        return ExitCode::SUCCESS;
    }

    let config = &args.config;
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }
    let page = config.load_style().and_then(|style| {
        let template = config.load_template()?;
        Ok(template.render(&PageValues {
            style: &style,
            background: config.background.as_deref(),
            blur: config.blur,
            element: &markup,
        }))
    });

    match page {
        Ok(page) => {
            println!("{}", page);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Configuration error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Trigger Command
// =============================================================================

fn run_trigger(args: TriggerArgs) -> ExitCode {
    init_logging(args.config.verbose);

    let config = &args.config;
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let message: OutboundMessage = match read_json(&args.input) {
        Ok(message) => message,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (trigger, salt) = match config.trigger().and_then(|t| Ok((t, config.salt()?))) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let fires = trigger.fires(&message);
    let markup = serialize_seeded(&message.elements, args.seed);
    let key = CacheKey::derive(&markup, &salt);
    debug!("Markup for {}: {}", key, markup);

    let report = serde_json::json!({
        "mode": trigger.mode(),
        "fires": fires,
        "length": content_length(&message.elements),
        "lines": line_count(&message.elements),
        "cache_key": key.as_str(),
    });
    match serde_json::to_string_pretty(&report) {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
