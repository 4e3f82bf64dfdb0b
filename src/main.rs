//! twigpress CLI
//!
//! Runs entity requests through the pipeline with the local echo compiler
//! and prints the outcome as JSON.
//!
//! Usage:
//!   twigpress --config twigpress.yaml requests.json
//!   twigpress --config twigpress.yaml requests.json --batch --variant claro=dark
//!
//! `requests.json` holds one request object or an array of them. With
//! `--batch` every request is staged in the scratch directory and one
//! outcome per entity is printed.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use twigpress::{
    run_batch, EchoCompiler, EntityRequest, Pipeline, StorageMode, Stores, TwigpressConfig,
};

#[derive(Parser, Debug)]
#[command(name = "twigpress")]
#[command(about = "Compile layout documents into per-theme twig templates")]
struct Args {
    /// YAML configuration file
    #[arg(long, short = 'c')]
    config: PathBuf,

    /// JSON file with one request or an array of requests
    requests: PathBuf,

    /// Stage every template in the scratch directory
    #[arg(long)]
    batch: bool,

    /// Render requests as previews
    #[arg(long)]
    preview: bool,

    /// Make a theme's output diverge, as theme=class (repeatable)
    #[arg(long, value_parser = parse_variant)]
    variant: Vec<(String, String)>,
}

fn parse_variant(s: &str) -> Result<(String, String), String> {
    let (theme, class) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid theme=class: no `=` found in `{s}`"))?;
    Ok((theme.to_string(), class.to_string()))
}

fn init_tracing(cfg: &TwigpressConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(cfg.logging.filter.as_str())
        .with_target(false)
        .with_writer(std::io::stderr);
    if cfg.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_requests(path: &Path) -> Result<Vec<EntityRequest>, Box<dyn Error>> {
    let raw: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    let requests = match raw {
        Value::Array(_) => serde_json::from_value(raw)?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(requests)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let cfg = TwigpressConfig::from_file(&args.config)?;
    init_tracing(&cfg);

    let themes = if cfg.themes.is_empty() {
        vec![cfg.reconcile.generic_theme.clone()]
    } else {
        cfg.themes.clone()
    };
    let compiler = args
        .variant
        .iter()
        .fold(EchoCompiler::new(themes), |compiler, (theme, class)| {
            compiler.with_variant(theme.clone(), class.clone())
        });

    let mut requests = load_requests(&args.requests)?;
    for request in &mut requests {
        request.preview |= args.preview;
        if args.batch {
            request.mode = StorageMode::Temporary;
        }
    }

    let pipeline = Pipeline::new(cfg, Arc::new(compiler), Stores::local())?;

    if args.batch {
        let outcomes = run_batch(&pipeline, &requests);
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        if outcomes.iter().any(|o| !o.success) {
            std::process::exit(1);
        }
        return Ok(());
    }

    let mut failed = false;
    for request in &requests {
        match pipeline.process(request) {
            Ok(report) => {
                failed |= !report.success;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Err(err) => {
                failed = true;
                eprintln!("{}: {err}", request.entity.template_name);
            }
        }
    }
    if failed {
        std::process::exit(1);
    }
    Ok(())
}
