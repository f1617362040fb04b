//! `resilient-call`: issue one outbound call through the resilient pipeline.
//!
//! ```text
//! resilient-call [-c config.toml] [--async] [-H 'Name: value']... <verb> <url> [-d json]
//! ```
//!
//! Prints the response body on success. On failure prints the error report
//! as JSON on stderr and exits with status 1.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use resilient_client::config::{load_config, ClientConfig};
use resilient_client::observability::{logging, metrics};
use resilient_client::{BreakerRegistry, CallError, ExtraHeaders, RequestPipeline, Verb};

#[derive(Parser)]
#[command(name = "resilient-call")]
#[command(about = "Issue an HTTP call with timeout, retry and circuit breaking", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the non-blocking entry point
    #[arg(long = "async")]
    use_async: bool,

    /// Extra header, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,

    /// JSON request body
    #[arg(short, long)]
    data: Option<String>,

    /// get, post, put, patch or delete
    verb: Verb,

    /// Absolute URL, or a path relative to http.base_url
    url: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    tracing::debug!(
        breaker = %config.breaker_name,
        max_attempts = config.retry.max_attempts,
        call_timeout_ms = config.http.call_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let headers = parse_headers(&cli.headers)?;
    let body = cli
        .data
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()?;

    let registry = BreakerRegistry::from_configs(&config.breakers);
    let pipeline = Arc::new(RequestPipeline::new(&config, &registry)?);

    let result = if cli.use_async {
        pipeline
            .call_async(cli.verb, &cli.url, body.as_ref(), Some(&headers))
            .await
    } else {
        let pipeline = Arc::clone(&pipeline);
        let url = cli.url.clone();
        let verb = cli.verb;
        tokio::task::spawn_blocking(move || pipeline.call_sync(verb, &url, body.as_ref(), Some(&headers))).await?
    };

    Ok(report(result))
}

fn report(result: Result<String, CallError>) -> ExitCode {
    match result {
        Ok(body) => {
            println!("{}", body);
            ExitCode::SUCCESS
        }
        Err(err) => {
            match serde_json::to_string_pretty(&err.report()) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("Error: {}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn parse_headers(raw: &[String]) -> Result<ExtraHeaders, String> {
    raw.iter()
        .map(|line| {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| format!("header must look like 'Name: value', got '{}'", line))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
