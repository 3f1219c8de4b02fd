use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use blog::Blog;
use clap::{Parser, Subcommand};
use jsonapi::response::body_bytes;
use jsonapi::JsonApiRequest;
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// JSON:API server hosting the demo blog
#[derive(Parser)]
#[command(name = "jsonapi-server")]
#[command(about = "JSON:API server hosting the demo blog")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration and the resource registry
    Check,
    /// Answer one request without starting the server
    Request {
        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// Request target, e.g. /api/posts?include=author
        target: String,
        /// JSON request document
        #[arg(short, long)]
        data: Option<String>,
        /// Extra header as "name: value"; repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "jsonapi-server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
        Commands::Request {
            method,
            target,
            data,
            headers,
        } => answer_once(&config, &method, &target, data, &headers),
    }
}

fn build_blog(config: &AppConfig) -> Result<Blog> {
    Blog::with_demo_data(&config.api).context("invalid resource registry")
}

async fn run_server(config: AppConfig) -> Result<()> {
    let blog = build_blog(&config)?;
    jsonapi_server::serve(&config.server, blog.into_api()).await
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    let blog = build_blog(config)?;

    let mut kinds: Vec<&str> = blog.api().resources().map(|r| r.kind()).collect();
    kinds.sort_unstable();
    println!("Configuration check passed");
    println!("Resources: {}", kinds.join(", "));
    println!("{}", config.to_yaml()?);
    Ok(())
}

fn answer_once(
    config: &AppConfig,
    method: &str,
    target: &str,
    data: Option<String>,
    headers: &[String],
) -> Result<()> {
    let blog = build_blog(config)?;

    let mut builder = axum::http::Request::builder()
        .method(method.to_ascii_uppercase().as_str())
        .uri(target);
    if data.is_some() {
        builder = builder.header(axum::http::header::CONTENT_TYPE, jsonapi::JSON_API_MEDIA_TYPE);
    }
    for raw in headers {
        let Some((name, value)) = raw.split_once(':') else {
            bail!("header must look like \"name: value\", got {raw:?}");
        };
        builder = builder.header(name.trim(), value.trim());
    }
    let request = builder
        .body(data.unwrap_or_default().into_bytes())
        .context("invalid request")?;
    let request = JsonApiRequest::from_http(request).context("request could not be decoded")?;

    let response = blog.api().serve(&request);
    eprintln!("HTTP {}", response.status());
    let body = body_bytes(&response)?;
    if !body.is_empty() {
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
