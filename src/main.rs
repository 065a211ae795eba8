use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kong_admin::{format_kong_error, AdminApi, Config, MutationParams, Route};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Command-line client for the Kong admin API
#[derive(Parser, Debug)]
#[command(name = "kong-admin", version, about, long_about = None)]
struct Args {
    /// Admin API host (e.g. localhost:8001)
    #[arg(long)]
    host: Option<String>,

    /// Use HTTPS
    #[arg(long)]
    https: bool,

    /// Never fetch consumers
    #[arg(long)]
    ignore_consumers: bool,

    /// Disable the request cache
    #[arg(long)]
    no_cache: bool,

    /// Page-size hint for collection reads (0 lets the server decide)
    #[arg(long)]
    page_size: Option<usize>,

    /// Persist the effective settings as the new defaults
    #[arg(long)]
    save_config: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List APIs
    Apis,
    /// List global plugins
    GlobalPlugins,
    /// List plugins of one API
    Plugins { api_id: String },
    /// List consumers
    Consumers,
    /// List a consumer's credentials for an auth plugin
    Credentials { consumer_id: String, plugin: String },
    /// List a consumer's ACL groups
    Acls { consumer_id: String },
    /// List upstreams
    Upstreams,
    /// List active targets of an upstream
    Targets { upstream_id: String },
    /// Show schemas of all enabled plugins
    Schemas,
    /// Show the server version
    Version,
    /// Read any route as JSON
    Get {
        /// Route name (apis, plugins-enabled, upstream-targets, ...)
        route: String,
        /// Route parameter as key=value (apiId, consumerId, plugin, ...)
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// Issue a state-changing request
    Request {
        /// HTTP method (POST, PATCH, PUT, DELETE)
        method: String,
        /// Route name
        route: String,
        /// Route parameter as key=value
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {:?}", s))
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(Level::TRACE))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("kong-admin started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("kong-admin").join("kong-admin.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".kong-admin").join("kong-admin.log");
    }
    PathBuf::from("kong-admin.log")
}

/// Config file values overridden by command-line flags
fn effective_config(args: &Args) -> Config {
    let mut config = Config::load();

    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if args.https {
        config.use_https = true;
    }
    if args.ignore_consumers {
        config.ignore_consumers = true;
    }
    if args.no_cache {
        config.enable_cache = false;
    }
    if let Some(size) = args.page_size {
        config.page_size = (size > 0).then_some(size);
    }

    config
}

fn route_from(name: &str, params: &[(String, String)]) -> Result<Route> {
    let params: HashMap<String, String> = params.iter().cloned().collect();
    Ok(Route::from_descriptor(name, &params)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(api: &AdminApi, command: Command) -> Result<()> {
    match command {
        Command::Apis => print_json(&api.fetch_apis().await.context("Failed to fetch APIs")?),
        Command::GlobalPlugins => print_json(
            &api.fetch_global_plugins()
                .await
                .context("Failed to fetch plugins")?,
        ),
        Command::Plugins { api_id } => print_json(
            &api.fetch_plugins(&api_id)
                .await
                .with_context(|| format!("Failed to fetch plugins of API {}", api_id))?,
        ),
        Command::Consumers => print_json(
            &api.fetch_consumers()
                .await
                .context("Failed to fetch consumers")?,
        ),
        Command::Credentials { consumer_id, plugin } => print_json(
            &api.fetch_consumer_credentials(&consumer_id, &plugin)
                .await
                .with_context(|| format!("Failed to fetch {} credentials of {}", plugin, consumer_id))?,
        ),
        Command::Acls { consumer_id } => print_json(
            &api.fetch_consumer_acls(&consumer_id)
                .await
                .with_context(|| format!("Failed to fetch ACLs of {}", consumer_id))?,
        ),
        Command::Upstreams => print_json(
            &api.fetch_upstreams()
                .await
                .context("Failed to fetch upstreams")?,
        ),
        Command::Targets { upstream_id } => print_json(
            &api.fetch_targets(&upstream_id)
                .await
                .with_context(|| format!("Failed to fetch targets of {}", upstream_id))?,
        ),
        Command::Schemas => {
            let schemas = api
                .fetch_plugin_schemas()
                .await
                .context("Failed to fetch plugin schemas")?;
            if schemas.is_empty() {
                eprintln!("No plugins enabled on the server.");
            }
            print_json(&*schemas)
        }
        Command::Version => {
            let version = api
                .fetch_kong_version()
                .await
                .context("Failed to fetch server version")?;
            println!("{}", version);
            Ok(())
        }
        Command::Get { route, params } => {
            let route = route_from(&route, &params)?;
            print_json(
                &api.fetch_route(&route)
                    .await
                    .with_context(|| format!("Failed to read {}", route.name()))?,
            )
        }
        Command::Request {
            method,
            route,
            params,
            body,
        } => {
            let route = route_from(&route, &params)?;
            let method = method
                .to_uppercase()
                .parse()
                .with_context(|| format!("Invalid HTTP method: {}", method))?;

            let mut mutation = MutationParams::new(method);
            if let Some(body) = body {
                let body = serde_json::from_str(&body).context("Request body is not valid JSON")?;
                mutation = mutation.with_body(body);
            }

            let response = api
                .request_endpoint(&route, mutation)
                .await
                .with_context(|| format!("Request to {} failed", route.name()))?;

            println!("{} {}", response.status, response.status_text);
            if !response.body.is_empty() {
                println!("{}", response.body);
            }

            if !response.is_success() {
                anyhow::bail!("Server rejected the request with status {}", response.status);
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let config = effective_config(&args);
    if args.save_config {
        if let Err(err) = config.save() {
            eprintln!("Warning: could not save config: {err:#}");
        }
    }

    tracing::info!("Using admin API at {} (https: {})", config.host, config.use_https);

    let result = match AdminApi::connect(&config) {
        Ok(api) => run(&api, args.command).await,
        Err(err) => Err(err.context("Initialization error")),
    };

    if let Err(err) = result {
        tracing::error!("{:#}", err);
        eprintln!("Error: {}", format_kong_error(&err));
        std::process::exit(1);
    }
}
