use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use apikit::{
    ApiConfig, ApiManager, Envelope, Method, RequestError, RequestOptions, RetryPolicy, UploadFile,
};
use clap::Parser;
use serde_json::Value;

/// apikit - call a JSON REST backend and print the normalized envelope
///
/// If the APIKIT_TOKEN environment variable is set, it is sent as a bearer token.
///
/// Examples:
///   apikit --base-url https://api.example.com get /users -q page=2
///   apikit post /users --data '{"name":"Ada"}'
#[derive(Parser, Debug)]
#[command(author, version = env!("APIKIT_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the backend (also via APIKIT_BASE_URL)
    #[arg(long, env = "APIKIT_BASE_URL", value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Bearer token (also via APIKIT_TOKEN)
    #[arg(long, env = "APIKIT_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Start from a preset configuration
    #[arg(long, value_enum, global = true)]
    profile: Option<Profile>,

    /// Connect, send and receive timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Maximum attempts for idempotent requests
    #[arg(long, value_name = "N", global = true)]
    retries: Option<u32>,

    /// Delay between attempts in seconds
    #[arg(long, value_name = "SECS", global = true)]
    retry_delay: Option<u64>,

    /// Disable retries
    #[arg(long, global = true)]
    no_retry: bool,

    /// Extra request header, repeatable
    #[arg(
        long = "header",
        short = 'H',
        value_name = "NAME=VALUE",
        value_parser = parse_key_value,
        global = true
    )]
    headers: Vec<(String, String)>,

    /// Log requests and responses
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Profile {
    Development,
    Production,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Send a GET request
    Get(ReadArgs),

    /// Send a DELETE request
    Delete(ReadArgs),

    /// Send a POST request
    Post(WriteArgs),

    /// Send a PUT request
    Put(WriteArgs),

    /// Send a PATCH request
    Patch(WriteArgs),

    /// Upload a file as multipart/form-data
    Upload(UploadArgs),
}

#[derive(clap::Args, Debug)]
struct ReadArgs {
    /// Path relative to the base URL
    path: String,

    /// Query parameter, repeatable
    #[arg(long = "query", short = 'q', value_name = "KEY=VALUE", value_parser = parse_key_value)]
    query: Vec<(String, String)>,
}

#[derive(clap::Args, Debug)]
struct WriteArgs {
    #[command(flatten)]
    target: ReadArgs,

    /// JSON request body
    #[arg(long, short = 'd', value_name = "JSON")]
    data: Option<String>,
}

#[derive(clap::Args, Debug)]
struct UploadArgs {
    /// Path relative to the base URL
    path: String,

    /// File to upload
    file: PathBuf,

    /// Form field name for the file
    #[arg(long, default_value = "file")]
    field: String,

    /// Extra form field, repeatable
    #[arg(long = "form", short = 'F', value_name = "KEY=VALUE", value_parser = parse_key_value)]
    form: Vec<(String, String)>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn build_config(cli: &Cli) -> Result<ApiConfig> {
    let mut config = match cli.profile {
        Some(Profile::Development) => ApiConfig::development(),
        Some(Profile::Production) => ApiConfig::production(),
        None => ApiConfig::default(),
    };

    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.as_str())?;
    }
    if let Some(token) = &cli.token {
        config = config.with_auth_token(token.as_str());
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeouts_secs(secs, secs, secs);
    }
    if cli.retries.is_some() || cli.retry_delay.is_some() {
        let current = config.retry;
        config = config.with_retry_policy(RetryPolicy::new(
            cli.retries.unwrap_or(current.max_attempts),
            cli.retry_delay
                .map(std::time::Duration::from_secs)
                .unwrap_or(current.delay),
        ));
    }
    if cli.no_retry {
        config = config.with_retry(false);
    }
    if !cli.headers.is_empty() {
        config = config.with_headers(cli.headers.clone());
    }
    Ok(config.with_logging(cli.verbose))
}

fn describe(error: RequestError) -> anyhow::Error {
    match error {
        RequestError::Api(e) => match e.status_code {
            Some(status) => anyhow!("{} (HTTP {}: {})", e.user_message(), status, e.message),
            None => anyhow!("{} ({})", e.user_message(), e.message),
        },
        other => anyhow::Error::from(other),
    }
}

async fn run(cli: Cli) -> Result<Envelope<Value>> {
    let manager = ApiManager::new(build_config(&cli)?)?;

    let (method, target, body) = match cli.command {
        Commands::Get(args) => (Method::GET, args, None),
        Commands::Delete(args) => (Method::DELETE, args, None),
        Commands::Post(args) => (Method::POST, args.target, args.data),
        Commands::Put(args) => (Method::PUT, args.target, args.data),
        Commands::Patch(args) => (Method::PATCH, args.target, args.data),
        Commands::Upload(args) => {
            let mut file = UploadFile::new(&args.file, &args.field);
            for (key, value) in args.form {
                file = file.field(key, value);
            }
            return manager
                .upload(&args.path, &file, &RequestOptions::new())
                .await
                .map_err(describe);
        }
    };

    let body: Option<Value> = body
        .map(|raw| serde_json::from_str(&raw).context("--data is not valid JSON"))
        .transpose()?;

    let mut options = RequestOptions::new();
    for (key, value) in target.query {
        options = options.query(key, value);
    }

    manager
        .request(method, &target.path, body.as_ref(), &options, Ok)
        .await
        .map_err(describe)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let envelope = run(cli).await?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
