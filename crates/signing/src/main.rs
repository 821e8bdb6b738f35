use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use http::Method;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use http_signing::{
    HashAlgorithm, HttpSigner, RequestDescriptor, SigningAlgorithm, SigningConfiguration,
};

/// Signs one HTTP request and prints the headers to attach to it.
#[derive(Parser)]
#[clap(name = "sign-request")]
struct Args {
    #[clap(long, env = "HTTP_SIGNING_KEY_ID")]
    key_id: String,
    #[clap(long, env = "HTTP_SIGNING_KEY_FILE")]
    key_file: PathBuf,
    #[clap(long, env = "HTTP_SIGNING_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,
    /// Space separated, e.g. "(request-target) (created) digest".
    #[clap(long, env = "HTTP_SIGNING_HEADERS", value_delimiter = ' ')]
    signing_headers: Vec<String>,
    #[clap(long, env = "HTTP_SIGNING_HASH", default_value = "SHA-256")]
    hash: HashAlgorithm,
    #[clap(long, env = "HTTP_SIGNING_ALGORITHM", default_value = "PKCS1-v15")]
    algorithm: SigningAlgorithm,
    #[clap(long, env = "HTTP_SIGNING_VALIDITY_SECONDS", default_value = "0")]
    validity_seconds: u64,

    #[clap(long, default_value = "GET")]
    method: Method,
    #[clap(long)]
    base_path: String,
    /// Path template with `{name}` placeholders.
    #[clap(long, default_value = "/")]
    path: String,
    #[clap(long = "path-param", value_parser = parse_key_value)]
    path_params: Vec<(String, String)>,
    #[clap(long = "query", value_parser = parse_key_value)]
    query: Vec<(String, String)>,
    #[clap(long = "header", value_parser = parse_key_value)]
    headers: Vec<(String, String)>,
    /// JSON body; re-serialized compactly before digesting.
    #[clap(long)]
    body: Option<String>,
    /// Unix timestamp to sign at instead of the current time.
    #[clap(long)]
    created: Option<i64>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got {s}"))
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut builder = SigningConfiguration::builder(args.key_id, args.key_file)
        .signing_headers(args.signing_headers.into_iter().filter(|name| !name.is_empty()))
        .hash_algorithm(args.hash)
        .signing_algorithm(args.algorithm)
        .validity_period_seconds(args.validity_seconds);
    if let Some(passphrase) = args.passphrase {
        builder = builder.passphrase(passphrase);
    }
    let config = builder.build().context("invalid signing configuration")?;

    let mut request = RequestDescriptor::new(args.method, args.base_path, args.path);
    for (name, value) in args.path_params {
        request = request.with_path_parameter(name, value);
    }
    for (name, value) in args.query {
        request = request.with_query_parameter(name, value);
    }
    for (name, value) in args.headers {
        request = request.with_header(name, value);
    }
    if let Some(body) = args.body {
        let body: serde_json::Value = serde_json::from_str(&body).context("--body is not JSON")?;
        request = request.with_json_body(&body)?;
    }

    let now = match args.created {
        Some(created) => DateTime::<Utc>::from_timestamp(created, 0)
            .with_context(|| format!("--created {created} is out of range"))?,
        None => Utc::now(),
    };

    let signer = HttpSigner::without_cache(config);
    let headers = signer
        .signed_headers_at(&request, now)
        .context("signing request")?;
    info!(key_id = signer.config().key_id(), "Signed request");

    for (name, value) in headers.iter() {
        println!("{name}: {value}");
    }
    Ok(())
}
