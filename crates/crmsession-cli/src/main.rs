//! crmsession - operator CLI for credential-managed CRM sessions.
//!
//! Writes the config file, seeds a credential bundle into the configured
//! secret store, reports whether a session is cached, and issues one
//! authenticated call through the credential-managed client.

use std::io;

use anyhow::{bail, Context, Result};
use crmsession_core::{
    AuthMode, Config, CredentialBundle, CredentialManagedClient, Method, RestClient, StoreBackend,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage:
  crmsession init --identity-ref <REF> [--store file|keyring] [--login-url <URL>]
  crmsession seed --domain <DOMAIN> --consumer-key <KEY>
  crmsession status
  crmsession call <METHOD> <TARGET> [JSON]

The identity ref is read from CRMSESSION_IDENTITY_REF or the config file.";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match args.first().map(String::as_str) {
        None | Some("-h") | Some("--help") | Some("help") => {
            println!("{}", USAGE);
            return Ok(());
        }
        Some(command) => command,
    };

    let mut config = Config::load().context("Failed to load configuration")?;
    if command == "init" {
        return init(&mut config, &args[1..]);
    }

    let identity_ref = config
        .resolve_identity_ref()
        .context("No identity ref configured (run `crmsession init` or set CRMSESSION_IDENTITY_REF)")?;

    match command {
        "seed" => seed(&config, &identity_ref, &args[1..]),
        "status" => status(&config, &identity_ref),
        "call" => call(&config, &identity_ref, &args[1..]).await,
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
}

/// Value following `flag` in `args`, if any.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Apply `init` flags to `config`. Flags that are not given keep their value.
fn apply_init_args(config: &mut Config, args: &[String]) -> Result<()> {
    let identity_ref = flag_value(args, "--identity-ref").context("--identity-ref is required")?;
    if identity_ref.trim().is_empty() {
        bail!("--identity-ref must not be empty");
    }
    let store = match flag_value(args, "--store") {
        None => config.store,
        Some("file") => StoreBackend::File,
        Some("keyring") => StoreBackend::Keyring,
        Some(other) => bail!("Unknown store '{}' (expected file or keyring)", other),
    };

    config.identity_ref = Some(identity_ref.to_string());
    config.store = store;
    if let Some(login_url) = flag_value(args, "--login-url") {
        config.login_url = Some(login_url.to_string());
    }
    Ok(())
}

fn init(config: &mut Config, args: &[String]) -> Result<()> {
    apply_init_args(config, args)?;
    config.save().context("Failed to save configuration")?;

    let path = Config::config_path()?;
    info!(path = %path.display(), "Wrote configuration");
    println!("Wrote {}", path.display());
    Ok(())
}

/// Write a bundle with identity only; any cached session is dropped.
fn seed(config: &Config, identity_ref: &str, args: &[String]) -> Result<()> {
    let domain = flag_value(args, "--domain").context("--domain is required")?;
    let consumer_key = flag_value(args, "--consumer-key").context("--consumer-key is required")?;
    let consumer_secret = rpassword::prompt_password("Consumer secret: ")
        .context("Failed to read consumer secret")?;
    if consumer_secret.is_empty() {
        bail!("Consumer secret must not be empty");
    }

    let store = config.open_secret_store()?;
    CredentialBundle::new(domain, consumer_key, consumer_secret).save(store.as_ref(), identity_ref)?;

    info!(identity_ref, "Seeded credential bundle");
    println!("Stored credentials for {}", identity_ref);
    Ok(())
}

fn status(config: &Config, identity_ref: &str) -> Result<()> {
    let store = config.open_secret_store()?;
    let bundle = CredentialBundle::load(store.as_ref(), identity_ref)?;

    println!("Identity ref:   {}", identity_ref);
    println!("Domain:         {}", bundle.domain);
    println!("Consumer key:   {}", bundle.consumer_key);
    match bundle.instance.as_deref() {
        Some(instance) if bundle.has_cached_session() => {
            println!("Cached session: yes ({})", instance)
        }
        _ => println!("Cached session: no"),
    }
    Ok(())
}

async fn call(config: &Config, identity_ref: &str, args: &[String]) -> Result<()> {
    let (Some(method), Some(target)) = (args.first(), args.get(1)) else {
        bail!("call needs a METHOD and a TARGET\n\n{}", USAGE);
    };
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", method))?;
    let params = args
        .get(2)
        .map(|raw| serde_json::from_str::<serde_json::Value>(raw))
        .transpose()
        .context("Parameters must be valid JSON")?;

    let rest = RestClient::with_config(config.rest_client_config())?;
    let mut client = CredentialManagedClient::builder()
        .identity_ref(identity_ref)
        .secret_store(config.open_secret_store()?)
        .connect(rest)
        .await?;

    if client.auth_mode() == AuthMode::ResumedSession {
        info!("Using cached session");
    }

    let response = client.dispatch(method, target, params).await?;
    println!("{}", serde_json::to_string_pretty(&response.body)?);
    Ok(())
}
