//! Warden - entry point
//!
//! Loads configuration, installs logging and serves until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use bytes::Bytes;
use warden_config::{ConfigLoader, LogFormat, WardenConfig, DEFAULT_ENV_PREFIX};
use warden_core::{SessionContext, Status};
use warden_server::{Server, ServiceRegistry};
use warden_telemetry::{init_logging, LogConfig};

/// Method reporting the caller's authenticated subject.
const WHOAMI_PATH: &str = "/warden.Session/WhoAmI";

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = args
                        .next()
                        .ok_or_else(|| "--config requires a path".to_string())?;
                    config = Some(PathBuf::from(path));
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("warden {}", warden_server::VERSION);
                    std::process::exit(0);
                }
                other => return Err(format!("unknown argument: {other}")),
            }
        }

        Ok(Self { config })
    }
}

fn print_help() {
    println!(
        r"Warden - bearer-token gate for unary RPC services

USAGE:
    warden [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    WARDEN__SERVER__ADDR            Listen address (default: 0.0.0.0:50051)
    WARDEN__SECURITY__ENABLED       Serve over TLS (default: true)
    WARDEN__SECURITY__TLS_CERT      PEM certificate chain
    WARDEN__SECURITY__TLS_KEY       PEM private key
    WARDEN__AUTH__SIGNING_KEY       HMAC signing secret
    WARDEN__AUTH__SIGNING_KEY_FILE  File holding the HMAC signing secret
    WARDEN__AUTH__ISSUER            Required token issuer (default: warden)
    WARDEN__LOGGING__LEVEL          Log filter (default: info)
    WARDEN__LOGGING__FORMAT         json or pretty (default: json)

A .env file in the working directory is loaded before the environment.
"
    );
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<WardenConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = path {
        loader = loader
            .with_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
    }

    loader
        .with_dotenv()?
        .with_env_prefix(DEFAULT_ENV_PREFIX)
        .load()
        .context("invalid configuration")
}

fn log_config(config: &WardenConfig) -> LogConfig {
    let base = match config.logging.format {
        LogFormat::Json => LogConfig::production(),
        LogFormat::Pretty => LogConfig::development(),
    };
    LogConfig {
        level: config.logging.level.clone(),
        ..base
    }
}

fn registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    registry.register(WHOAMI_PATH, |ctx, _body: Bytes| async move {
        SessionContext::retrieve(&ctx)
            .map(|session| Bytes::from(session.subject().unwrap_or_default().to_string()))
            .map_err(Status::from)
    });
    registry
}

async fn run(config: WardenConfig) -> anyhow::Result<()> {
    tracing::info!(
        version = warden_server::VERSION,
        service.name = %config.service_name,
        "starting warden"
    );

    let server = Server::new(&config, registry())
        .await
        .context("failed to construct server")?;
    server.run().await.context("server error")?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Use --help for usage information");
            return ExitCode::FAILURE;
        }
    };

    let config = match load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&log_config(&config)) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "warden exited with an error");
            ExitCode::FAILURE
        }
    }
}
