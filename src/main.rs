use std::io::Read as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use euporie_lib::config::{load_config, AppConfig};
use euporie_lib::perception::extractor::{ElementExtractor, ScreenSource};
use euporie_lib::perception::types::ExtractionPolicy;
use euporie_lib::{ErrorReply, EuporieError, EuporieResult, InvokeRequest, Orchestrator};

#[derive(Parser, Debug)]
#[command(
    name = "euporie",
    version,
    about = "Decide whether a mobile screen needs test data, and generate it"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.toml (default: next to the executable, then the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one request and print the JSON response
    Invoke {
        /// Request JSON file, or `-` for stdin
        request: String,
    },
    /// Print the canonical element mapping of a hierarchy
    Extract {
        /// Inline markup, file path, or http(s) URL
        source: String,

        /// Overrides `[extraction] policy`
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    InputFieldsOnly,
    AllClickable,
}

impl From<PolicyArg> for ExtractionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::InputFieldsOnly => ExtractionPolicy::InputFieldsOnly,
            PolicyArg::AllClickable => ExtractionPolicy::AllClickable,
        }
    }
}

fn read_request(path: &str) -> EuporieResult<InvokeRequest> {
    let raw = if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    serde_json::from_str(&raw)
        .map_err(|e| EuporieError::InvalidRequest(format!("request is not valid JSON: {e}")))
}

async fn run_invoke(config: &AppConfig, path: &str) -> Result<String, (EuporieError, Option<String>)> {
    let request = read_request(path).map_err(|e| (e, None))?;
    let request_id = request.request_id.clone();
    let orchestrator = Orchestrator::from_config(config).map_err(|e| (e, request_id.clone()))?;
    let response = orchestrator
        .invoke(request)
        .await
        .map_err(|e| (e, request_id))?;
    serde_json::to_string_pretty(&response).map_err(|e| (e.into(), None))
}

async fn run_extract(
    config: &AppConfig,
    source: String,
    policy: Option<PolicyArg>,
) -> EuporieResult<String> {
    let policy = policy.map(Into::into).unwrap_or(config.extraction.policy);
    let extractor = ElementExtractor::new(reqwest::Client::new(), policy);
    let extraction = extractor.extract(&ScreenSource::Hierarchy(source)).await?;
    Ok(serde_json::to_string_pretty(&extraction.elements)?)
}

fn exit_code(err: &EuporieError) -> ExitCode {
    if err.is_client_error() {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    euporie_lib::init_tracing();

    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if cli.config.is_none() => {
            tracing::warn!(error = %e, "no usable config.toml; using defaults");
            AppConfig::default()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            return ExitCode::from(1);
        }
    };

    match cli.command {
        Commands::Invoke { request } => match run_invoke(&config, &request).await {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err((err, request_id)) => {
                tracing::error!(error = %err, "request failed");
                let reply = ErrorReply::from_error(&err, request_id);
                if let Ok(json) = serde_json::to_string_pretty(&reply) {
                    println!("{json}");
                }
                exit_code(&err)
            }
        },
        Commands::Extract { source, policy } => match run_extract(&config, source, policy).await {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("extraction failed: {err}");
                exit_code(&err)
            }
        },
    }
}
