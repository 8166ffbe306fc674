//! CNPJ process search CLI
//!
//! Runs one tiered search and prints the outcome as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Public registries only
//! cnpj_search 08.049.394/0001-84
//!
//! # Labor courts, with OAB credentials
//! cnpj_search 08049394000184 --tier credentialed --category labor \
//!     --oab-number 123456 --oab-state SP --oab-password "$OAB_PASSWORD"
//!
//! # Print what a tier offers
//! cnpj_search --capabilities --tier certificated
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cnpj_process_search::{
    AuthTier, BatchedDispatcher, Catalog, ClientCertificate, HttpCredentialProvider,
    HttpTransport, LicenseCredential, SearchConfig, SearchError, SearchRequest,
    TierCredentials, TieredOrchestrator,
};

#[derive(Parser)]
#[command(name = "cnpj_search")]
#[command(version = "0.1.0")]
#[command(about = "Search court registries for proceedings involving a CNPJ")]
struct Cli {
    /// Company identifier, punctuated or bare
    #[arg(required_unless_present = "capabilities")]
    cnpj: Option<String>,

    /// anonymous, credentialed or certificated
    #[arg(long, default_value = "anonymous")]
    tier: AuthTier,

    /// Restrict the search to one court category
    #[arg(long)]
    category: Option<String>,

    #[arg(long, env = "OAB_NUMBER")]
    oab_number: Option<String>,

    #[arg(long, env = "OAB_STATE")]
    oab_state: Option<String>,

    #[arg(long, env = "OAB_PASSWORD", hide_env_values = true)]
    oab_password: Option<String>,

    /// PEM file with client certificate and private key
    #[arg(long)]
    certificate: Option<PathBuf>,

    /// YAML endpoint catalog (built-in catalog if omitted)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Print tier capabilities instead of searching
    #[arg(long)]
    capabilities: bool,

    /// Compact JSON output
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let input_error = e.downcast_ref::<SearchError>().is_some_and(|se| {
                matches!(
                    se,
                    SearchError::InvalidIdentifier(_)
                        | SearchError::UnknownCategory(_)
                        | SearchError::MissingCredential { .. }
                        | SearchError::NoEndpoints(_)
                )
            });
            if input_error {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SearchConfig::from_env()?;

    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_yaml_file(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => Catalog::builtin(),
    };

    let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
    let provider = Arc::new(HttpCredentialProvider::new(config.login_url.clone())?);
    let dispatcher = Arc::new(BatchedDispatcher::new(transport, &config));
    let orchestrator = TieredOrchestrator::new(dispatcher, Arc::new(catalog), provider, &config);

    if cli.capabilities {
        return print_json(&orchestrator.capabilities(cli.tier), cli.compact);
    }

    let mut credentials = TierCredentials::none();
    if let Some(license) =
        LicenseCredential::from_parts(cli.oab_number, cli.oab_state, cli.oab_password)
    {
        credentials = credentials.with_license(license);
    }
    if let Some(path) = &cli.certificate {
        credentials = credentials.with_certificate(ClientCertificate::from_pem_file(path)?);
    }

    let mut request = SearchRequest::new(cli.cnpj.unwrap_or_default(), cli.tier)
        .with_credentials(credentials);
    if let Some(category) = cli.category {
        request = request.with_category(category);
    }

    let outcome = orchestrator.run_search(request).await?;
    print_json(&outcome, cli.compact)
}

fn print_json(value: &impl serde::Serialize, compact: bool) -> anyhow::Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{json}");
    Ok(())
}
