//! customer-contract - customer lookup client and contract tooling
//!
//! Looks customers up, writes the consumer pact, serves it from a mock
//! provider, runs the reference provider and verifies providers against pacts.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use anyhow::Context;
use console::style;
use customer_contract::cli::{Cli, Commands};
use customer_contract::contract::{fixtures, MockServer, Pact, ProviderVerifier};
use customer_contract::service::{self, CustomerRepository, InMemoryCustomerRepository, ProviderServer};
use customer_contract::{ClientConfig, ClientError, CustomerBrowser, DefaultCustomerBrowser, HttpTransport};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

/// Main application entry point
fn run() -> i32 {
    let cli = Cli::parse_args();
    init_logging(cli.verbose, cli.log_json);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("{} Failed to start runtime: {err}", style("✗").red());
            return 1;
        }
    };

    match runtime.block_on(execute(cli)) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{} {err:#}", style("Error:").red().bold());
            err.downcast_ref::<ClientError>()
                .map_or(1, ClientError::exit_code)
        }
    }
}

/// Set up the tracing subscriber; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("customer_contract={level},warn"))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_file(false)
        .with_line_number(false);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Execute the requested command
async fn execute(cli: Cli) -> anyhow::Result<()> {
    debug!(version = env!("CARGO_PKG_VERSION"), "Starting customer-contract");

    match cli.command {
        Commands::Find {
            id,
            host,
            port,
            timeout_secs,
        } => handle_find(cli.config.as_deref(), id, host, port, timeout_secs).await,
        Commands::Pact { dir } => handle_pact(&dir),
        Commands::Stub { pact, port, state } => handle_stub(&pact, port, state.as_deref()).await,
        Commands::Serve { port, seed } => handle_serve(port, seed).await,
        Commands::Verify { pact, base_url } => {
            handle_verify(cli.config.as_deref(), &pact, &base_url).await
        }
        Commands::Version => {
            handle_version();
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ClientConfig> {
    let config = match path {
        Some(path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load_or_default()?,
    };
    Ok(config)
}

/// Handle find command
async fn handle_find(
    config_path: Option<&Path>,
    id: i64,
    host: Option<String>,
    port: Option<u16>,
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let mut browser = DefaultCustomerBrowser::from_config(&config)?;
    if let Some(secs) = timeout_secs {
        browser = browser.with_timeout(Duration::from_secs(secs));
    }

    info!(id, url = %browser.customer_url(id), "Looking up customer");
    match browser.find_by_id(id).await? {
        Some(customer) => {
            println!("{} Customer {}", style("✓").green(), style(id).bold());
            println!("  First name: {}", customer.first_name);
            println!("  Last name:  {}", customer.last_name);
        }
        None => {
            println!("{} No customer with id {}", style("✗").yellow(), style(id).bold());
        }
    }
    Ok(())
}

/// Handle pact command
fn handle_pact(dir: &Path) -> anyhow::Result<()> {
    let pact = fixtures::customer_service_pact()?;
    let path = pact.write_to_dir(dir)?;
    println!(
        "{} Wrote pact with {} interactions to {}",
        style("✓").green(),
        pact.interactions.len(),
        style(path.display()).bold()
    );
    Ok(())
}

/// Handle stub command
async fn handle_stub(pact_path: &Path, port: u16, state: Option<&str>) -> anyhow::Result<()> {
    let mut pact = Pact::load(pact_path)?;
    if let Some(state) = state {
        pact = pact.for_state(state);
        if pact.interactions.is_empty() {
            anyhow::bail!("pact has no interactions for provider state '{state}'");
        }
    }

    let server = MockServer::start_on(pact, SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await?;
    println!(
        "{} Serving {} interactions on port {}",
        style("✓").green(),
        server.pact().interactions.len(),
        style(server.port()).bold()
    );
    for interaction in &server.pact().interactions {
        println!(
            "  {} {} {}",
            style("→").cyan(),
            interaction.request.method,
            interaction.request.path.example()
        );
    }

    shutdown_signal().await;

    for (description, hits) in server.hits() {
        println!("  {description}: {hits} request(s)");
    }
    let unexpected = server.unexpected_requests().await;
    if !unexpected.is_empty() {
        warn!(count = unexpected.len(), "Requests matched no interaction");
    }
    server.shutdown().await?;
    Ok(())
}

/// Handle serve command
async fn handle_serve(port: u16, seed: bool) -> anyhow::Result<()> {
    let repository: Arc<dyn CustomerRepository> = Arc::new(InMemoryCustomerRepository::new());
    if seed {
        service::seed_test_data(repository.as_ref()).await?;
    }

    let server = ProviderServer::start(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), repository)
        .await?;
    println!(
        "{} Customer service listening on {}",
        style("✓").green(),
        style(server.address()).bold()
    );

    shutdown_signal().await;
    server.shutdown().await?;
    Ok(())
}

/// Handle verify command
async fn handle_verify(config_path: Option<&Path>, pact_path: &Path, base_url: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let pact = Pact::load(pact_path)
        .with_context(|| format!("loading pact {}", pact_path.display()))?;

    let transport = Arc::new(HttpTransport::from_config(&config)?);
    let report = ProviderVerifier::new(base_url, transport).verify(&pact).await;

    for result in &report.results {
        let mark = if result.passed() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!("{mark} {}", result.description);
        for mismatch in &result.mismatches {
            println!("    {mismatch}");
        }
    }

    let report = report.into_result()?;
    println!(
        "{} {} honours the {} pact",
        style("✓").green(),
        report.provider,
        report.consumer
    );
    Ok(())
}

/// Handle version command
fn handle_version() {
    println!("customer-contract v{}", env!("CARGO_PKG_VERSION"));
}

/// Wait for SIGTERM or Ctrl+C
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                let _ = sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        () = terminate => info!("Received SIGTERM"),
    }
}
