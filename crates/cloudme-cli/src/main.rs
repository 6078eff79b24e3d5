//! cloudme - deploy a microservice application from its descriptor.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cloudme_core::config::DaemonConfig;
use cloudme_core::domain::Descriptor;
use cloudme_core::{Coordinator, FailurePolicy, PipelineReport, RuntimeKind, observability, runtime};

#[derive(Debug, Parser)]
#[command(name = "cloudme")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the application descriptor (JSON).
    #[arg(long, short = 'c')]
    config: PathBuf,

    /// Container runtime.
    #[arg(long, default_value = "docker")]
    runtime: RuntimeKind,

    /// Docker daemon endpoint, e.g. tcp://127.0.0.1:2376.
    #[arg(long, env = "DOCKER_HOST")]
    docker_host: Option<String>,

    /// Empty or "0" disables TLS.
    #[arg(long, env = "DOCKER_TLS_VERIFY")]
    tls_verify: Option<String>,

    /// Directory holding ca.pem, cert.pem and key.pem.
    #[arg(long, env = "DOCKER_CERT_PATH")]
    cert_path: Option<PathBuf>,

    /// Cancel every pending stage after the first failure.
    #[arg(long)]
    fail_fast: bool,

    /// Slack for a stage waiting on its predecessor, on top of the
    /// predecessors' own stage timeouts.
    #[arg(long, default_value_t = 600)]
    wait_timeout_secs: u64,

    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,

    /// Debug logging.
    #[arg(long, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Build every service image.
    Build,
    /// Build, run and verify every service.
    Deploy,
    /// Remove every service container.
    Cleanup,
    /// Not implemented.
    Create,
    /// Not implemented.
    Getlogs,
}

impl Cli {
    fn daemon(&self) -> DaemonConfig {
        DaemonConfig::new(
            self.docker_host.clone(),
            DaemonConfig::tls_flag(self.tls_verify.as_deref()),
            self.cert_path.clone(),
        )
    }

    fn failure_policy(&self) -> FailurePolicy {
        if self.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Continue
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    observability::init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!(error = %format!("{err:#}"), "cloudme failed");
            ExitCode::FAILURE
        }
    }
}

/// `Ok(false)` means the pipeline ran but at least one stage failed.
async fn run(cli: Cli) -> Result<bool> {
    let descriptor = Descriptor::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    if matches!(cli.command, Command::Create | Command::Getlogs) {
        info!(command = ?cli.command, "command is not implemented; nothing to do");
        return Ok(true);
    }

    if matches!(cli.command, Command::Build | Command::Deploy) {
        println!(
            "{} version {}",
            descriptor.application.name, descriptor.application.version
        );
    }

    let adapter = runtime::connect(cli.runtime, &cli.daemon(), &descriptor.context_dir())
        .context("connecting to the container runtime")?;
    let coordinator = Coordinator::builder(adapter)
        .wait_timeout(Duration::from_secs(cli.wait_timeout_secs))
        .poll_interval(Duration::from_millis(cli.poll_interval_ms))
        .failure_policy(cli.failure_policy())
        .build()
        .context("invalid pipeline settings")?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling pipeline");
            interrupt.cancel();
        }
    });

    let descriptor = Arc::new(descriptor);
    let report = match cli.command {
        Command::Build => coordinator.build_all(descriptor, cancel).await?,
        Command::Deploy => coordinator.deploy_all(descriptor, cancel).await?,
        Command::Cleanup => coordinator.delete_all(descriptor, cancel).await?,
        Command::Create | Command::Getlogs => return Ok(true),
    };

    print_summary(&report, coordinator.runtime_name());
    Ok(report.is_success())
}

fn print_summary(report: &PipelineReport, runtime: &str) {
    for service in &report.services {
        for (stage, outcome) in &service.stages {
            let at = outcome.at().format("%H:%M:%S");
            match outcome.failure_detail() {
                None => println!("{at} {:<24} {:<7} ok", service.name, stage),
                Some(failure) => println!(
                    "{at} {:<24} {:<7} FAILED {:?}: {}",
                    service.name, stage, failure.kind, failure.message
                ),
            }
        }
    }

    let counts = report.counts();
    println!(
        "{} ({runtime}): {} succeeded, {} failed",
        report.run_id, counts.succeeded, counts.failed
    );
}
