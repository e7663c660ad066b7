//! snmpfleet: run a fleet of simulated SNMP agents from a YAML config.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use snmpfleet::agent::SnmpAgent;
use snmpfleet::config::load_fleet;
use snmpfleet::device::DeviceFactory;

/// Simulate a fleet of SNMP-capable network devices.
#[derive(Debug, Parser)]
#[command(name = "snmpfleet", version, about)]
struct Args {
    /// Fleet configuration file (a YAML list of agents).
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let configs = match load_fleet(&args.config) {
        Ok(configs) => configs,
        Err(err) => {
            error!(%err, "could not load fleet configuration");
            return ExitCode::FAILURE;
        }
    };
    if configs.is_empty() {
        error!(config = %args.config.display(), "fleet configuration lists no agents");
        return ExitCode::FAILURE;
    }

    // One factory per process, shared by all agents.
    let factory = DeviceFactory::new();

    // Assembly failures (missing walk, bad address) skip the agent but do
    // not stop the rest of the fleet.
    let mut agents = Vec::with_capacity(configs.len());
    let mut failures = 0usize;
    for config in &configs {
        match SnmpAgent::assemble(config, &factory) {
            Ok(agent) => agents.push(Arc::new(agent)),
            Err(err) => {
                error!(agent = %config.name(), %err, "could not assemble agent");
                failures += 1;
            }
        }
    }

    let (stop, shutdown) = watch::channel(false);

    // Bind everything up front so port conflicts surface before serving.
    let mut handles = Vec::with_capacity(agents.len());
    for agent in agents {
        match agent.bind().await {
            Ok(socket) => {
                handles.push(tokio::spawn(agent.clone().serve(socket, shutdown.clone())));
            }
            Err(err) => {
                error!(%err, "could not bind agent");
                failures += 1;
            }
        }
    }

    if handles.is_empty() {
        error!("no agent could be started");
        return ExitCode::FAILURE;
    }

    info!(agents = handles.len(), "fleet started");

    let _ = tokio::signal::ctrl_c().await;
    info!("interrupt received, shutting down");
    let _ = stop.send(true);

    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(%err, "agent failed");
                failures += 1;
            }
            Err(err) => {
                error!(%err, "agent task panicked");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
