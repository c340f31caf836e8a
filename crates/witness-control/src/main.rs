//! Witness control service binary.
//!
//! Provisions the witness contract, then serves tenant configuration intake.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use witness_control::{ControlConfig, ControlService};

#[derive(Parser)]
#[command(name = "witness-control")]
#[command(about = "Provision the witness contract and serve tenant configuration")]
#[command(version)]
struct Args {
    /// Service configuration file
    #[arg(short, long, env = "WITNESS_CONTROL_CONFIG", default_value = "witness.toml")]
    config: PathBuf,

    /// Directory for the run configuration and state database
    #[arg(long, env = "WITNESS_RUN_PATH")]
    run_path: Option<PathBuf>,

    /// Directory holding the tenant's config.json
    #[arg(long, env = "WITNESS_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Directory holding contract.wasm
    #[arg(long, env = "WITNESS_CONTRACT_PATH")]
    contract_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("witness_control=info".parse()?),
        )
        .init();

    let args = Args::parse();
    info!("witness control service starting");

    let mut config = ControlConfig::from_file(&args.config)?;
    if let Some(path) = args.run_path {
        config.paths.run_dir = path;
    }
    if let Some(path) = args.config_path {
        config.paths.config_dir = path;
    }
    if let Some(path) = args.contract_path {
        config.paths.contract_dir = path;
    }

    info!(
        listen_addr = %config.server.listen_addr,
        run_dir = %config.paths.run_dir.display(),
        config_dir = %config.paths.config_dir.display(),
        contract_dir = %config.paths.contract_dir.display(),
        gateway = ?config.gateway.kind,
        "configuration loaded"
    );

    let service = ControlService::new(config);
    if let Err(e) = service.run().await {
        error!(error = %e, "control service failed");
        return Err(e.into());
    }

    Ok(())
}
