//! Starts one mapping trajectory and exits.
//!
//! ```text
//! start_trajectory --configuration-directory ./conf \
//!     --configuration-basename backpack_2d.lua \
//!     tracking_frame:=base_link laser_scan_topic:=scan
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use trajectory_starter::config::DEFAULT_SERVICE_URL;
use trajectory_starter::{
    GrpcTrajectoryService, LaunchConfig, OverrideKey, OverrideReporting, RuntimeOverrides,
    TrajectoryLauncher, parse_override_arg,
};

#[derive(Parser)]
#[command(name = "start_trajectory")]
#[command(about = "Start a mapping trajectory from a layered configuration", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory searched for configuration files, in the order given
    #[arg(long = "configuration-directory", required = true)]
    configuration_directories: Vec<PathBuf>,

    /// Directory holding the installed configuration files, searched last
    #[arg(long)]
    installation_directory: Option<PathBuf>,

    /// Top-level configuration file
    #[arg(long)]
    configuration_basename: String,

    /// Address of the mapping service
    #[arg(long, env = "MAPPING_SERVICE_URL", default_value = DEFAULT_SERVICE_URL)]
    service_url: String,

    /// Seconds to wait for the mapping service
    #[arg(long, default_value_t = 10)]
    wait_timeout_secs: u64,

    /// Which resolved parameters to log
    #[arg(long, value_enum, default_value_t = OverrideReporting::Legacy)]
    report_overrides: OverrideReporting,

    /// Print the resolved configuration and exit without contacting the service
    #[arg(long)]
    dump_config: bool,

    /// Runtime parameters (name:=value)
    #[arg(value_parser = parse_override_arg)]
    overrides: Vec<(OverrideKey, String)>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trajectory_starter=info".parse().unwrap())
                .add_directive("lua_config=info".parse().unwrap()),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = LaunchConfig::new(cli.configuration_directories, cli.configuration_basename)
        .with_service_url(cli.service_url)
        .with_wait_timeout(Duration::from_secs(cli.wait_timeout_secs))
        .with_reporting(cli.report_overrides);
    if let Some(directory) = cli.installation_directory {
        config = config.with_installation_directory(directory);
    }

    let launcher = TrajectoryLauncher::new(config)?;

    if cli.dump_config {
        println!("return {}", launcher.load_configuration()?);
        return Ok(());
    }

    let overrides = RuntimeOverrides::from_pairs(cli.overrides);
    let mut service = GrpcTrajectoryService::new(launcher.config().service_url.clone())?;
    let trajectory_id = launcher.launch(&overrides, &mut service).await?;
    info!(trajectory_id = %trajectory_id, "Done");
    Ok(())
}
