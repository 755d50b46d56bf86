use std::time::Duration;

use lua_config::ConfigError;
use thiserror::Error;

/// Why a launch configuration was rejected before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InvalidLaunchConfig {
    /// No configuration directory was supplied.
    #[error("no configuration directories given")]
    NoConfigurationDirectories,

    /// The configuration directory at `index` is an empty path.
    #[error("configuration directory {index} is empty")]
    EmptyConfigurationDirectory { index: usize },

    /// The top-level configuration basename is empty.
    #[error("configuration basename is empty")]
    EmptyBasename,
}

/// Errors that end a launch attempt.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LaunchError {
    /// The launch configuration failed validation.
    #[error("invalid launch configuration: {0}")]
    InvalidConfig(#[from] InvalidLaunchConfig),

    /// The configuration could not be resolved, parsed or read.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The service did not become reachable within `timeout`.
    #[error("start_trajectory service not available after {timeout:?}")]
    ServiceUnavailable { timeout: Duration },

    /// The start call reached the service and failed.
    #[error("failed to call start_trajectory service: {0}")]
    CallFailed(#[from] tonic::Status),

    /// The service answered without a trajectory id.
    #[error("start_trajectory service returned no trajectory id")]
    MissingTrajectoryId,
}
