//! Client that starts a mapping trajectory on a remote service.
//!
//! A launch resolves a layered configuration through [`lua_config`], reads
//! the [`TrajectoryOptions`](options::TrajectoryOptions) from it, combines
//! them with caller supplied [`RuntimeOverrides`] into a
//! [`StartTrajectoryRequest`](proto::StartTrajectoryRequest) and sends that
//! request once through a [`TrajectoryService`].

pub mod assemble;
pub mod builder_options;
pub mod config;
pub mod error;
pub mod grpc;
pub mod launcher;
pub mod options;
pub mod overrides;

pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/mapping.rs"));
}

#[cfg(test)]
mod test_support;

pub use assemble::{Assembly, RequestAssembler};
pub use config::LaunchConfig;
pub use error::{InvalidLaunchConfig, LaunchError};
pub use grpc::{GrpcTrajectoryService, TrajectoryService};
pub use launcher::{TrajectoryId, TrajectoryLauncher};
pub use overrides::{OverrideKey, OverrideReporting, RuntimeOverrides, parse_override_arg};
