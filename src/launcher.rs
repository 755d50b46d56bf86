use std::fmt;

use lua_config::{ParameterDictionary, SearchPathResolver};
use tracing::{debug, error, info};

use crate::assemble::{Assembly, RequestAssembler};
use crate::config::LaunchConfig;
use crate::error::LaunchError;
use crate::grpc::TrajectoryService;
use crate::options::TrajectoryOptions;
use crate::overrides::RuntimeOverrides;

/// Identifier the service assigns to a started trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrajectoryId(pub i32);

impl fmt::Display for TrajectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolves the configuration, builds the start request and sends it.
#[derive(Debug, Clone)]
pub struct TrajectoryLauncher {
    config: LaunchConfig,
    assembler: RequestAssembler,
}

impl TrajectoryLauncher {
    pub fn new(config: LaunchConfig) -> Result<Self, LaunchError> {
        config.validate()?;
        Ok(Self {
            assembler: RequestAssembler::new(config.reporting),
            config,
        })
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// Resolves and evaluates the top-level configuration file.
    pub fn load_configuration(&self) -> Result<ParameterDictionary, LaunchError> {
        let resolver = SearchPathResolver::new(self.config.search_path())?;
        let dictionary =
            lua_config::load_dictionary(&resolver, &self.config.configuration_basename)?;
        debug!(
            basename = %self.config.configuration_basename,
            keys = ?dictionary.keys().collect::<Vec<_>>(),
            "Loaded configuration"
        );
        Ok(dictionary)
    }

    /// Loads the configuration and assembles the request without contacting
    /// the service.
    pub fn prepare(&self, overrides: &RuntimeOverrides) -> Result<Assembly, LaunchError> {
        let options = TrajectoryOptions::from_dictionary(&self.load_configuration()?)?;
        Ok(self.assembler.assemble(&options, overrides))
    }

    /// Prepares the request, waits for the service and calls it once.
    pub async fn launch<S>(
        &self,
        overrides: &RuntimeOverrides,
        service: &mut S,
    ) -> Result<TrajectoryId, LaunchError>
    where
        S: TrajectoryService + ?Sized,
    {
        let assembly = self.prepare(overrides)?;

        let timeout = self.config.wait_timeout;
        if !service.wait_until_available(timeout).await {
            error!(timeout = ?timeout, "start_trajectory service not available");
            return Err(LaunchError::ServiceUnavailable { timeout });
        }

        let response = service
            .start_trajectory(assembly.request)
            .await
            .inspect_err(|status| error!(status = %status, "Failed to call start_trajectory service"))?;

        match response.trajectory_id {
            Some(id) => {
                let id = TrajectoryId(id);
                info!(trajectory_id = %id, "Started trajectory");
                Ok(id)
            }
            None => {
                error!("start_trajectory service returned no trajectory id");
                Err(LaunchError::MissingTrajectoryId)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidLaunchConfig;

    #[test]
    fn test_new_validates_before_io() {
        let config = LaunchConfig::new(["/nonexistent/conf"], "");
        assert!(matches!(
            TrajectoryLauncher::new(config),
            Err(LaunchError::InvalidConfig(InvalidLaunchConfig::EmptyBasename))
        ));
    }

    #[test]
    fn test_prepare_reports_missing_file() {
        let launcher =
            TrajectoryLauncher::new(LaunchConfig::new(["/nonexistent/conf"], "robot.lua")).unwrap();
        assert!(matches!(
            launcher.prepare(&RuntimeOverrides::new()),
            Err(LaunchError::Config(lua_config::ConfigError::FileNotFound { .. }))
        ));
    }
}
