use std::path::PathBuf;
use std::time::Duration;

use crate::error::InvalidLaunchConfig;
use crate::overrides::OverrideReporting;

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:50051";

/// Configuration for one trajectory launch.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Directories searched first, in order.
    pub configuration_directories: Vec<PathBuf>,

    /// Searched after the configuration directories, if set.
    pub installation_directory: Option<PathBuf>,

    /// Top-level configuration file name, e.g. "backpack_2d.lua".
    pub configuration_basename: String,

    pub service_url: String,

    /// How long to wait for the service before giving up.
    pub wait_timeout: Duration,

    pub reporting: OverrideReporting,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            configuration_directories: Vec::new(),
            installation_directory: None,
            configuration_basename: String::new(), // Must be set by user
            service_url: DEFAULT_SERVICE_URL.to_string(),
            wait_timeout: Duration::from_secs(10),
            reporting: OverrideReporting::default(),
        }
    }
}

impl LaunchConfig {
    /// Create a new config that loads `basename` from `directories`.
    pub fn new<I, P>(directories: I, basename: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            configuration_directories: directories.into_iter().map(Into::into).collect(),
            configuration_basename: basename.into(),
            ..Default::default()
        }
    }

    /// Set the directory searched after every configuration directory.
    pub fn with_installation_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.installation_directory = Some(directory.into());
        self
    }

    /// Set the URL of the mapping service.
    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    /// Set how long to wait for the service before giving up.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Set which resolved overrides are logged.
    pub fn with_reporting(mut self, reporting: OverrideReporting) -> Self {
        self.reporting = reporting;
        self
    }

    pub fn validate(&self) -> Result<(), InvalidLaunchConfig> {
        if self.configuration_directories.is_empty() {
            return Err(InvalidLaunchConfig::NoConfigurationDirectories);
        }
        if let Some(index) = self
            .configuration_directories
            .iter()
            .position(|dir| dir.as_os_str().is_empty())
        {
            return Err(InvalidLaunchConfig::EmptyConfigurationDirectory { index });
        }
        if self.configuration_basename.is_empty() {
            return Err(InvalidLaunchConfig::EmptyBasename);
        }
        Ok(())
    }

    /// The full search path: configuration directories, then the
    /// installation directory.
    pub(crate) fn search_path(&self) -> Vec<PathBuf> {
        self.configuration_directories
            .iter()
            .chain(self.installation_directory.as_ref())
            .cloned()
            .collect()
    }
}
