use lua_config::{ConfigError, ParameterDictionary, Value};

/// Options read once from the configuration for a single trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryOptions {
    /// Opaque builder options, forwarded to the service without inspection.
    pub trajectory_builder_options: Option<Value>,
    pub provide_odom_frame: bool,
    pub use_laser_scan: bool,
    pub use_odometry: bool,
    pub use_multi_echo_laser_scan: bool,
    pub num_point_clouds: i32,
}

impl TrajectoryOptions {
    /// Reads the options from a loaded configuration. Absent flags are
    /// `false` and an absent point cloud count is `0`.
    pub fn from_dictionary(dictionary: &ParameterDictionary) -> Result<Self, ConfigError> {
        let num_point_clouds = if dictionary.has_key("num_point_clouds") {
            dictionary.get_non_negative_int("num_point_clouds")?
        } else {
            0
        };
        let num_point_clouds =
            i32::try_from(num_point_clouds).map_err(|_| ConfigError::OutOfRange {
                key: "num_point_clouds".to_owned(),
                message: format!("{num_point_clouds} does not fit in 32 bits"),
            })?;

        Ok(Self {
            trajectory_builder_options: dictionary.get("trajectory_builder").cloned(),
            provide_odom_frame: dictionary.get_bool_or("provide_odom_frame", false)?,
            use_laser_scan: dictionary.get_bool_or("use_laser_scan", false)?,
            use_odometry: dictionary.get_bool_or("use_odometry", false)?,
            use_multi_echo_laser_scan: dictionary.get_bool_or("use_multi_echo_laser_scan", false)?,
            num_point_clouds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::dictionary;

    fn options(source: &str) -> Result<TrajectoryOptions, ConfigError> {
        TrajectoryOptions::from_dictionary(&dictionary(source)?)
    }

    #[test]
    fn test_defaults_for_absent_keys() {
        let options = options("return {}").unwrap();
        assert_eq!(
            options,
            TrajectoryOptions {
                trajectory_builder_options: None,
                provide_odom_frame: false,
                use_laser_scan: false,
                use_odometry: false,
                use_multi_echo_laser_scan: false,
                num_point_clouds: 0,
            }
        );
    }

    #[test]
    fn test_reads_all_flags() {
        let options = options(
            r#"
            return {
              trajectory_builder = { anything = "goes" },
              provide_odom_frame = true,
              use_laser_scan = true,
              use_odometry = true,
              use_multi_echo_laser_scan = false,
              num_point_clouds = 2,
            }
            "#,
        )
        .unwrap();

        assert!(options.provide_odom_frame);
        assert!(options.use_laser_scan);
        assert!(options.use_odometry);
        assert!(!options.use_multi_echo_laser_scan);
        assert_eq!(options.num_point_clouds, 2);
        assert!(matches!(
            options.trajectory_builder_options,
            Some(Value::Table(_))
        ));
    }

    #[test]
    fn test_negative_point_cloud_count_rejected() {
        assert!(matches!(
            options("return { num_point_clouds = -1 }"),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_wrong_flag_type_rejected() {
        assert!(matches!(
            options("return { use_odometry = 'yes' }"),
            Err(ConfigError::TypeMismatch { .. })
        ));
    }
}
