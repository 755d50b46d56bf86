use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The runtime parameters a caller may supply alongside the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OverrideKey {
    TrackingFrame,
    PublishedFrame,
    OdomFrame,
    LaserScanTopic,
    MultiEchoLaserScanTopic,
    PointCloud2Topic,
    ImuTopic,
    OdometryTopic,
}

impl OverrideKey {
    pub const ALL: [OverrideKey; 8] = [
        OverrideKey::TrackingFrame,
        OverrideKey::PublishedFrame,
        OverrideKey::OdomFrame,
        OverrideKey::LaserScanTopic,
        OverrideKey::MultiEchoLaserScanTopic,
        OverrideKey::PointCloud2Topic,
        OverrideKey::ImuTopic,
        OverrideKey::OdometryTopic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideKey::TrackingFrame => "tracking_frame",
            OverrideKey::PublishedFrame => "published_frame",
            OverrideKey::OdomFrame => "odom_frame",
            OverrideKey::LaserScanTopic => "laser_scan_topic",
            OverrideKey::MultiEchoLaserScanTopic => "multi_echo_laser_scan_topic",
            OverrideKey::PointCloud2Topic => "point_cloud2_topic",
            OverrideKey::ImuTopic => "imu_topic",
            OverrideKey::OdometryTopic => "odometry_topic",
        }
    }

    /// Whether the resolved value is reported under `reporting`.
    pub fn is_reported(&self, reporting: OverrideReporting) -> bool {
        match reporting {
            OverrideReporting::All => true,
            OverrideReporting::None => false,
            OverrideReporting::Legacy => matches!(
                self,
                OverrideKey::TrackingFrame
                    | OverrideKey::PublishedFrame
                    | OverrideKey::OdomFrame
                    | OverrideKey::LaserScanTopic
            ),
        }
    }
}

impl fmt::Display for OverrideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverrideKey {
    type Err = String;

    /// Accepts `name`, `_name` and `~name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s
            .strip_prefix('_')
            .or_else(|| s.strip_prefix('~'))
            .unwrap_or(s);
        OverrideKey::ALL
            .into_iter()
            .find(|key| key.as_str() == name)
            .ok_or_else(|| {
                let known: Vec<_> = OverrideKey::ALL.iter().map(OverrideKey::as_str).collect();
                format!("unknown parameter '{s}', expected one of: {}", known.join(", "))
            })
    }
}

/// Which resolved overrides are reported in the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OverrideReporting {
    /// The three frames and the laser scan topic.
    #[default]
    Legacy,
    /// Every override.
    All,
    /// Nothing.
    None,
}

/// Named string values supplied by the caller. Every key reads as the
/// empty string unless set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeOverrides {
    values: BTreeMap<OverrideKey, String>,
}

impl RuntimeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OverrideKey, V)>,
        V: Into<String>,
    {
        let mut overrides = Self::new();
        for (key, value) in pairs {
            overrides.set(key, value);
        }
        overrides
    }

    pub fn set(&mut self, key: OverrideKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    pub fn with(mut self, key: OverrideKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: OverrideKey) -> &str {
        self.values.get(&key).map(String::as_str).unwrap_or("")
    }

    pub fn is_set(&self, key: OverrideKey) -> bool {
        self.values.contains_key(&key)
    }
}

/// Parses a `name:=value` command line argument.
pub fn parse_override_arg(s: &str) -> Result<(OverrideKey, String), String> {
    let (name, value) = s
        .split_once(":=")
        .ok_or_else(|| format!("invalid parameter '{s}', expected name:=value"))?;
    Ok((name.parse()?, value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_keys_read_empty() {
        let overrides = RuntimeOverrides::new().with(OverrideKey::TrackingFrame, "base_link");
        assert_eq!(overrides.get(OverrideKey::TrackingFrame), "base_link");
        for key in OverrideKey::ALL.into_iter().skip(1) {
            assert_eq!(overrides.get(key), "");
            assert!(!overrides.is_set(key));
        }
    }

    #[test]
    fn test_explicit_empty_value_is_set() {
        let overrides = RuntimeOverrides::from_pairs([(OverrideKey::ImuTopic, "")]);
        assert!(overrides.is_set(OverrideKey::ImuTopic));
        assert_eq!(overrides.get(OverrideKey::ImuTopic), "");
    }

    #[test]
    fn test_parse_override_arg() {
        assert_eq!(
            parse_override_arg("_tracking_frame:=base_link").unwrap(),
            (OverrideKey::TrackingFrame, "base_link".to_owned())
        );
        assert_eq!(
            parse_override_arg("~imu_topic:=/imu:data").unwrap(),
            (OverrideKey::ImuTopic, "/imu:data".to_owned())
        );
        assert_eq!(
            parse_override_arg("odom_frame:=").unwrap(),
            (OverrideKey::OdomFrame, String::new())
        );
    }

    #[test]
    fn test_parse_override_arg_rejects_bad_input() {
        assert!(parse_override_arg("tracking_frame=base_link").is_err());
        assert!(parse_override_arg("map_frame:=map").is_err());
    }

    #[test]
    fn test_legacy_reporting_set() {
        let reported: Vec<_> = OverrideKey::ALL
            .into_iter()
            .filter(|key| key.is_reported(OverrideReporting::Legacy))
            .collect();
        assert_eq!(
            reported,
            [
                OverrideKey::TrackingFrame,
                OverrideKey::PublishedFrame,
                OverrideKey::OdomFrame,
                OverrideKey::LaserScanTopic,
            ]
        );
    }
}
