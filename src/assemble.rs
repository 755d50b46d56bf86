//! Builds the outbound start request from loaded options and runtime
//! overrides.

use tracing::{debug, error, info};

use crate::builder_options::{self, SerializationError};
use crate::options::TrajectoryOptions;
use crate::overrides::{OverrideKey, OverrideReporting, RuntimeOverrides};
use crate::proto;

/// The result of assembling one request.
#[derive(Debug)]
pub struct Assembly {
    pub request: proto::StartTrajectoryRequest,
    /// Set when the builder options could not be serialized. The request is
    /// still complete, with an empty builder blob.
    pub serialization_error: Option<SerializationError>,
    /// Overrides whose resolved value was reported, in report order.
    pub reported: Vec<OverrideKey>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestAssembler {
    reporting: OverrideReporting,
}

impl RequestAssembler {
    pub fn new(reporting: OverrideReporting) -> Self {
        Self { reporting }
    }

    pub fn assemble(&self, options: &TrajectoryOptions, overrides: &RuntimeOverrides) -> Assembly {
        let (trajectory_builder_options_proto, serialization_error) =
            match builder_options::serialize(options.trajectory_builder_options.as_ref()) {
                Ok(bytes) => {
                    debug!(bytes = bytes.len(), "Serialized trajectory builder options");
                    (bytes, None)
                }
                Err(e) => {
                    error!(error = %e, "Failed to serialize trajectory builder options");
                    (Vec::new(), Some(e))
                }
            };

        let mut reported = Vec::new();
        let mut resolve = |key: OverrideKey| {
            let value = overrides.get(key).to_owned();
            if key.is_reported(self.reporting) {
                info!(parameter = %key, value = %value, "Resolved runtime parameter");
                reported.push(key);
            }
            value
        };

        let wire_options = proto::TrajectoryOptions {
            tracking_frame: resolve(OverrideKey::TrackingFrame),
            published_frame: resolve(OverrideKey::PublishedFrame),
            odom_frame: resolve(OverrideKey::OdomFrame),
            provide_odom_frame: options.provide_odom_frame,
            use_odometry: options.use_odometry,
            use_laser_scan: options.use_laser_scan,
            use_multi_echo_laser_scan: options.use_multi_echo_laser_scan,
            num_point_clouds: options.num_point_clouds,
            trajectory_builder_options_proto,
        };
        let topics = proto::SensorTopics {
            laser_scan_topic: resolve(OverrideKey::LaserScanTopic),
            multi_echo_laser_scan_topic: resolve(OverrideKey::MultiEchoLaserScanTopic),
            point_cloud2_topic: resolve(OverrideKey::PointCloud2Topic),
            imu_topic: resolve(OverrideKey::ImuTopic),
            odometry_topic: resolve(OverrideKey::OdometryTopic),
        };

        Assembly {
            request: proto::StartTrajectoryRequest {
                options: Some(wire_options),
                topics: Some(topics),
            },
            serialization_error,
            reported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{capture_logs, dictionary};
    use prost::Message;

    fn options(source: &str) -> TrajectoryOptions {
        TrajectoryOptions::from_dictionary(&dictionary(source).unwrap()).unwrap()
    }

    #[test]
    fn test_missing_overrides_are_empty() {
        let assembly = RequestAssembler::default().assemble(
            &options("return { use_odometry = true, num_point_clouds = 2 }"),
            &RuntimeOverrides::new().with(OverrideKey::TrackingFrame, "base_link"),
        );
        assert!(assembly.serialization_error.is_none());

        let wire = assembly.request.options.unwrap();
        assert_eq!(wire.tracking_frame, "base_link");
        assert_eq!(wire.published_frame, "");
        assert_eq!(wire.odom_frame, "");
        assert!(wire.use_odometry);
        assert!(!wire.use_laser_scan);
        assert_eq!(wire.num_point_clouds, 2);
        assert!(wire.trajectory_builder_options_proto.is_empty());

        let topics = assembly.request.topics.unwrap();
        assert_eq!(topics, proto::SensorTopics::default());
    }

    #[test]
    fn test_topics_come_from_overrides() {
        let overrides = RuntimeOverrides::from_pairs([
            (OverrideKey::LaserScanTopic, "scan"),
            (OverrideKey::ImuTopic, "imu"),
            (OverrideKey::OdometryTopic, "odom"),
        ]);
        let assembly = RequestAssembler::default().assemble(&options("return {}"), &overrides);
        let topics = assembly.request.topics.unwrap();
        assert_eq!(topics.laser_scan_topic, "scan");
        assert_eq!(topics.multi_echo_laser_scan_topic, "");
        assert_eq!(topics.point_cloud2_topic, "");
        assert_eq!(topics.imu_topic, "imu");
        assert_eq!(topics.odometry_topic, "odom");
    }

    #[test]
    fn test_serialization_failure_is_not_fatal() {
        let overrides = RuntimeOverrides::new().with(OverrideKey::OdomFrame, "odom");
        let broken = options("return { trajectory_builder = 0 / 0., use_laser_scan = true }");
        let healthy = options("return { use_laser_scan = true }");

        let failed = RequestAssembler::default().assemble(&broken, &overrides);
        let passed = RequestAssembler::default().assemble(&healthy, &overrides);

        assert!(matches!(
            failed.serialization_error,
            Some(SerializationError::NotATable("number"))
        ));
        assert_eq!(failed.request, passed.request);
    }

    #[test]
    fn test_serialization_outcome_is_logged() {
        let overrides = RuntimeOverrides::new();
        let healthy = options("return { trajectory_builder = { submaps = { resolution = 0.05 } } }");
        let broken = options("return { trajectory_builder = 'text' }");

        let (_, logs) = capture_logs(|| RequestAssembler::default().assemble(&healthy, &overrides));
        assert!(logs.contains("Serialized trajectory builder options"), "{logs}");
        assert!(logs.contains("bytes="), "{logs}");

        let (_, logs) = capture_logs(|| RequestAssembler::default().assemble(&broken, &overrides));
        assert!(logs.contains("Failed to serialize trajectory builder options"), "{logs}");
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let source = r#"
            return {
              trajectory_builder = { submaps = { resolution = 0.05, num_range_data = 90 } },
              use_laser_scan = true,
            }
        "#;
        let overrides = RuntimeOverrides::new().with(OverrideKey::LaserScanTopic, "scan");
        let first = RequestAssembler::default().assemble(&options(source), &overrides);
        let second = RequestAssembler::default().assemble(&options(source), &overrides);
        assert!(
            !first.request.options.as_ref().unwrap().trajectory_builder_options_proto.is_empty()
        );
        assert_eq!(first.request.encode_to_vec(), second.request.encode_to_vec());
    }

    #[test]
    fn test_reported_overrides_follow_policy() {
        let options = options("return {}");
        let overrides = RuntimeOverrides::new();

        let legacy = RequestAssembler::new(OverrideReporting::Legacy).assemble(&options, &overrides);
        assert_eq!(
            legacy.reported,
            [
                OverrideKey::TrackingFrame,
                OverrideKey::PublishedFrame,
                OverrideKey::OdomFrame,
                OverrideKey::LaserScanTopic,
            ]
        );

        let all = RequestAssembler::new(OverrideReporting::All).assemble(&options, &overrides);
        assert_eq!(all.reported, OverrideKey::ALL);

        let none = RequestAssembler::new(OverrideReporting::None).assemble(&options, &overrides);
        assert!(none.reported.is_empty());
    }
}
