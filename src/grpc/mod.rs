pub mod service;

pub use service::{GrpcTrajectoryService, TrajectoryService};
