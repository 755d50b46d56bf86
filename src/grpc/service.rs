use std::time::Duration;

use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};

use crate::proto::mapping_service_client::MappingServiceClient;
use crate::proto::{StartTrajectoryRequest, StartTrajectoryResponse};

/// The remote capability that starts a trajectory.
#[tonic::async_trait]
pub trait TrajectoryService: Send {
    /// Waits up to `timeout` for the service to become reachable. Returns
    /// `false` if it never did.
    async fn wait_until_available(&mut self, timeout: Duration) -> bool;

    /// Issues one start request.
    async fn start_trajectory(
        &mut self,
        request: StartTrajectoryRequest,
    ) -> Result<StartTrajectoryResponse, tonic::Status>;
}

/// [`TrajectoryService`] over a tonic channel.
#[derive(Debug, Clone)]
pub struct GrpcTrajectoryService {
    endpoint: Endpoint,
    retry_interval: Duration,
    client: Option<MappingServiceClient<Channel>>,
}

impl GrpcTrajectoryService {
    pub fn new(url: impl Into<String>) -> Result<Self, tonic::transport::Error> {
        Ok(Self {
            endpoint: Endpoint::from_shared(url.into())?,
            retry_interval: Duration::from_millis(200),
            client: None,
        })
    }

    /// Set how long to sleep between connection attempts.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}

#[tonic::async_trait]
impl TrajectoryService for GrpcTrajectoryService {
    async fn wait_until_available(&mut self, timeout: Duration) -> bool {
        let endpoint = self.endpoint.clone();
        let retry_interval = self.retry_interval;
        let connect = async move {
            loop {
                match endpoint.connect().await {
                    Ok(channel) => return channel,
                    Err(e) => {
                        debug!(uri = %endpoint.uri(), error = %e, "Mapping service not reachable yet");
                        tokio::time::sleep(retry_interval).await;
                    }
                }
            }
        };

        match tokio::time::timeout(timeout, connect).await {
            Ok(channel) => {
                info!(uri = %self.endpoint.uri(), "Connected to mapping service");
                self.client = Some(MappingServiceClient::new(channel));
                true
            }
            Err(_) => false,
        }
    }

    async fn start_trajectory(
        &mut self,
        request: StartTrajectoryRequest,
    ) -> Result<StartTrajectoryResponse, tonic::Status> {
        let client = self
            .client
            .get_or_insert_with(|| MappingServiceClient::new(self.endpoint.connect_lazy()));
        let response = client.start_trajectory(request).await?;
        Ok(response.into_inner())
    }
}
