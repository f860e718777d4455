//! Testorch Client Implementation

use std::time::Duration;

use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;

use crate::error::{Result, SdkError};
use crate::types::{
    FetchJobRequest, FetchJobResponse, GetJobStatusRequest, GetJobStatusResponse,
    RegisterAgentRequest, RegisterAgentResponse, SubmitJobRequest, SubmitJobResponse,
    UpdateJobStatusRequest, UpdateJobStatusResponse,
};

/// Testorch coordinator client.
///
/// # Example
///
/// ```no_run
/// use testorch_sdk::TestorchClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = TestorchClient::connect("http://127.0.0.1:9527").await?;
/// # Ok(())
/// # }
/// ```
pub struct TestorchClient {
    client: HttpClient,
}

impl TestorchClient {
    /// Connect to a running coordinator.
    ///
    /// * `url` - RPC endpoint, e.g. `http://127.0.0.1:9527`.
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();

        let client = HttpClientBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .build(url)
            .map_err(|e| SdkError::Connection(format!("failed to create client: {e}")))?;

        Ok(Self { client })
    }

    /// `dev.submit.v1`
    pub async fn submit_job(&self, request: SubmitJobRequest) -> Result<SubmitJobResponse> {
        let params = rpc_params![request];
        Ok(self.client.request("dev.submit.v1", params).await?)
    }

    /// `dev.status.v1`
    pub async fn get_job_status(&self, job_id: impl Into<String>) -> Result<GetJobStatusResponse> {
        let request = GetJobStatusRequest { job_id: job_id.into() };
        let params = rpc_params![request];
        Ok(self.client.request("dev.status.v1", params).await?)
    }

    /// `agent.register.v1`
    pub async fn register_agent(
        &self,
        hostname: impl Into<String>,
        capability: impl Into<String>,
    ) -> Result<RegisterAgentResponse> {
        let request = RegisterAgentRequest {
            hostname: hostname.into(),
            capability: capability.into(),
        };
        let params = rpc_params![request];
        Ok(self.client.request("agent.register.v1", params).await?)
    }

    /// `agent.fetch.v1`. A `NotFound` RPC error means no job is ready
    /// for this capability right now -- callers poll.
    pub async fn fetch_job(&self, capability: impl Into<String>) -> Result<FetchJobResponse> {
        let request = FetchJobRequest { capability: capability.into() };
        let params = rpc_params![request];
        Ok(self.client.request("agent.fetch.v1", params).await?)
    }

    /// `agent.update_status.v1`
    pub async fn update_job_status(
        &self,
        request: UpdateJobStatusRequest,
    ) -> Result<UpdateJobStatusResponse> {
        let params = rpc_params![request];
        Ok(self.client.request("agent.update_status.v1", params).await?)
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_sdk_types() {
        // Basic smoke test to ensure SDK compiles.
        // Real exercise of RPC calls needs a running daemon; see
        // `integration-tests` for that.
    }
}
