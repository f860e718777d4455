//! JSON-RPC Server
//!
//! Serves the coordinator's RPC surface over JSON-RPC 2.0.

use std::sync::Arc;

use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use tracing::info;

use crate::handler::RpcHandler;
use crate::types::{
    FetchJobRequest, GetJobStatusRequest, RegisterAgentRequest, SubmitJobRequest,
    UpdateJobStatusRequest,
};
use testorch_core::application::{DispatchService, SubmissionService};

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9527;

/// RPC server configuration. Binds to localhost only -- the coordinator
/// is reached through the gRPC wire layer or the `cli`/`sdk` clients,
/// never directly from outside the host.
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(
        config: RpcServerConfig,
        submission: Arc<SubmissionService>,
        dispatch: Arc<DispatchService>,
    ) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(submission, dispatch)),
        }
    }

    /// Start the JSON-RPC server.
    pub async fn start(self) -> Result<ServerHandle, String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(host = %self.config.host, port = %self.config.port, "starting JSON-RPC server");

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("failed to build server on {addr}: {e}"))?;

        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module
            .register_async_method("dev.submit.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: SubmitJobRequest = params.parse()?;
                    handler.submit_job(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("dev.status.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: GetJobStatusRequest = params.parse()?;
                    handler.get_job_status(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("agent.register.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: RegisterAgentRequest = params.parse()?;
                    handler.register_agent(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("agent.fetch.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: FetchJobRequest = params.parse()?;
                    handler.fetch_job(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("agent.update_status.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: UpdateJobStatusRequest = params.parse()?;
                    handler.update_job_status(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        info!("JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok(handle)
    }
}
