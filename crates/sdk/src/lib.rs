//! Testorch SDK - Rust Client Library
//!
//! A typed `jsonrpsee::http_client`-backed client for the coordinator's
//! RPC surface (section 6).
//!
//! # Example
//!
//! ```no_run
//! use testorch_sdk::{TestorchClient, SubmitJobRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TestorchClient::connect("http://127.0.0.1:9527").await?;
//!
//!     let response = client
//!         .submit_job(SubmitJobRequest {
//!             org: "acme".to_string(),
//!             artifact: Some("app-v1.apk".to_string()),
//!             web_url: None,
//!             test_path: "tests/smoke.spec".to_string(),
//!             priority: 5,
//!             target: "emulator".to_string(),
//!             test_kind: None,
//!             idempotency_token: None,
//!         })
//!         .await?;
//!
//!     println!("job submitted: {}", response.job_id);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::TestorchClient;
pub use error::{Result, SdkError};
pub use types::{
    FetchJobRequest, FetchJobResponse, GetJobStatusRequest, GetJobStatusResponse,
    RegisterAgentRequest, RegisterAgentResponse, SubmitJobRequest, SubmitJobResponse,
    UpdateJobStatusRequest, UpdateJobStatusResponse,
};
