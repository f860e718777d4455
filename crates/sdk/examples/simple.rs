//! Simple SDK Example
//!
//! Demonstrates basic usage of the Testorch SDK.
//!
//! # Usage
//!
//! 1. Start the daemon:
//!    ```bash
//!    cargo run --package testorch-daemon
//!    ```
//!
//! 2. Run this example:
//!    ```bash
//!    cargo run --example simple
//!    ```

use testorch_sdk::{SubmitJobRequest, TestorchClient, UpdateJobStatusRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Testorch SDK - Simple Example");
    println!("================================\n");

    println!("1. Connecting to daemon...");
    let client = TestorchClient::connect("http://127.0.0.1:9527").await?;
    println!("   connected\n");

    println!("2. Submitting a job...");
    let submitted = client
        .submit_job(SubmitJobRequest {
            org: "acme".to_string(),
            artifact: Some("app-v1.apk".to_string()),
            web_url: None,
            test_path: "tests/smoke.spec".to_string(),
            priority: 5,
            target: "emulator".to_string(),
            test_kind: None,
            idempotency_token: None,
        })
        .await?;
    println!("   job id: {}, status: {}\n", submitted.job_id, submitted.status);

    println!("3. Registering an agent...");
    let agent = client.register_agent("worker-1.local", "emulator").await?;
    println!("   agent id: {}\n", agent.agent_id);

    println!("4. Polling for work...");
    match client.fetch_job("emulator").await {
        Ok(job) => {
            println!("   claimed job {}\n", job.job_id);

            println!("5. Reporting completion...");
            client
                .update_job_status(UpdateJobStatusRequest {
                    job_id: job.job_id,
                    status: "COMPLETED".to_string(),
                    agent_id: Some(agent.agent_id),
                    duration_seconds: Some(12),
                    ..Default::default()
                })
                .await?;
            println!("   reported\n");
        }
        Err(_) => println!("   no job ready yet\n"),
    }

    println!("6. Reading status...");
    let status = client.get_job_status(submitted.job_id).await?;
    println!("   status: {}", status.status);

    Ok(())
}
