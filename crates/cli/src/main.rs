//! tjctl - Command-line client for the Testorch coordinator
//!
//! A thin client over the client-facing RPC surface (section 6):
//! `submit` and `status`. Exit codes: 0 on success, non-zero on any RPC
//! error.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use testorch_sdk::{SubmitJobRequest, TestorchClient};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9527";

#[derive(Parser)]
#[command(name = "tjctl")]
#[command(about = "Testorch job orchestrator CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Coordinator RPC URL
    #[arg(long, env = "TESTORCH_RPC_URL", default_value = DEFAULT_RPC_URL, global = true)]
    rpc_url: String,

    /// Print machine-readable JSON instead of a human-readable summary
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a test job
    Submit {
        /// Owning organization
        #[arg(long)]
        org: String,

        /// Application artifact reference (required unless target is web)
        #[arg(long)]
        artifact: Option<String>,

        /// URL under test (required when target is web)
        #[arg(long)]
        web_url: Option<String>,

        /// Path to the test spec/suite to run
        #[arg(long)]
        test_path: String,

        /// Priority, higher runs sooner (0-10)
        #[arg(long, default_value = "0")]
        priority: i32,

        /// Execution target: emulator, device, browserstack, web
        #[arg(long)]
        target: String,

        /// Test framework driving the job, e.g. PLAYWRIGHT, ESPRESSO
        #[arg(long)]
        test_kind: Option<String>,

        /// Idempotency token; a fresh one is generated if omitted
        #[arg(long)]
        idempotency_token: Option<String>,
    },

    /// Look up a job's current status and outcome
    Status {
        /// Job ID returned by `submit`
        job_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = TestorchClient::connect(&cli.rpc_url)
        .await
        .context("failed to connect to coordinator")?;

    match cli.command {
        Commands::Submit {
            org,
            artifact,
            web_url,
            test_path,
            priority,
            target,
            test_kind,
            idempotency_token,
        } => {
            let idempotency_token =
                Some(idempotency_token.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()));

            let response = client
                .submit_job(SubmitJobRequest {
                    org,
                    artifact,
                    web_url,
                    test_path,
                    priority,
                    target,
                    test_kind,
                    idempotency_token,
                })
                .await
                .context("submit failed")?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                    "job_id": response.job_id,
                    "status": response.status,
                }))?);
            } else {
                println!("{}", "job submitted".green().bold());
                println!("  {} {}", "job id:".bold(), response.job_id);
                println!("  {} {}", "status:".bold(), response.status);
            }
        }

        Commands::Status { job_id } => {
            let response = client.get_job_status(&job_id).await.context("status lookup failed")?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                    "job_id": response.job_id,
                    "status": response.status,
                    "created_at": response.created_at,
                    "completed_at": response.completed_at,
                    "session_id": response.session_id,
                    "logs_url": response.logs_url,
                    "video_url": response.video_url,
                    "error_message": response.error_message,
                    "duration_seconds": response.duration_seconds,
                }))?);
            } else {
                println!("{} {}", "job:".bold(), response.job_id);
                println!("  {} {}", "status:".bold(), response.status);
                println!("  {} {}", "created at:".bold(), response.created_at);
                if let Some(completed_at) = response.completed_at {
                    println!("  {} {}", "completed at:".bold(), completed_at);
                }
                if let Some(error) = &response.error_message {
                    println!("  {} {}", "error:".bold().red(), error);
                }
                if let Some(logs) = &response.logs_url {
                    println!("  {} {}", "logs:".bold(), logs);
                }
                if let Some(video) = &response.video_url {
                    println!("  {} {}", "video:".bold(), video);
                }
            }
        }
    }

    Ok(())
}
