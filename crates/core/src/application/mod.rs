// Application Layer - Use Cases and Business Logic

pub mod dispatch;
pub mod maintenance;
pub mod scheduler;
pub mod shutdown;
pub mod submission;

// Re-exports
pub use dispatch::DispatchService;
pub use maintenance::MaintenanceScheduler;
pub use scheduler::{SchedulerConfig, SchedulerLoop};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use submission::{SubmissionService, SubmitRequest, SubmitResult};
