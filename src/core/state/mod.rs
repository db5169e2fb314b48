// Job state and error trail

pub mod error_log;
pub mod manager;

pub use error_log::ErrorLogService;
pub use manager::JobExecutionManager;
