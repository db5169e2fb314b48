//! Job, error log and profile persistence

pub mod file_store;
pub mod traits;

pub use file_store::FileStateStore;
pub use traits::{ErrorLogRepository, JobExecutionRepository, Page, ProfileRepository};
