//! Export orchestration
//!
//! This module provides the chunked export pipeline:
//! - Export strategies per record type
//! - Chunk statistics
//! - The per-job registry and the orchestrator state machine
//! - The expiry sweep for stale jobs
//! - Service wiring from configuration

pub mod coordinator;
pub mod expiry;
pub mod registry;
pub mod service;
pub mod statistics;
pub mod strategy;

pub use coordinator::{
    resolve_final_status, ExportOrchestrator, ExportRequest, OrchestratorSettings,
};
pub use expiry::ExpirySweep;
pub use registry::{JobEntry, JobRegistry};
pub use service::ExportService;
pub use statistics::Statistics;
pub use strategy::{
    export_record_type, AuthorityExportStrategy, ExportStrategy, HoldingsExportStrategy,
    InstanceExportStrategy, StrategyContext, StrategyTable,
};
