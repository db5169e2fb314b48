//! Expire command implementation
//!
//! Runs the expiry sweep once against the state store.

use super::load_valid_config;
use super::status::open_state;
use crate::core::export::ExpirySweep;
use clap::Args;

/// Arguments for the expire command
#[derive(Args, Debug)]
pub struct ExpireArgs {
    /// Override `export.job_timeout_minutes`
    #[arg(long)]
    pub timeout_minutes: Option<u64>,
}

impl ExpireArgs {
    /// Execute the expire command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_valid_config(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let timeout = self
            .timeout_minutes
            .unwrap_or(config.export.job_timeout_minutes);
        if timeout == 0 {
            eprintln!("❌ --timeout-minutes must be greater than zero");
            return Ok(2);
        }

        let (jobs, error_logs) = match open_state(&config).await {
            Ok(state) => state,
            Err(e) => {
                println!("❌ Failed to open the state store");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        tracing::info!(timeout_minutes = timeout, "Running expiry sweep");
        let expired = match ExpirySweep::new(jobs, error_logs, timeout).run().await {
            Ok(expired) => expired,
            Err(e) => {
                tracing::error!(error = %e, "Expiry sweep failed");
                eprintln!("Expiry sweep failed: {e}");
                return Ok(5);
            }
        };

        if expired.is_empty() {
            println!("✅ No jobs idle for more than {timeout} minutes");
        } else {
            println!("⏱️  Expired {} job(s):", expired.len());
            for id in expired {
                println!("  - {id}");
            }
        }
        Ok(0)
    }
}
