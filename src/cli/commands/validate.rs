//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the bibexport configuration file.

use crate::config::load_config;
use crate::core::rules::DefaultRules;
use clap::Args;
use std::path::Path;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = config.validate() {
            println!("❌ Configuration validation failed");
            println!("   Error: {e}");
            println!();
            return Ok(2);
        }

        if let Err(e) = DefaultRules::load() {
            println!("❌ Bundled default rules are invalid");
            println!("   Error: {e}");
            return Ok(5);
        }

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Batch Size: {}", config.export.batch_size);
        println!("  Concurrent Jobs: {}", config.export.max_concurrent_jobs);
        println!(
            "  Mapping Threads: {}",
            if config.export.mapping_threads == 0 {
                "auto".to_string()
            } else {
                config.export.mapping_threads.to_string()
            }
        );
        println!("  Job Timeout: {} min", config.export.job_timeout_minutes);
        println!("  Output Directory: {}", config.export.output_dir);
        println!(
            "  Reference Data TTL: {}s",
            config.reference_data.cache_ttl_seconds
        );
        println!(
            "  Catalog: {}{}",
            config.catalog.data_dir,
            if Path::new(&config.catalog.data_dir).is_dir() {
                ""
            } else {
                " (missing)"
            }
        );
        println!("  State Store: {}", config.state.store_path);
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_missing_file() {
        let code = ValidateArgs {}
            .execute("/nonexistent/bibexport.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_validate_good_and_bad_files() {
        let mut good = NamedTempFile::new().unwrap();
        writeln!(good, "[export]\nbatch_size = 500").unwrap();
        let code = ValidateArgs {}
            .execute(good.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);

        let mut bad = NamedTempFile::new().unwrap();
        writeln!(bad, "[export]\nbatch_size = 0").unwrap();
        let code = ValidateArgs {}
            .execute(bad.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
