//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use crate::config::BibExportConfig;
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "bibexport.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing bibexport configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()?
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Point [catalog] data_dir at your catalog snapshot");
                println!("  2. Validate configuration: bibexport validate-config");
                println!("  3. Run export: bibexport export ids.csv");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Every setting at its default value
    fn generate_minimal_config() -> anyhow::Result<String> {
        let body = BibExportConfig::default().to_toml_string()?;
        Ok(format!("# bibexport configuration\n\n{body}"))
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# bibexport configuration
#
# Values may reference environment variables as ${VAR_NAME}. Any setting can
# also be overridden with BIBEXPORT_<SECTION>_<KEY>, e.g.
# BIBEXPORT_EXPORT_BATCH_SIZE=500.

[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

[export]
# Identifiers read per chunk (1-50000)
batch_size = 1000

# Jobs running at the same time (1-64)
max_concurrent_jobs = 4

# Mapping threads shared by all jobs (0 = one per core)
mapping_threads = 0

# Running jobs with no progress for this long are closed as FAIL
job_timeout_minutes = 60

# Output files land in <output_dir>/<job id>/<file>-<hrid>.<mrc|json>
output_dir = "./output"

[reference_data]
# Seconds a job's reference data stays cached after its last use
cache_ttl_seconds = 60

[catalog]
# Directory holding the JSON catalog snapshot: instances.json, holdings.json,
# items.json, marc_records.json and reference_data/<table>.json
data_dir = "./catalog"

[state]
# JSON file persisting jobs, error logs and mapping profiles
store_path = "./state/bibexport-state.json"

[logging]
# JSON log files next to the console output
local_enabled = false
local_path = "./logs"
local_rotation = "daily"  # daily | hourly
local_max_files = 14       # rotated files kept
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "bibexport.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "bibexport.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generated_configs_parse() {
        let minimal = InitArgs::generate_minimal_config().unwrap();
        let config = BibExportConfig::from_toml_str(&minimal).unwrap();
        assert!(config.validate().is_ok());

        let with_examples = InitArgs::generate_config_with_examples();
        let config = BibExportConfig::from_toml_str(&with_examples).unwrap();
        assert_eq!(config.export.batch_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("bibexport.toml");
        std::fs::write(&output, "# existing").unwrap();

        let args = InitArgs {
            output: output.to_string_lossy().to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "# existing");
    }
}
