//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::BibExportConfig;
use crate::domain::errors::BibExportError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into BibExportConfig
/// 4. Applies environment variable overrides (BIBEXPORT_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`BibExportError::Configuration`] if the file is missing or
/// unreadable, a referenced variable is unset, parsing fails or validation
/// fails.
///
/// # Examples
///
/// ```no_run
/// use bibexport::config::loader::load_config;
///
/// let config = load_config("bibexport.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<BibExportConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(BibExportError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        BibExportError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: BibExportConfig = toml::from_str(&contents)
        .map_err(|e| BibExportError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        BibExportError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| BibExportError::Configuration(format!("Invalid placeholder pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    cap[0].to_string()
                }
            }
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(BibExportError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse().map(Some).map_err(|_| {
            BibExportError::Configuration(format!("Invalid value '{val}' for {name}"))
        }),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using BIBEXPORT_* prefix
///
/// Environment variables follow the pattern: BIBEXPORT_<SECTION>_<KEY>
/// For example: BIBEXPORT_EXPORT_BATCH_SIZE, BIBEXPORT_STATE_STORE_PATH
///
/// # Errors
///
/// Returns an error when a numeric or boolean override does not parse
pub fn apply_env_overrides(config: &mut BibExportConfig) -> Result<()> {
    if let Ok(val) = std::env::var("BIBEXPORT_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Some(size) = env_parse("BIBEXPORT_EXPORT_BATCH_SIZE")? {
        config.export.batch_size = size;
    }
    if let Some(jobs) = env_parse("BIBEXPORT_EXPORT_MAX_CONCURRENT_JOBS")? {
        config.export.max_concurrent_jobs = jobs;
    }
    if let Some(threads) = env_parse("BIBEXPORT_EXPORT_MAPPING_THREADS")? {
        config.export.mapping_threads = threads;
    }
    if let Some(minutes) = env_parse("BIBEXPORT_EXPORT_JOB_TIMEOUT_MINUTES")? {
        config.export.job_timeout_minutes = minutes;
    }
    if let Ok(val) = std::env::var("BIBEXPORT_EXPORT_OUTPUT_DIR") {
        config.export.output_dir = val;
    }

    if let Some(ttl) = env_parse("BIBEXPORT_REFERENCE_DATA_CACHE_TTL_SECONDS")? {
        config.reference_data.cache_ttl_seconds = ttl;
    }

    if let Ok(val) = std::env::var("BIBEXPORT_CATALOG_DATA_DIR") {
        config.catalog.data_dir = val;
    }

    if let Ok(val) = std::env::var("BIBEXPORT_STATE_STORE_PATH") {
        config.state.store_path = val;
    }

    if let Some(enabled) = env_parse("BIBEXPORT_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = enabled;
    }
    if let Ok(val) = std::env::var("BIBEXPORT_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("BIBEXPORT_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }
    if let Some(files) = env_parse("BIBEXPORT_LOGGING_LOCAL_MAX_FILES")? {
        config.logging.local_max_files = files;
    }

    Ok(())
}
