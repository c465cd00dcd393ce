//! Configuration loader with environment variable substitution and overrides

use super::schema::PipelineConfig;
use crate::domain::errors::EtlError;
use crate::domain::result::Result;
use crate::domain::table::parse_timestamp;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a JSON or TOML file
///
/// This function:
/// 1. Reads the file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the document (TOML for `.toml` files, JSON otherwise)
/// 4. Applies environment variable overrides (`STRATA_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`EtlError::Configuration`] if:
/// - File is missing or cannot be read
/// - Parsing fails, including a missing `storage_path` key
/// - A referenced environment variable is not set
/// - Validation fails
///
/// # Examples
///
/// ```no_run
/// use strata::config::loader::load_config;
///
/// let config = load_config("pipeline_config.json").expect("Failed to load config");
/// println!("store: {}", config.storage_path);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(EtlError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        EtlError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let mut config = if is_toml {
        parse_toml(&contents)?
    } else {
        parse_json(&contents)?
    };

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        EtlError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    tracing::debug!(
        path = %path.display(),
        storage_path = %config.storage_path,
        "Configuration loaded"
    );

    Ok(config)
}

/// Parses a JSON configuration document
pub fn parse_json(contents: &str) -> Result<PipelineConfig> {
    serde_json::from_str(contents)
        .map_err(|e| EtlError::Configuration(format!("Failed to parse JSON: {}", e)))
}

/// Parses a TOML configuration document
pub fn parse_toml(contents: &str) -> Result<PipelineConfig> {
    toml::from_str(contents)
        .map_err(|e| EtlError::Configuration(format!("Failed to parse TOML: {}", e)))
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Lines starting with `#` are left untouched so commented-out TOML entries
/// don't require their variables to be set.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| EtlError::Configuration(format!("Invalid placeholder pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for (index, line) in input.lines().enumerate() {
        if index > 0 {
            result.push('\n');
        }

        if line.trim_start().starts_with('#') {
            result.push_str(line);
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(EtlError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the STRATA_* prefix
///
/// Variables follow the pattern `STRATA_<KEY>` or `STRATA_<SECTION>_<KEY>`,
/// for example `STRATA_STORAGE_PATH` or `STRATA_LOGGING_LOCAL_PATH`.
fn apply_env_overrides(config: &mut PipelineConfig) -> Result<()> {
    if let Ok(val) = std::env::var("STRATA_STORAGE_PATH") {
        config.storage_path = val;
    }
    if let Ok(val) = std::env::var("STRATA_RAW_PATH") {
        config.raw_path = Some(val);
    }
    if let Ok(val) = std::env::var("STRATA_PROCESSED_PATH") {
        config.processed_path = Some(val);
    }
    if let Ok(val) = std::env::var("STRATA_LOG_LEVEL") {
        config.log_level = val;
    }
    if let Ok(val) = std::env::var("STRATA_LOWER_BOUND") {
        config.lower_bound = parse_timestamp(&val).ok_or_else(|| {
            EtlError::Configuration(format!("Invalid STRATA_LOWER_BOUND timestamp: {val}"))
        })?;
    }

    if let Ok(val) = std::env::var("STRATA_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("STRATA_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
