//! `load_config` module: reads the YAML configuration file into the core
//! [`DispatchConfig`].
//!
//! This is the only place where the untrusted file is parsed. Every check that
//! can fail runs here, before the pipeline scans a directory or opens a
//! connection:
//! - the file must be readable and valid YAML for the [`DispatchConfig`] schema,
//! - [`DispatchConfig::validate`] must pass, which includes the syntax of the
//!   sender (SMTP username) and recipient addresses.
use doc_courier_core::config::{ConfigError, DispatchConfig};
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DispatchConfig, ConfigError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(ConfigError::Read {
                path: path_ref.to_path_buf(),
                source: e,
            });
        }
    };

    let config: DispatchConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(ConfigError::Parse {
                path: path_ref.to_path_buf(),
                message: e.to_string(),
            });
        }
    };

    config.validate()?;

    config.trace_loaded();
    Ok(config)
}
