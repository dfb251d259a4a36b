//! Server config loader (strict parsing).

pub mod schema;

use std::fs;

use promscope_core::error::{MetricsError, Result};

pub use schema::{
    AppConfig, CardinalityScopeConfig, HttpSection, MetricsSection, OverflowConfig, ServerSection,
};

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MetricsError::BadConfig(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AppConfig> {
    let cfg: AppConfig = serde_yaml::from_str(s)
        .map_err(|e| MetricsError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
