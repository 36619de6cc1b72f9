//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use pixdrop_core::Config;

/// Validate critical configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.trusted_proxy_count > 10 {
        tracing::warn!(
            trusted_proxy_count = config.trusted_proxy_count,
            "TRUSTED_PROXY_COUNT is very high - ensure this matches your actual proxy setup"
        );
    }

    if config.is_production() && config.trusted_proxy_count == 0 {
        tracing::warn!(
            "TRUSTED_PROXY_COUNT is 0 in production - behind a proxy every client shares one rate limit"
        );
    }

    if config.upload_dir == config.metadata_path
        || config.metadata_path.starts_with(&config.upload_dir)
    {
        return Err(anyhow::anyhow!(
            "METADATA_PATH ({}) must live outside UPLOAD_DIR ({}), which is served publicly",
            config.metadata_path.display(),
            config.upload_dir.display()
        ));
    }

    Ok(())
}
