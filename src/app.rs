use std::sync::Arc;

use tracing::error;

use crate::application::EquipmentAnalytics;
use crate::domain::error::Result;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::logging::init_tracing;

/// Load configuration, install logging, and open the filesystem-backed
/// pipeline.
pub fn start() -> Result<Arc<EquipmentAnalytics>> {
    let config = AppConfig::load()?;
    start_with(config)
}

pub fn start_with(config: AppConfig) -> Result<Arc<EquipmentAnalytics>> {
    init_tracing(&config.log_filter);

    let analytics = EquipmentAnalytics::from_config(config).map_err(|err| {
        error!(error = %err, "Failed to open analytics data directory");
        err
    })?;

    Ok(Arc::new(analytics))
}
