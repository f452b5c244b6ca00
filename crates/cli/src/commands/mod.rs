pub mod ask;
pub mod batch;
pub mod doctor;
pub mod onboard;
pub mod serve;

use rxpilot_config::AppConfig;

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}
