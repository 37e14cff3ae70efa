use finplan_core::ModelConfig;

use super::file;

/// Load and validate a model configuration file. Missing keys keep their
/// defaults.
pub fn read_config(path: &str) -> Result<ModelConfig, Box<dyn std::error::Error>> {
    let config: ModelConfig = file::read_document(path)?;
    config.validate()?;
    log::info!(
        "loaded config from {path}: tax rate {}, {:?} day count",
        config.tax_rate,
        config.day_count
    );
    Ok(config)
}
