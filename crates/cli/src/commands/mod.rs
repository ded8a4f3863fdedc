pub mod ask;
pub mod config_cmd;
pub mod context;
pub mod resolve;

use gymcoach_config::CoachConfig;
use gymcoach_store::{FitnessData, InMemoryStore};
use std::path::Path;
use std::sync::Arc;

/// The store every command runs against: the seed file, or the demo profile.
pub fn load_store(data: Option<&Path>) -> Result<Arc<InMemoryStore>, Box<dyn std::error::Error>> {
    let data = match data {
        Some(path) => FitnessData::load(path)?,
        None => {
            tracing::info!("No seed file given, using the demo profile");
            FitnessData::demo()
        }
    };
    Ok(Arc::new(InMemoryStore::from_data(data)))
}

pub fn load_config() -> Result<CoachConfig, Box<dyn std::error::Error>> {
    CoachConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}
