use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    persistence,
    synergy::SynergyWeights,
};

pub const CONFIG_FILE: &str = "config.json";

/// Import tuning knobs. Retry and backoff bounds are configuration, not
/// hardcoded behavior, so they can be adjusted without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub api_base_url: String,
    pub translation_endpoint: String,
    pub target_locale: String,
    pub retry_attempts: u32,
    pub backoff_base_ms: u64,
    pub request_timeout_secs: u64,
    pub enrichment_concurrency: usize,
    pub max_inflight_requests: usize,
    pub synergy: SynergyWeights,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            api_base_url: "https://api.scryfall.com".to_string(),
            translation_endpoint: "https://libretranslate.com".to_string(),
            target_locale: "fr".to_string(),
            retry_attempts: 3,
            backoff_base_ms: 250,
            request_timeout_secs: 10,
            enrichment_concurrency: 8,
            max_inflight_requests: 4,
            synergy: SynergyWeights::default(),
        }
    }
}

/// Loads the config from the app data dir, writing the defaults on first run
/// so users have a file to edit.
pub fn load_config() -> ImportConfig {
    if !persistence::data_file_exists(CONFIG_FILE) {
        let defaults = ImportConfig::default();
        if let Err(e) = persistence::save_json(&defaults, CONFIG_FILE) {
            eprintln!("Failed to write default config: {}", e);
        }
        return defaults;
    }
    persistence::load_json_or_default::<ImportConfig>(CONFIG_FILE)
}
