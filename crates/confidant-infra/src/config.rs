//! Relay configuration loader.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`RelayConfig`]. Falls back to defaults when the file is missing or
//! malformed, so a bare data directory still yields a runnable relay.

use std::path::Path;

use confidant_types::config::RelayConfig;

/// Load relay configuration from `{data_dir}/config.toml`.
///
/// - Missing file: returns [`RelayConfig::default()`].
/// - Unreadable or unparseable file: logs a warning and returns the
///   default.
/// - Otherwise: the parsed config, with the model catalog patched to
///   always contain the default model key.
pub async fn load_relay_config(data_dir: &Path) -> RelayConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config.toml at {}, using defaults", config_path.display());
            return RelayConfig::default();
        }
        Err(err) => {
            tracing::warn!("failed to read {}: {err}, using defaults", config_path.display());
            return RelayConfig::default();
        }
    };

    match toml::from_str::<RelayConfig>(&content) {
        Ok(mut config) => {
            config.ensure_default_model();
            config
        }
        Err(err) => {
            tracing::warn!(
                "failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RelayConfig::default()
        }
    }
}
