//! Configuration and secret loading.
//!
//! The engine config comes from `{data_dir}/config.toml` and falls back to
//! defaults when the file is missing or malformed. Service credentials
//! come from the environment and are wrapped in `SecretString` on load.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use implicada_types::config::EngineConfig;

/// Resolve the data directory: `IMPLICADA_DATA_DIR`, else `~/.implicada`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("IMPLICADA_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".implicada")
}

/// Load engine configuration from `{data_dir}/config.toml`.
///
/// - Missing file: returns [`EngineConfig::default()`].
/// - Unreadable or malformed file: logs a warning and returns the default.
pub async fn load_engine_config(data_dir: &Path) -> EngineConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            EngineConfig::default()
        }
    }
}

/// Credentials for the external services, read from the environment.
pub struct ServiceSecrets {
    pub gemini_api_key: SecretString,
    pub retrieval_base_url: String,
    pub retrieval_service_key: SecretString,
}

/// Load service credentials from the environment.
///
/// `GEMINI_API_KEY` and `RETRIEVAL_BASE_URL` are required;
/// `RETRIEVAL_SERVICE_KEY` defaults to empty for unauthenticated local
/// retrieval services.
pub fn load_service_secrets() -> anyhow::Result<ServiceSecrets> {
    let gemini_api_key = std::env::var("GEMINI_API_KEY")
        .map_err(|_| anyhow::anyhow!("missing env var: GEMINI_API_KEY"))?;
    let retrieval_base_url = std::env::var("RETRIEVAL_BASE_URL")
        .map_err(|_| anyhow::anyhow!("missing env var: RETRIEVAL_BASE_URL"))?;
    let retrieval_service_key = std::env::var("RETRIEVAL_SERVICE_KEY").unwrap_or_default();

    Ok(ServiceSecrets {
        gemini_api_key: SecretString::from(gemini_api_key),
        retrieval_base_url,
        retrieval_service_key: SecretString::from(retrieval_service_key),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_engine_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config.generation_model, "gemini-2.5-flash");
        assert_eq!(config.embedding_dimensions, 768);
    }

    #[tokio::test]
    async fn load_engine_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
generation_model = "gemini-2.5-pro"
history_window = 6
"#,
        )
        .await
        .unwrap();

        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config.generation_model, "gemini-2.5-pro");
        assert_eq!(config.history_window, 6);
        // Unset fields keep their defaults.
        assert_eq!(config.doc_match_count, 8);
    }

    #[tokio::test]
    async fn load_engine_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config.generation_model, "gemini-2.5-flash");
    }
}
