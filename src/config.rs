use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub auth_token: Option<String>,
    pub session_file: Option<PathBuf>,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            api_base_url: std::env::var("CRM_API_URL")
                .map_err(|_| anyhow::anyhow!("CRM_API_URL environment variable required"))
                .and_then(|raw| {
                    if raw.trim().is_empty() {
                        anyhow::bail!("CRM_API_URL cannot be empty");
                    }
                    let parsed = url::Url::parse(&raw)
                        .map_err(|e| anyhow::anyhow!("CRM_API_URL is not a valid URL: {}", e))?;
                    if parsed.scheme() != "http" && parsed.scheme() != "https" {
                        anyhow::bail!("CRM_API_URL must start with http:// or https://");
                    }
                    // A trailing slash would double up against request paths
                    Ok(raw.trim_end_matches('/').to_string())
                })?,
            auth_token: std::env::var("CRM_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            session_file: std::env::var("CRM_SESSION_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            request_timeout_secs: std::env::var("CRM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CRM_TIMEOUT_SECS must be a positive number"))?,
        };

        if config.auth_token.is_none() && config.session_file.is_none() {
            anyhow::bail!("either CRM_TOKEN or CRM_SESSION_FILE must be set");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("API base URL: {}", config.api_base_url);
        if let Some(ref path) = config.session_file {
            tracing::debug!("Session file: {}", path.display());
        }
        tracing::debug!("Request timeout: {}s", config.request_timeout_secs);

        Ok(config)
    }
}
