use crate::errors::AppError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Role carried in the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
    #[serde(other)]
    Unknown,
}

/// Claims decoded from the middle segment of the session token.
///
/// Held for the process lifetime; destroyed on 401 or explicit logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub role: Role,
    /// Expiry, seconds since epoch.
    pub exp: i64,
}

impl Session {
    /// Whether the session is still valid at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.exp > now.timestamp()
    }
}

/// Decodes the claims segment of a three-segment signed token.
///
/// The signature is the API's concern; the client only reads the claims.
/// Any decode failure is reported as `DecodeFailed` and treated by callers
/// as an absent session.
pub fn decode_token(token: &str) -> Result<Session, AppError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(AppError::DecodeFailed(format!(
            "expected 3 token segments, got {}",
            segments.len()
        )));
    }

    let claims = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|e| AppError::DecodeFailed(format!("claims segment is not base64: {}", e)))?;

    serde_json::from_slice(&claims)
        .map_err(|e| AppError::DecodeFailed(format!("claims are not valid JSON: {}", e)))
}

// ============ Stored Profile ============

/// Token plus minimal profile persisted between runs.
///
/// The browser client kept these in local storage; here they live in a JSON
/// file named by `CRM_SESSION_FILE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProfile {
    pub token: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl StoredProfile {
    /// Reads the profile from disk. Absence or malformed content means
    /// "no session", never an error.
    pub fn load(path: &Path) -> Option<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("No stored session at {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!("Ignoring malformed session file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Writes the profile to disk.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::ValidationFailed(format!("profile not serializable: {}", e)))?;
        std::fs::write(path, raw).map_err(|e| {
            AppError::ValidationFailed(format!("cannot write {}: {}", path.display(), e))
        })
    }
}
