//! User profile and avatar encoding.

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::SessionError;

/// Display name plus optional avatar, persisted as `{name, avatar}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    /// `data:` URI of the avatar image.
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Trims `name`; an empty result is rejected.
    pub fn new(name: &str, avatar: Option<String>) -> Result<Self, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyProfileName);
        }
        Ok(Self {
            name: name.to_string(),
            avatar,
        })
    }
}

/// Encodes image bytes as `data:<mime>;base64,<payload>`.
pub fn avatar_data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Reads an image file into a data URI. Only image extensions are accepted.
pub fn load_avatar(path: &Path) -> Result<String, SessionError> {
    let mime = image_mime(path)
        .ok_or_else(|| SessionError::UnsupportedAvatar(path.display().to_string()))?;
    let bytes = fs::read(path).map_err(|source| SessionError::Avatar {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(avatar_data_uri(&bytes, mime))
}
