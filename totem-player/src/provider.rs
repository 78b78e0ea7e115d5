//! Playlist provider: where the engine gets its snapshots from
//!
//! The engine only sees the [`PlaylistProvider`] trait. [`BackendClient`]
//! implements it against the signage backend REST API and also carries the
//! device heartbeat call.

use crate::error::{LoadError, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use totem_common::{MediaItem, MediaKind, PlaylistSnapshot, PlayerState};
use tracing::{debug, warn};

/// Source of playlist snapshots, one fetch per call
#[async_trait]
pub trait PlaylistProvider: Send + Sync {
    /// Playlist currently assigned to `device_id`, in playback order
    async fn fetch_playlist(&self, device_id: &str) -> std::result::Result<PlaylistSnapshot, LoadError>;
}

/// Body of the device heartbeat
#[derive(Debug, Clone, Serialize)]
pub struct Heartbeat {
    pub status: &'static str,
    pub player_state: PlayerState,
    pub current_index: usize,
    pub item_count: usize,
}

/// REST client for the signage backend
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            crate::error::Error::Config(format!("Invalid API URL '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(crate::error::Error::Config(format!(
                "API URL '{}' cannot be used as a base URL",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("totem-player/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `<base>/<segments...>`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    /// Make a media URL from the backend playable as-is
    ///
    /// Absolute URLs pass through, relative ones are joined to the API base,
    /// and a bare `filename` maps to the backend's `/stream/<filename>`.
    pub fn resolve_media_url(&self, url: Option<&str>, filename: Option<&str>) -> Option<String> {
        if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
            return self.base_url.join(url).ok().map(String::from);
        }
        filename
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| self.endpoint(&["stream", f]).to_string())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Report this device as online
    pub async fn send_heartbeat(&self, device_id: &str, heartbeat: &Heartbeat) -> Result<()> {
        let url = self.endpoint(&["api", "devices", device_id, "heartbeat"]);
        debug!("POST {}", url);

        self.authorize(self.client.post(url))
            .json(heartbeat)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn snapshot_from_payload(
        &self,
        device_id: &str,
        payload: PlayerPayload,
    ) -> std::result::Result<PlaylistSnapshot, LoadError> {
        let entries = payload
            .media
            .or_else(|| payload.playlist.and_then(|p| p.media))
            .ok_or_else(|| LoadError::NoPlaylistAssigned(device_id.to_string()))?;

        let total = entries.len();
        let items: Vec<MediaItem> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(position, entry)| self.media_item(position, entry))
            .collect();

        if items.len() != total {
            warn!(
                "Skipped {} of {} playlist entries for device {}",
                total - items.len(),
                total,
                device_id
            );
        }

        Ok(PlaylistSnapshot::new(items))
    }

    fn media_item(&self, position: usize, entry: WireMedia) -> Option<MediaItem> {
        let kind = match entry.kind.as_deref().map(str::parse::<MediaKind>) {
            Some(Ok(kind)) => kind,
            Some(Err(e)) => {
                warn!("Skipping playlist entry {}: {}", position, e);
                return None;
            }
            None => {
                warn!("Skipping playlist entry {}: no media type", position);
                return None;
            }
        };

        let Some(source_url) =
            self.resolve_media_url(entry.url.as_deref(), entry.filename.as_deref())
        else {
            warn!("Skipping playlist entry {}: no usable URL", position);
            return None;
        };

        Some(MediaItem {
            kind,
            source_url,
            display_seconds: entry.duration,
            name: entry.name,
        })
    }
}

#[async_trait]
impl PlaylistProvider for BackendClient {
    async fn fetch_playlist(
        &self,
        device_id: &str,
    ) -> std::result::Result<PlaylistSnapshot, LoadError> {
        let url = self.endpoint(&["api", "player", device_id]);
        debug!("GET {}", url);

        let response = self
            .authorize(self.client.get(url).header(ACCEPT, "application/json"))
            .send()
            .await
            .map_err(|e| LoadError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LoadError::DeviceNotFound(device_id.to_string()));
        }
        if !status.is_success() {
            return Err(LoadError::Http {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LoadError::Network(e.to_string()))?;
        let payload: PlayerPayload =
            serde_json::from_slice(&body).map_err(|e| LoadError::Malformed(e.to_string()))?;

        self.snapshot_from_payload(device_id, payload)
    }
}

/// Best human-readable message from an error response
///
/// JSON `error` (string, or object with `message`), then JSON `message`,
/// then the raw text body, then `HTTP <status>`.
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let fallback = format!("HTTP {}", status.as_u16());

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    let text = match response.text().await {
        Ok(text) => text,
        Err(_) => return fallback,
    };

    if is_json {
        if let Ok(body) = serde_json::from_str::<Value>(&text) {
            let from_error = match body.get("error") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Object(obj)) => obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            };
            let message = from_error.or_else(|| {
                body.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
            return message.unwrap_or(fallback);
        }
    }

    let text = text.trim();
    if text.is_empty() {
        fallback
    } else {
        text.to_string()
    }
}

/// Player endpoint payload; the backend has used all three shapes
#[derive(Debug, Deserialize)]
struct PlayerPayload {
    #[serde(default, alias = "items")]
    media: Option<Vec<WireMedia>>,
    #[serde(default)]
    playlist: Option<PlaylistPayload>,
}

#[derive(Debug, Deserialize)]
struct PlaylistPayload {
    #[serde(default, alias = "items")]
    media: Option<Vec<WireMedia>>,
}

#[derive(Debug, Deserialize)]
struct WireMedia {
    #[serde(default, rename = "type", alias = "kind", alias = "mime_type")]
    kind: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "display_seconds", deserialize_with = "lenient_seconds")]
    duration: Option<f64>,
}

/// Accepts numbers and numeric strings; anything else reads as missing
fn lenient_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
