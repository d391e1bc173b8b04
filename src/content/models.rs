use serde::{Deserialize, Serialize};

use crate::common::types::ContentId;

/// One catalog entry as listed on browse/search pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub title: String,
    #[serde(default)]
    pub poster: String,
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    Series,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: ContentId,
    #[serde(default)]
    pub title: String,
    pub episode: u32,
    #[serde(default)]
    pub url: String,
}

/// One playback server as the catalog API describes it. The `type` field is
/// optional on the wire; normalization into a [`crate::playback::PlaybackSource`]
/// happens in the playback layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: Option<WireSourceKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireSourceKind {
    Video,
    Iframe,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    #[serde(default)]
    pub quality: String,
    pub url: String,
}

/// Detail payload for one content id.
///
/// Every array field defaults to empty: the upstream API is known to omit or
/// null them, and the watch page must keep rendering regardless. A soft
/// failure ("server busy") arrives in-band through `error`/`message` rather
/// than as a transport error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Details {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub poster: String,
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub episodes: Vec<Episode>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub servers: Vec<Server>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub download_links: Vec<Download>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Accepts `null` (or a missing field, via `default`) where the API should
/// have sent an array.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value: Option<Vec<T>> = Deserialize::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

impl Details {
    /// Soft-fail marker: the API answered, but the scrape upstream of it
    /// timed out. Rendered as a message with a retry button, never as a
    /// crash.
    pub fn is_soft_fail(&self) -> bool {
        self.error.as_deref() == Some("timeout")
    }

    pub fn soft_fail_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "The content server is busy, try again shortly.".to_string())
    }
}
