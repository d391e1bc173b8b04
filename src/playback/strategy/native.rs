use std::time::Duration;

use tracing::{debug, trace};

use crate::common::errors::{Severity, WatchError};
use crate::common::http::HttpClient;
use crate::common::types::Generation;
use crate::configs::PlaybackConfig;
use crate::playback::source::{PlaybackSource, SourceKind, is_hls_url};
use crate::playback::strategy::{AttachSignal, Attachment, SignalKind, SourceStrategy};

/// Attach strategy for natively delivered video.
///
/// Segmented adaptive-bitrate URLs are attached by fetching and parsing the
/// manifest; a parsed manifest is the ready signal, a fatal fetch/parse
/// error the failure signal. Direct media URLs are probed instead (HEAD,
/// falling back to GET) and rely on status plus content type, the analog of
/// the media element's native ready/error signaling.
pub struct NativeStreamStrategy {
    client: reqwest::Client,
}

impl NativeStreamStrategy {
    pub fn new(config: &PlaybackConfig) -> Result<Self, WatchError> {
        let client =
            HttpClient::with_timeout(Duration::from_millis(config.native_probe_timeout_ms))
                .map_err(|e| WatchError::ContentFetchFailure(e.to_string()))?;
        Ok(Self { client })
    }
}

impl SourceStrategy for NativeStreamStrategy {
    fn name(&self) -> &str {
        "native"
    }

    fn can_handle(&self, source: &PlaybackSource) -> bool {
        source.kind == SourceKind::NativeStream
    }

    fn attach(
        &self,
        source: &PlaybackSource,
        generation: Generation,
        signals: flume::Sender<AttachSignal>,
    ) -> Attachment {
        let client = self.client.clone();
        let url = source.url.clone();
        let task_url = url.clone();

        let task = tokio::spawn(async move {
            let outcome = if is_hls_url(&task_url) {
                probe_manifest(&client, &task_url).await
            } else {
                probe_direct(&client, &task_url).await
            };

            let kind = match outcome {
                Ok(()) => {
                    debug!("Native source ready: {}", task_url);
                    SignalKind::Ready
                }
                Err((message, severity)) => {
                    debug!("Native source failed: {}: {}", task_url, message);
                    SignalKind::Failed { message, severity }
                }
            };

            let _ = signals.send(AttachSignal { generation, kind });
        });

        Attachment::new(generation, url, task)
    }
}

async fn probe_manifest(
    client: &reqwest::Client,
    url: &str,
) -> Result<(), (String, Severity)> {
    trace!("Fetching HLS manifest: {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| (e.to_string(), Severity::Common))?;

    let status = response.status();
    if !status.is_success() {
        return Err((format!("manifest request returned {}", status), Severity::Common));
    }

    let body = response
        .text()
        .await
        .map_err(|e| (e.to_string(), Severity::Common))?;

    validate_manifest(&body).map_err(|msg| (msg.to_string(), Severity::Suspicious))
}

fn validate_manifest(body: &str) -> Result<(), &'static str> {
    let body = body.trim_start_matches('\u{feff}');
    if !body.starts_with("#EXTM3U") {
        return Err("response is not an HLS manifest");
    }
    // Either a master playlist (variants) or a media playlist (segments).
    if !body.contains("#EXT-X-STREAM-INF") && !body.contains("#EXTINF") {
        return Err("manifest has no variants or segments");
    }
    Ok(())
}

async fn probe_direct(client: &reqwest::Client, url: &str) -> Result<(), (String, Severity)> {
    // HEAD first; some hosts reject it, so fall back to GET.
    let response = match client.head(url).send().await {
        Ok(r) if r.status().is_success() => r,
        _ => client
            .get(url)
            .send()
            .await
            .map_err(|e| (e.to_string(), Severity::Common))?,
    };

    let status = response.status();
    if !status.is_success() {
        return Err((format!("source returned {}", status), Severity::Common));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if is_playable_content_type(content_type) {
        Ok(())
    } else {
        Err((
            format!("unplayable content type '{}'", content_type),
            Severity::Suspicious,
        ))
    }
}

fn is_playable_content_type(content_type: &str) -> bool {
    content_type.starts_with("video/")
        || content_type.starts_with("audio/")
        || content_type.starts_with("application/vnd.apple.mpegurl")
        || content_type.starts_with("application/x-mpegurl")
        || content_type == "application/octet-stream"
        || content_type.is_empty()
}
