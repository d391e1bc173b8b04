use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::content::models::{Server, WireSourceKind};

/// Which attach/detach strategy applies to a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    /// Video delivered through a locally controlled adaptive or direct
    /// media pipeline.
    NativeStream,
    /// A third-party page rendered in an isolated frame, outside our direct
    /// playback control.
    EmbeddedDocument,
}

/// One candidate way to play a content item.
///
/// The URL is the identity key: failure tracking and active-selection
/// comparison both go by `url`, so duplicate URLs within one source list are
/// not distinguished. Sources are never mutated, only replaced wholesale
/// when the content id changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSource {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
}

pub fn is_hls_url(url: &str) -> bool {
    url.contains(".m3u8")
}

fn direct_media_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\.(m3u8|mpd|mp4|webm|mkv|mov|ts)(\?.*)?$").expect("static regex")
    })
}

/// Normalize the raw server list from the catalog API into typed playback
/// sources.
///
/// The wire `type` tag is optional and occasionally garbage. `video` maps to
/// a native stream; `iframe` and unknown tags map to embedded documents; a
/// missing tag is sniffed from the URL, since some scrapes return direct
/// media URLs with no tag at all.
pub fn normalize_sources(servers: &[Server]) -> Vec<PlaybackSource> {
    servers
        .iter()
        .map(|server| {
            let kind = match server.kind {
                Some(WireSourceKind::Video) => SourceKind::NativeStream,
                Some(WireSourceKind::Iframe) | Some(WireSourceKind::Unknown) => {
                    SourceKind::EmbeddedDocument
                }
                None => {
                    if direct_media_regex().is_match(&server.url) {
                        SourceKind::NativeStream
                    } else {
                        SourceKind::EmbeddedDocument
                    }
                }
            };

            PlaybackSource {
                name: server.name.clone(),
                url: server.url.clone(),
                kind,
            }
        })
        .collect()
}
