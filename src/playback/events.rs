use serde::Serialize;

use crate::common::errors::Severity;
use crate::playback::policy::PolicyClass;
use crate::playback::source::PlaybackSource;

/// Events emitted by the controller for the surrounding view.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// The active source confirmed successful attachment (manifest parsed,
    /// probe succeeded, or the embed heuristic window elapsed).
    #[serde(rename = "SourceReadyEvent")]
    #[serde(rename_all = "camelCase")]
    SourceReady { source: PlaybackSource },

    /// Fatal delivery error on the active source. The source stays selected
    /// and visibly marked failed; recovery is manual re-selection only.
    #[serde(rename = "SourceFailedEvent")]
    #[serde(rename_all = "camelCase")]
    SourceFailed {
        source: PlaybackSource,
        message: String,
        severity: Severity,
        /// True once every source of the current content id is failed.
        exhausted: bool,
    },

    /// Pre-flight policy match: the attachment was never started.
    #[serde(rename = "SourceRejectedEvent")]
    #[serde(rename_all = "camelCase")]
    SourceRejected {
        source: PlaybackSource,
        class: PolicyClass,
    },

    /// The viewer clicked through the activation gate; the embedded surface
    /// may now receive pointer events.
    #[serde(rename = "GateConfirmedEvent")]
    #[serde(rename_all = "camelCase")]
    GateConfirmed { source: PlaybackSource },

    /// The content item carries no playback sources.
    #[serde(rename = "NoSourcesEvent")]
    NoSources {},
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::source::SourceKind;

    #[test]
    fn events_serialize_with_type_tags() {
        let event = PlayerEvent::SourceRejected {
            source: PlaybackSource {
                name: "Embed 1".into(),
                url: "http://okprime.site/x".into(),
                kind: SourceKind::EmbeddedDocument,
            },
            class: PolicyClass::KnownBroken,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SourceRejectedEvent");
        assert_eq!(json["class"], "knownBroken");
        assert_eq!(json["source"]["kind"], "embeddedDocument");
    }
}
