use std::collections::HashSet;

use serde::Serialize;

use crate::common::errors::WatchError;
use crate::playback::policy::PolicyClass;
use crate::playback::source::{PlaybackSource, SourceKind};

/// The click-to-activate confirmation step in front of embedded sources.
///
/// While `visible`, the embedded surface must be covered and non-interactive
/// (pointer events withheld) so that invisible overlay clicks and drive-by
/// popups never reach the third-party document. This is an anti-abuse gate,
/// not a performance optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gate {
    pub visible: bool,
    pub confirmed: bool,
}

impl Gate {
    fn for_kind(kind: SourceKind) -> Self {
        Self {
            visible: kind == SourceKind::EmbeddedDocument,
            confirmed: false,
        }
    }

    fn hidden() -> Self {
        Self {
            visible: false,
            confirmed: false,
        }
    }
}

/// Rendering snapshot of the playback session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub active_source: Option<PlaybackSource>,
    pub loading: bool,
    pub gate: Gate,
    pub failed_sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<PolicyClass>,
    pub exhausted: bool,
}

/// Mutable per-content playback state with pure, run-to-completion
/// transitions.
///
/// Owned exclusively by one [`crate::playback::SourceController`] bound to
/// one content id; discarded and recreated when the id changes. Transitions
/// never do I/O — attachment side effects live in the controller and its
/// strategies.
#[derive(Debug)]
pub struct PlaybackSession {
    sources: Vec<PlaybackSource>,
    active: Option<PlaybackSource>,
    failed: HashSet<String>,
    loading: bool,
    gate: Gate,
    rejection: Option<PolicyClass>,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            active: None,
            failed: HashSet::new(),
            loading: false,
            gate: Gate::hidden(),
            rejection: None,
        }
    }

    /// Replace the source list wholesale and select the first entry.
    ///
    /// An empty list leaves the session idle and reports
    /// [`WatchError::NoSourcesAvailable`]; the failed set is cleared either
    /// way since it only ever describes the current list.
    pub fn initialize(
        &mut self,
        sources: Vec<PlaybackSource>,
    ) -> Result<PlaybackSource, WatchError> {
        self.failed.clear();
        self.rejection = None;
        self.sources = sources;

        let Some(first) = self.sources.first().cloned() else {
            self.active = None;
            self.loading = false;
            self.gate = Gate::hidden();
            return Err(WatchError::NoSourcesAvailable);
        };

        self.select(&first);
        Ok(first)
    }

    /// Explicit user pick. Always allowed: re-selecting a failed source is
    /// the manual retry path and clears its failed flag.
    pub fn select(&mut self, source: &PlaybackSource) {
        self.failed.remove(&source.url);
        self.active = Some(source.clone());
        self.loading = true;
        self.gate = Gate::for_kind(source.kind);
        self.rejection = None;
    }

    /// Pre-flight policy rejection of the active source: attachment never
    /// started, so this is neither loading nor a recorded failure.
    pub fn reject_active(&mut self, class: PolicyClass) {
        self.loading = false;
        self.gate = Gate::hidden();
        self.rejection = Some(class);
    }

    /// Returns false (and changes nothing) unless the gate is visible.
    pub fn confirm_gate(&mut self) -> bool {
        if !self.gate.visible {
            return false;
        }
        self.gate.visible = false;
        self.gate.confirmed = true;
        true
    }

    pub fn mark_ready(&mut self) {
        self.loading = false;
    }

    /// Record a fatal delivery error on the active source. Deliberately no
    /// automatic fallback to the next source: silently degrading playback
    /// without user awareness is a product no-go, so the user must pick
    /// another source by hand. Returns true once every source in the list
    /// is marked failed.
    pub fn mark_failed(&mut self) -> bool {
        if let Some(active) = &self.active {
            self.failed.insert(active.url.clone());
        }
        self.loading = false;
        self.exhausted()
    }

    pub fn exhausted(&self) -> bool {
        !self.sources.is_empty() && self.sources.iter().all(|s| self.failed.contains(&s.url))
    }

    pub fn active_source(&self) -> Option<&PlaybackSource> {
        self.active.as_ref()
    }

    pub fn sources(&self) -> &[PlaybackSource] {
        &self.sources
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn gate(&self) -> Gate {
        self.gate
    }

    pub fn has_failed(&self, url: &str) -> bool {
        self.failed.contains(url)
    }

    pub fn snapshot(&self) -> Snapshot {
        debug_assert!(
            !(self.gate.visible && self.gate.confirmed),
            "gate cannot be visible and confirmed at once"
        );

        let mut failed_sources: Vec<String> = self.failed.iter().cloned().collect();
        failed_sources.sort();

        Snapshot {
            active_source: self.active.clone(),
            loading: self.loading,
            gate: self.gate,
            failed_sources,
            rejection: self.rejection,
            exhausted: self.exhausted(),
        }
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}
