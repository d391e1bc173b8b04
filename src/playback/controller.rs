use tracing::{debug, info, trace, warn};

use crate::common::errors::WatchError;
use crate::common::types::Generation;
use crate::configs::Config;
use crate::playback::events::PlayerEvent;
use crate::playback::policy::UrlPolicy;
use crate::playback::session::{PlaybackSession, Snapshot};
use crate::playback::source::{PlaybackSource, SourceKind};
use crate::playback::strategy::{
    AttachSignal, Attachment, EmbedStrategy, NativeStreamStrategy, SignalKind, SourceStrategy,
};

/// The playback source controller.
///
/// Owns the [`PlaybackSession`] for one content id, the generation counter,
/// and at most one live [`Attachment`]. Commands (`initialize`,
/// `select_source`, `confirm_gate`) and signal handling all run on the
/// caller's thread and run to completion; the only async work is inside
/// strategy tasks, whose effects re-enter through [`AttachSignal`]s that are
/// dropped unless their generation is current.
pub struct SourceController {
    session: PlaybackSession,
    policy: UrlPolicy,
    strategies: Vec<Box<dyn SourceStrategy>>,
    generation: Generation,
    attachment: Option<Attachment>,
    signal_tx: flume::Sender<AttachSignal>,
    signal_rx: flume::Receiver<AttachSignal>,
    event_tx: flume::Sender<PlayerEvent>,
    event_rx: flume::Receiver<PlayerEvent>,
}

impl SourceController {
    pub fn new(config: &Config) -> Result<Self, WatchError> {
        let strategies: Vec<Box<dyn SourceStrategy>> = vec![
            Box::new(NativeStreamStrategy::new(&config.playback)?),
            Box::new(EmbedStrategy::new(&config.playback)?),
        ];
        Ok(Self::with_strategies(
            UrlPolicy::new(&config.policy),
            strategies,
        ))
    }

    pub fn with_strategies(policy: UrlPolicy, strategies: Vec<Box<dyn SourceStrategy>>) -> Self {
        let (signal_tx, signal_rx) = flume::unbounded();
        let (event_tx, event_rx) = flume::unbounded();

        Self {
            session: PlaybackSession::new(),
            policy,
            strategies,
            generation: Generation(0),
            attachment: None,
            signal_tx,
            signal_rx,
            event_tx,
            event_rx,
        }
    }

    /// Receiver half of the event stream consumed by the view.
    pub fn events(&self) -> flume::Receiver<PlayerEvent> {
        self.event_rx.clone()
    }

    /// Receiver half of the attachment signal stream. The owner drains this
    /// (one logical thread) and feeds each signal back through
    /// [`SourceController::handle_signal`].
    pub fn signals(&self) -> flume::Receiver<AttachSignal> {
        self.signal_rx.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session.snapshot()
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Generation of the live attachment. Signals tagged with anything else
    /// are discarded by [`SourceController::handle_signal`].
    pub fn current_generation(&self) -> Generation {
        self.generation
    }

    /// Feed a fresh, ordered source list for a new content id. The previous
    /// attachment is released first; the failed set starts empty.
    pub fn initialize(&mut self, sources: Vec<PlaybackSource>) -> Result<(), WatchError> {
        self.detach_current();

        match self.session.initialize(sources) {
            Ok(first) => {
                info!("Initialized with source '{}' ({})", first.name, first.url);
                self.begin_attach(first);
                Ok(())
            }
            Err(e) => {
                warn!("Content has no playback sources");
                self.emit(PlayerEvent::NoSources {});
                Err(e)
            }
        }
    }

    /// Explicit user pick. Selecting a previously failed source is allowed
    /// and acts as the manual retry, clearing its failed flag.
    pub fn select_source(&mut self, source: PlaybackSource) {
        self.detach_current();
        debug!("Source selected: '{}' ({})", source.name, source.url);
        self.session.select(&source);
        self.begin_attach(source);
    }

    /// Click-through on the activation gate. Valid only while the gate is
    /// visible; otherwise a no-op.
    pub fn confirm_gate(&mut self) {
        if !self.session.confirm_gate() {
            trace!("Gate confirmation ignored: gate not visible");
            return;
        }
        if let Some(source) = self.session.active_source().cloned() {
            info!("Gate confirmed for '{}'", source.name);
            self.emit(PlayerEvent::GateConfirmed { source });
        }
    }

    /// Apply one ready/error signal. Signals from superseded attachments are
    /// discarded here; this is the only place attachment outcomes touch
    /// session state.
    pub fn handle_signal(&mut self, signal: AttachSignal) {
        if signal.generation != self.generation {
            trace!(
                "Discarding stale signal gen={} (current {})",
                signal.generation, self.generation
            );
            return;
        }

        // The task produced its terminal signal; the handle is spent.
        self.attachment = None;

        let Some(source) = self.session.active_source().cloned() else {
            warn!("Signal for current generation but no active source");
            return;
        };

        match signal.kind {
            SignalKind::Ready => {
                self.session.mark_ready();
                info!("Source ready: '{}'", source.name);
                self.emit(PlayerEvent::SourceReady { source });
            }
            SignalKind::Failed { message, severity } => {
                let exhausted = self.session.mark_failed();
                warn!("Source failed: '{}': {}", source.name, message);
                self.emit(PlayerEvent::SourceFailed {
                    source,
                    message,
                    severity,
                    exhausted,
                });
            }
        }
    }

    /// Drop all playback state, e.g. when the watch view unmounts or the
    /// content id changes. The session is recreated, not patched.
    pub fn reset(&mut self) {
        self.detach_current();
        self.session = PlaybackSession::new();
    }

    fn begin_attach(&mut self, source: PlaybackSource) {
        // Pre-flight policy check for embedded documents. A match skips
        // attachment entirely; this is not a playback failure and the gate
        // never appears.
        if source.kind == SourceKind::EmbeddedDocument {
            if let Some(class) = self.policy.classify(&source.url) {
                warn!("Source '{}' rejected by policy: {}", source.name, class);
                self.session.reject_active(class);
                self.emit(PlayerEvent::SourceRejected { source, class });
                return;
            }
        }

        let Some(strategy) = self.strategies.iter().find(|s| s.can_handle(&source)) else {
            // Both kinds are covered by the default strategy set, so this
            // only fires with a custom set.
            warn!("No strategy for source '{}'", source.name);
            let exhausted = self.session.mark_failed();
            self.emit(PlayerEvent::SourceFailed {
                source,
                message: "no attach strategy for source".to_string(),
                severity: crate::common::errors::Severity::Fault,
                exhausted,
            });
            return;
        };

        trace!(
            "Attaching '{}' via strategy '{}' gen={}",
            source.name,
            strategy.name(),
            self.generation
        );
        let attachment = strategy.attach(&source, self.generation, self.signal_tx.clone());
        self.attachment = Some(attachment);
    }

    /// Release the live attachment, if any, before anything else runs.
    /// Bumping the generation makes every signal already in flight stale.
    fn detach_current(&mut self) {
        if let Some(attachment) = self.attachment.take() {
            attachment.detach();
        }
        self.generation = self.generation.next();
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::Severity;
    use crate::configs::PolicyConfig;

    /// Strategy whose attach work never completes on its own; tests inject
    /// signals by hand to play the role of the delivery mechanism.
    struct ManualStrategy {
        kind: SourceKind,
    }

    impl SourceStrategy for ManualStrategy {
        fn name(&self) -> &str {
            "manual"
        }

        fn can_handle(&self, source: &PlaybackSource) -> bool {
            source.kind == self.kind
        }

        fn attach(
            &self,
            source: &PlaybackSource,
            generation: Generation,
            _signals: flume::Sender<AttachSignal>,
        ) -> Attachment {
            let task = tokio::spawn(std::future::pending::<()>());
            Attachment::new(generation, source.url.clone(), task)
        }
    }

    fn controller() -> SourceController {
        SourceController::with_strategies(
            UrlPolicy::new(&PolicyConfig::default()),
            vec![
                Box::new(ManualStrategy {
                    kind: SourceKind::NativeStream,
                }),
                Box::new(ManualStrategy {
                    kind: SourceKind::EmbeddedDocument,
                }),
            ],
        )
    }

    fn native(url: &str) -> PlaybackSource {
        PlaybackSource {
            name: format!("native {url}"),
            url: url.to_string(),
            kind: SourceKind::NativeStream,
        }
    }

    fn embed(url: &str) -> PlaybackSource {
        PlaybackSource {
            name: format!("embed {url}"),
            url: url.to_string(),
            kind: SourceKind::EmbeddedDocument,
        }
    }

    fn ready(generation: Generation) -> AttachSignal {
        AttachSignal {
            generation,
            kind: SignalKind::Ready,
        }
    }

    fn failed(generation: Generation) -> AttachSignal {
        AttachSignal {
            generation,
            kind: SignalKind::Failed {
                message: "fatal stream error".to_string(),
                severity: Severity::Common,
            },
        }
    }

    #[tokio::test]
    async fn native_first_source_attaches_and_becomes_ready() {
        let mut ctl = controller();
        ctl.initialize(vec![native("http://cdn/a.m3u8"), embed("http://embed/b")])
            .unwrap();

        let snap = ctl.snapshot();
        assert_eq!(snap.active_source.unwrap().url, "http://cdn/a.m3u8");
        assert!(snap.loading);
        assert!(!snap.gate.visible);

        ctl.handle_signal(ready(ctl.generation));

        assert!(!ctl.snapshot().loading);
        assert!(matches!(
            ctl.events().try_recv().unwrap(),
            PlayerEvent::SourceReady { .. }
        ));
    }

    #[tokio::test]
    async fn failure_marks_source_without_auto_failover() {
        let mut ctl = controller();
        ctl.initialize(vec![native("http://cdn/a.m3u8"), embed("http://embed/b")])
            .unwrap();

        ctl.handle_signal(failed(ctl.generation));

        let snap = ctl.snapshot();
        // The failed source stays selected; no silent switch to the embed.
        assert_eq!(snap.active_source.unwrap().url, "http://cdn/a.m3u8");
        assert_eq!(snap.failed_sources, vec!["http://cdn/a.m3u8".to_string()]);
        assert!(!snap.loading);
        assert!(!snap.exhausted);

        match ctl.events().try_recv().unwrap() {
            PlayerEvent::SourceFailed { exhausted, .. } => assert!(!exhausted),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reselecting_a_failed_source_clears_its_flag() {
        let mut ctl = controller();
        ctl.initialize(vec![native("http://cdn/a.m3u8")]).unwrap();
        ctl.handle_signal(failed(ctl.generation));
        assert!(ctl.snapshot().exhausted);

        ctl.select_source(native("http://cdn/a.m3u8"));

        let snap = ctl.snapshot();
        assert!(snap.failed_sources.is_empty());
        assert!(snap.loading);
        assert!(!snap.exhausted);
    }

    #[tokio::test]
    async fn stale_generation_signals_are_discarded() {
        let mut ctl = controller();
        ctl.initialize(vec![native("http://cdn/a.m3u8"), embed("http://embed/b")])
            .unwrap();
        let old_generation = ctl.generation;

        ctl.select_source(embed("http://embed/b"));

        // Late ready from the superseded native attachment.
        ctl.handle_signal(ready(old_generation));
        assert!(ctl.snapshot().loading, "stale ready must not clear loading");

        // Late failure must not poison the failed set either.
        ctl.handle_signal(failed(old_generation));
        assert!(ctl.snapshot().failed_sources.is_empty());
    }

    #[tokio::test]
    async fn embed_selection_raises_gate_until_confirmed() {
        let mut ctl = controller();
        ctl.initialize(vec![native("http://cdn/a.m3u8"), embed("http://embed/b")])
            .unwrap();

        ctl.select_source(embed("http://embed/b"));
        let snap = ctl.snapshot();
        assert!(snap.gate.visible);
        assert!(!snap.gate.confirmed);

        ctl.confirm_gate();
        let snap = ctl.snapshot();
        assert!(!snap.gate.visible);
        assert!(snap.gate.confirmed);

        let events = ctl.events();
        assert!(matches!(
            events.try_recv().unwrap(),
            PlayerEvent::GateConfirmed { .. }
        ));

        // Second click: gate no longer visible, so nothing happens.
        ctl.confirm_gate();
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn gate_confirmation_without_visible_gate_is_ignored() {
        let mut ctl = controller();
        ctl.initialize(vec![native("http://cdn/a.m3u8")]).unwrap();

        ctl.confirm_gate();

        let snap = ctl.snapshot();
        assert!(!snap.gate.visible);
        assert!(!snap.gate.confirmed);
        assert!(ctl.events().try_recv().is_err());
    }

    #[tokio::test]
    async fn policy_listed_embed_is_rejected_before_attach() {
        let mut ctl = controller();
        ctl.initialize(vec![native("http://cdn/a.m3u8")]).unwrap();

        ctl.select_source(embed("http://okprime.site/embed/42"));

        let snap = ctl.snapshot();
        assert!(!snap.loading, "rejection must never reach loading state");
        assert!(!snap.gate.visible);
        assert_eq!(snap.rejection, Some(crate::playback::PolicyClass::KnownBroken));
        assert!(snap.failed_sources.is_empty());
        assert!(ctl.attachment.is_none());

        assert!(matches!(
            ctl.events().try_recv().unwrap(),
            PlayerEvent::SourceRejected { .. }
        ));
    }

    #[tokio::test]
    async fn exhaustion_is_reported_when_the_last_source_fails() {
        let mut ctl = controller();
        ctl.initialize(vec![native("http://cdn/a.m3u8"), embed("http://embed/b")])
            .unwrap();
        let events = ctl.events();

        ctl.handle_signal(failed(ctl.generation));
        ctl.select_source(embed("http://embed/b"));
        ctl.handle_signal(failed(ctl.generation));

        assert!(ctl.snapshot().exhausted);

        let last = events.drain().last().unwrap();
        match last {
            PlayerEvent::SourceFailed { exhausted, .. } => assert!(exhausted),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_source_list_reports_no_sources() {
        let mut ctl = controller();
        let err = ctl.initialize(Vec::new()).unwrap_err();

        assert!(matches!(err, WatchError::NoSourcesAvailable));
        assert!(matches!(
            ctl.events().try_recv().unwrap(),
            PlayerEvent::NoSources {}
        ));
        assert!(ctl.snapshot().active_source.is_none());
    }

    #[tokio::test]
    async fn reset_discards_session_and_attachment() {
        let mut ctl = controller();
        ctl.initialize(vec![native("http://cdn/a.m3u8")]).unwrap();
        ctl.handle_signal(failed(ctl.generation));

        ctl.reset();

        let snap = ctl.snapshot();
        assert!(snap.active_source.is_none());
        assert!(snap.failed_sources.is_empty());
        assert!(!snap.loading);
        assert!(ctl.attachment.is_none());
    }
}
