use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::common::errors::WatchError;
use crate::common::types::{ContentId, ViewerSessionId};
use crate::content::models::Details;
use crate::content::service::ContentApi;
use crate::playback::source::normalize_sources;
use crate::playback::{PlaybackSource, SourceController};

/// Fetch lifecycle of the watch view.
///
/// `SoftFailed` is the upstream's in-band "server busy" answer and gets a
/// message plus retry button; `Failed` is a hard transport or shape error.
/// Neither retries automatically — re-fetching on a degraded network is the
/// user's call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FetchState {
    Idle,
    Loading,
    Ready,
    SoftFailed { message: String },
    Failed { message: String },
}

/// One rendered watch page: content details plus the playback controller
/// bound to the current content id.
///
/// Changing the id discards and recreates all playback state; nothing
/// carries over, including the failed-source set.
pub struct WatchSession {
    api: Arc<dyn ContentApi>,
    controller: SourceController,
    session_id: ViewerSessionId,
    content_id: Option<ContentId>,
    details: Option<Details>,
    fetch: FetchState,
}

impl WatchSession {
    pub fn new(api: Arc<dyn ContentApi>, controller: SourceController) -> Self {
        Self {
            api,
            controller,
            session_id: ViewerSessionId::generate(),
            content_id: None,
            details: None,
            fetch: FetchState::Idle,
        }
    }

    /// Fetch details for `id` and hand its server list to the controller.
    ///
    /// Every call starts from a blank slate, also when `id` equals the
    /// current one (that is the retry path).
    pub async fn load(&mut self, id: ContentId) {
        info!("[{}] Loading content {}", self.session_id, id);
        self.fetch = FetchState::Loading;
        self.details = None;
        self.controller.reset();
        self.content_id = Some(id.clone());

        let details = match self.api.fetch_details(&id).await {
            Ok(details) => details,
            Err(WatchError::ContentFetchTimeout(message)) => {
                warn!("[{}] Soft failure for {}: {}", self.session_id, id, message);
                self.fetch = FetchState::SoftFailed { message };
                return;
            }
            Err(e) => {
                warn!("[{}] Fetch failed for {}: {}", self.session_id, id, e);
                self.fetch = FetchState::Failed {
                    message: e.to_string(),
                };
                return;
            }
        };

        if details.is_soft_fail() {
            let message = details.soft_fail_message();
            warn!("[{}] Upstream busy for {}: {}", self.session_id, id, message);
            self.fetch = FetchState::SoftFailed { message };
            return;
        }

        if details.title.is_empty() {
            warn!("[{}] Incomplete payload for {}", self.session_id, id);
            self.fetch = FetchState::Failed {
                message: "content data is incomplete".to_string(),
            };
            return;
        }

        let mut details = details;
        details.episodes.sort_by_key(|e| e.episode);

        let sources = normalize_sources(&details.servers);
        debug!(
            "[{}] {} playback sources for '{}'",
            self.session_id,
            sources.len(),
            details.title
        );

        self.details = Some(details);
        self.fetch = FetchState::Ready;

        // An empty server list is not a fetch failure; the controller emits
        // its own no-sources event and the page still renders details.
        let _ = self.controller.initialize(sources);
    }

    /// User-triggered retry of the current content id.
    pub async fn retry(&mut self) {
        if let Some(id) = self.content_id.clone() {
            self.load(id).await;
        }
    }

    pub fn select_server(&mut self, source: PlaybackSource) {
        self.controller.select_source(source);
    }

    pub fn confirm_gate(&mut self) {
        self.controller.confirm_gate();
    }

    pub fn controller(&self) -> &SourceController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SourceController {
        &mut self.controller
    }

    pub fn fetch_state(&self) -> &FetchState {
        &self.fetch
    }

    pub fn details(&self) -> Option<&Details> {
        self.details.as_ref()
    }

    pub fn content_id(&self) -> Option<&ContentId> {
        self.content_id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    use crate::common::types::Generation;
    use crate::configs::PolicyConfig;
    use crate::content::models::{ContentItem, Server, WireSourceKind};
    use crate::playback::strategy::{AttachSignal, Attachment, SignalKind, SourceStrategy};
    use crate::playback::{SourceKind, UrlPolicy};

    struct StubApi {
        responses: HashMap<String, Result<Details, WatchError>>,
    }

    #[async_trait]
    impl ContentApi for StubApi {
        async fn fetch_latest(&self, _page: u32) -> Result<Vec<ContentItem>, WatchError> {
            Ok(Vec::new())
        }

        async fn fetch_details(&self, id: &ContentId) -> Result<Details, WatchError> {
            match self.responses.get(id.0.as_str()) {
                Some(Ok(d)) => Ok(d.clone()),
                Some(Err(WatchError::ContentFetchTimeout(m))) => {
                    Err(WatchError::ContentFetchTimeout(m.clone()))
                }
                Some(Err(e)) => Err(WatchError::ContentFetchFailure(e.to_string())),
                None => Err(WatchError::ContentFetchFailure("not found".to_string())),
            }
        }

        async fn search(&self, _query: &str) -> Result<Vec<ContentItem>, WatchError> {
            Ok(Vec::new())
        }

        async fn fetch_by_category(
            &self,
            _category: &str,
            _page: u32,
        ) -> Result<Vec<ContentItem>, WatchError> {
            Ok(Vec::new())
        }
    }

    struct ManualStrategy;

    impl SourceStrategy for ManualStrategy {
        fn name(&self) -> &str {
            "manual"
        }

        fn can_handle(&self, _source: &PlaybackSource) -> bool {
            true
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

    fn details_with_servers(title: &str, servers: Vec<Server>) -> Details {
        Details {
            title: title.to_string(),
            description: "desc".to_string(),
            servers,
            ..Details::default()
        }
    }

    fn server(name: &str, url: &str, kind: WireSourceKind) -> Server {
        Server {
            name: name.to_string(),
            url: url.to_string(),
            kind: Some(kind),
        }
    }

    fn session_with(responses: HashMap<String, Result<Details, WatchError>>) -> WatchSession {
        let controller = SourceController::with_strategies(
            UrlPolicy::new(&PolicyConfig::default()),
            vec![Box::new(ManualStrategy)],
        );
        WatchSession::new(Arc::new(StubApi { responses }), controller)
    }

    #[tokio::test]
    async fn load_feeds_servers_to_the_controller() {
        let mut responses = HashMap::new();
        responses.insert(
            "m1".to_string(),
            Ok(details_with_servers(
                "Film",
                vec![
                    server("S1", "http://cdn/a.m3u8", WireSourceKind::Video),
                    server("S2", "http://embed/b", WireSourceKind::Iframe),
                ],
            )),
        );
        let mut session = session_with(responses);

        session.load(ContentId::from("m1")).await;

        assert_eq!(*session.fetch_state(), FetchState::Ready);
        let snap = session.controller().snapshot();
        let active = snap.active_source.unwrap();
        assert_eq!(active.url, "http://cdn/a.m3u8");
        assert_eq!(active.kind, SourceKind::NativeStream);
        assert!(snap.loading);
    }

    #[tokio::test]
    async fn switching_content_id_resets_failures_and_selection() {
        let mut responses = HashMap::new();
        responses.insert(
            "m1".to_string(),
            Ok(details_with_servers(
                "Film 1",
                vec![server("S1", "http://cdn/a.m3u8", WireSourceKind::Video)],
            )),
        );
        responses.insert(
            "m2".to_string(),
            Ok(details_with_servers(
                "Film 2",
                vec![server("S1", "http://cdn/z.m3u8", WireSourceKind::Video)],
            )),
        );
        let mut session = session_with(responses);

        session.load(ContentId::from("m1")).await;
        let generation = session.controller().current_generation();
        session.controller_mut().handle_signal(AttachSignal {
            generation,
            kind: SignalKind::Failed {
                message: "fatal".to_string(),
                severity: crate::common::errors::Severity::Common,
            },
        });
        assert!(!session.controller().snapshot().failed_sources.is_empty());

        session.load(ContentId::from("m2")).await;

        let snap = session.controller().snapshot();
        assert!(snap.failed_sources.is_empty());
        assert_eq!(snap.active_source.unwrap().url, "http://cdn/z.m3u8");
    }

    #[tokio::test]
    async fn soft_fail_marker_renders_as_message_not_crash() {
        let mut responses = HashMap::new();
        responses.insert(
            "m1".to_string(),
            Ok(Details {
                error: Some("timeout".to_string()),
                message: Some("server busy".to_string()),
                ..Details::default()
            }),
        );
        let mut session = session_with(responses);

        session.load(ContentId::from("m1")).await;

        assert_eq!(
            *session.fetch_state(),
            FetchState::SoftFailed {
                message: "server busy".to_string()
            }
        );
        assert!(session.details().is_none());
    }

    #[tokio::test]
    async fn hard_fetch_failure_supports_manual_retry() {
        let mut responses = HashMap::new();
        responses.insert(
            "m1".to_string(),
            Err(WatchError::ContentFetchFailure("connection refused".into())),
        );
        let mut session = session_with(responses);

        session.load(ContentId::from("m1")).await;
        assert!(matches!(session.fetch_state(), FetchState::Failed { .. }));

        // Retry re-runs the same id; the stub still fails, state stays Failed.
        session.retry().await;
        assert!(matches!(session.fetch_state(), FetchState::Failed { .. }));
        assert_eq!(session.content_id().unwrap().0, "m1");
    }

    #[tokio::test]
    async fn missing_title_is_an_incomplete_payload() {
        let mut responses = HashMap::new();
        responses.insert("m1".to_string(), Ok(Details::default()));
        let mut session = session_with(responses);

        session.load(ContentId::from("m1")).await;

        assert!(matches!(session.fetch_state(), FetchState::Failed { .. }));
    }

    #[tokio::test]
    async fn empty_server_list_still_renders_details() {
        let mut responses = HashMap::new();
        responses.insert(
            "m1".to_string(),
            Ok(details_with_servers("Film", Vec::new())),
        );
        let mut session = session_with(responses);

        session.load(ContentId::from("m1")).await;

        assert_eq!(*session.fetch_state(), FetchState::Ready);
        assert!(session.details().is_some());
        assert!(session.controller().snapshot().active_source.is_none());
    }

    #[tokio::test]
    async fn episodes_are_sorted_by_number() {
        use crate::content::models::Episode;

        let mut details = details_with_servers(
            "Series",
            vec![server("S1", "http://cdn/a.m3u8", WireSourceKind::Video)],
        );
        details.episodes = vec![
            Episode {
                id: ContentId::from("e3"),
                title: "Three".into(),
                episode: 3,
                url: String::new(),
            },
            Episode {
                id: ContentId::from("e1"),
                title: "One".into(),
                episode: 1,
                url: String::new(),
            },
        ];

        let mut responses = HashMap::new();
        responses.insert("s1".to_string(), Ok(details));
        let mut session = session_with(responses);

        session.load(ContentId::from("s1")).await;

        let episodes = &session.details().unwrap().episodes;
        assert_eq!(episodes[0].episode, 1);
        assert_eq!(episodes[1].episode, 3);
    }
}
