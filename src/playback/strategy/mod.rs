pub mod embed;
pub mod native;

pub use embed::EmbedStrategy;
pub use native::NativeStreamStrategy;

use tokio::task::JoinHandle;
use tracing::trace;

use crate::common::errors::Severity;
use crate::common::types::Generation;
use crate::playback::source::PlaybackSource;

/// Outcome reported by an attachment's delivery mechanism.
#[derive(Debug, Clone)]
pub enum SignalKind {
    Ready,
    Failed { message: String, severity: Severity },
}

/// A generation-tagged ready/error signal.
///
/// The tag is assigned when the attachment is spawned; the controller
/// discards any signal whose generation is no longer current, so a stale
/// attachment's late callback can never corrupt the state of its successor.
#[derive(Debug, Clone)]
pub struct AttachSignal {
    pub generation: Generation,
    pub kind: SignalKind,
}

/// Strategy for attaching one kind of playback source.
///
/// Mirrors the plugin registry pattern: the controller walks its strategies
/// in order and hands the source to the first one that claims it.
pub trait SourceStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn can_handle(&self, source: &PlaybackSource) -> bool;

    /// Spawn the attach work for `source`. All ready/error outcomes must be
    /// delivered through `signals` tagged with `generation`; the returned
    /// attachment must stop producing observable effects once detached.
    fn attach(
        &self,
        source: &PlaybackSource,
        generation: Generation,
        signals: flume::Sender<AttachSignal>,
    ) -> Attachment;
}

/// Handle to the single live attachment.
///
/// At most one of these exists per controller. Dropping it without calling
/// [`Attachment::detach`] aborts the task as well, so resources are released
/// on every exit path.
#[derive(Debug)]
pub struct Attachment {
    generation: Generation,
    url: String,
    task: JoinHandle<()>,
}

impl Attachment {
    pub fn new(generation: Generation, url: String, task: JoinHandle<()>) -> Self {
        Self {
            generation,
            url,
            task,
        }
    }

    /// Synchronously cancel the attach work. Pending timers and in-flight
    /// requests inside the task are dropped at the next await point; any
    /// signal already queued carries a stale generation and is discarded by
    /// the controller.
    pub fn detach(self) {
        trace!("Detaching attachment gen={} url={}", self.generation, self.url);
        self.task.abort();
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.task.abort();
    }
}
