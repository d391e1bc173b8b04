use serde::{Deserialize, Serialize};

/// Exception severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    /// Expected failure mode (dead mirror, stale link). Safe to retry another
    /// source.
    Common,
    /// Unexpected but contained (malformed manifest, policy-listed host).
    Suspicious,
    /// Upstream or transport fault.
    Fault,
}

/// Error taxonomy of the watch subsystem.
///
/// Playback failures never cross the controller boundary as `Err`; they are
/// recorded in session state and emitted as events (exhaustion and policy
/// rejections travel the same way). These variants exist for the call sites
/// that do return `Result`: initialization and the content fetch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The content item carries no playback sources at all.
    #[error("no playback sources available")]
    NoSourcesAvailable,

    /// Hard upstream failure fetching catalog data. Surfaced with a
    /// user-triggered retry affordance.
    #[error("content fetch failed: {0}")]
    ContentFetchFailure(String),

    /// Soft upstream failure ("server busy"), distinguished from a hard
    /// exception so the view renders a message instead of a crash screen.
    #[error("content server busy: {0}")]
    ContentFetchTimeout(String),
}

impl WatchError {
    pub fn severity(&self) -> Severity {
        match self {
            WatchError::NoSourcesAvailable => Severity::Common,
            WatchError::ContentFetchFailure(_) => Severity::Fault,
            WatchError::ContentFetchTimeout(_) => Severity::Common,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_timeout_is_soft() {
        let soft = WatchError::ContentFetchTimeout("server busy".into());
        let hard = WatchError::ContentFetchFailure("connection refused".into());
        assert_eq!(soft.severity(), Severity::Common);
        assert_eq!(hard.severity(), Severity::Fault);
        assert_eq!(WatchError::NoSourcesAvailable.severity(), Severity::Common);
    }
}
