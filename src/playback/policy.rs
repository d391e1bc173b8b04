use serde::Serialize;

use crate::configs::PolicyConfig;

/// Why a URL was rejected before attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyClass {
    /// The host serves advertising-affiliated embeds.
    AdAffiliated,
    /// The host is known not to play at all.
    KnownBroken,
}

impl std::fmt::Display for PolicyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyClass::AdAffiliated => write!(f, "ad-affiliated"),
            PolicyClass::KnownBroken => write!(f, "known-broken"),
        }
    }
}

/// Pre-flight URL classifier for embedded sources.
///
/// A match means the attachment is skipped entirely and a static advisory is
/// rendered instead. This is distinct from a runtime failure: the source
/// never reaches loading or gate state, and re-selecting it will hit the
/// same match, so no retry is offered.
pub struct UrlPolicy {
    ad_domains: Vec<String>,
    broken_domains: Vec<String>,
}

impl UrlPolicy {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            ad_domains: lowercased(&config.ad_domains),
            broken_domains: lowercased(&config.broken_domains),
        }
    }

    /// Returns `None` when the URL is allowed to attach.
    pub fn classify(&self, url: &str) -> Option<PolicyClass> {
        let url = url.to_lowercase();

        if self.ad_domains.iter().any(|d| url.contains(d.as_str())) {
            return Some(PolicyClass::AdAffiliated);
        }
        if self.broken_domains.iter().any(|d| url.contains(d.as_str())) {
            return Some(PolicyClass::KnownBroken);
        }
        None
    }
}

fn lowercased(domains: &[String]) -> Vec<String> {
    domains
        .iter()
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}
