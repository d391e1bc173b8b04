use serde::{Deserialize, Serialize};

/// URL-pattern lists used to pre-flight-reject known-bad embedded sources.
///
/// The two lists are disjoint by convention: `ad_domains` marks hosts whose
/// embeds are advertising-affiliated, `broken_domains` marks hosts that are
/// known not to play at all. Matching is case-insensitive substring match
/// against the source URL.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PolicyConfig {
    #[serde(default = "default_ad_domains")]
    pub ad_domains: Vec<String>,
    #[serde(default = "default_broken_domains")]
    pub broken_domains: Vec<String>,
}

fn default_ad_domains() -> Vec<String> {
    [
        "facebook",
        "twitter",
        "ads",
        "doubleclick",
        "googlesyndication",
    ]
    .map(String::from)
    .to_vec()
}

fn default_broken_domains() -> Vec<String> {
    ["okprime.site", "film77.xyz"].map(String::from).to_vec()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            ad_domains: default_ad_domains(),
            broken_domains: default_broken_domains(),
        }
    }
}
