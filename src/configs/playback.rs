use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlaybackConfig {
    /// Delay after which an embedded document with no load signal is assumed
    /// ready, in milliseconds. Cross-origin embeds expose no reliable ready
    /// event, so a silent failure within this window is indistinguishable
    /// from a slow success. Known-imprecise heuristic, kept on purpose.
    #[serde(default = "default_embed_assume_ready_ms")]
    pub embed_assume_ready_ms: u64,
    /// Timeout for probing a native source (manifest fetch or direct-URL
    /// probe), in milliseconds.
    #[serde(default = "default_native_probe_timeout_ms")]
    pub native_probe_timeout_ms: u64,
}

fn default_embed_assume_ready_ms() -> u64 {
    3_000
}

fn default_native_probe_timeout_ms() -> u64 {
    15_000
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            embed_assume_ready_ms: default_embed_assume_ready_ms(),
            native_probe_timeout_ms: default_native_probe_timeout_ms(),
        }
    }
}
