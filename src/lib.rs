//! Headless playback-source controller for a streaming video catalog.
//!
//! The crate owns the watch-page playback subsystem: normalizing the list of
//! candidate playback sources for one content item, attaching and detaching
//! delivery strategies (native adaptive streams vs. embedded third-party
//! documents), tracking per-source failures with manual-only recovery, and
//! the click-to-activate gate that keeps embedded players non-interactive
//! until the viewer confirms intent.
//!
//! Everything else on the page (routing, grids, pagination) lives upstream;
//! the catalog API is consumed through the [`content::ContentApi`] trait.

pub mod common;
pub mod configs;
pub mod content;
pub mod playback;
pub mod watch;
