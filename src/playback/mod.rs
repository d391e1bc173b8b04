pub mod controller;
pub mod events;
pub mod policy;
pub mod session;
pub mod source;
pub mod strategy;

pub use controller::SourceController;
pub use events::PlayerEvent;
pub use policy::{PolicyClass, UrlPolicy};
pub use session::{Gate, PlaybackSession, Snapshot};
pub use source::{PlaybackSource, SourceKind, normalize_sources};
pub use strategy::{AttachSignal, Attachment, SignalKind, SourceStrategy};
