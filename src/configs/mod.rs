pub mod api;
pub mod base;
pub mod logging;
pub mod playback;
pub mod policy;

pub use api::*;
pub use base::*;
pub use logging::*;
pub use playback::*;
pub use policy::*;
