pub mod session;

pub use session::{FetchState, WatchSession};
