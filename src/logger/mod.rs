//! Process-wide `tracing` setup. Bootstraps at `info` (or `RUST_LOG`) and is
//! reloaded once settings are known.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
