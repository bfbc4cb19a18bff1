mod refresh_session_store;

pub use refresh_session_store::*;
