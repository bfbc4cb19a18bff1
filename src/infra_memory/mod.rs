mod refresh_session_store_memory;

pub use refresh_session_store_memory::*;
