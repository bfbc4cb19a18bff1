mod refresh_session_store_mysql;

pub use refresh_session_store_mysql::*;
