mod error;
mod handler;
mod router;

pub use error::{ApiError, ApiErrorCode, recover_error};
pub use handler::{ACCESS_COOKIE, ApiResponse, REFRESH_COOKIE};
pub use router::routes;
