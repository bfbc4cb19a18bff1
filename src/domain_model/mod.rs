mod credential;
mod session;
mod subject;

pub use credential::*;
pub use session::*;
pub use subject::*;
