mod argon2_secret_hasher;
mod jwt_access_codec;
mod subject_locks;
mod token_service_impl;

pub use argon2_secret_hasher::*;
pub use jwt_access_codec::*;
pub use subject_locks::*;
pub use token_service_impl::*;
