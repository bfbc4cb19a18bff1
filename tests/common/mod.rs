//! Shared fixtures: a token service over the in-memory store with cheap
//! Argon2 parameters.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use tokenpair::application_impl::*;
use tokenpair::domain_model::*;
use tokenpair::domain_port::*;
use tokenpair::infra_memory::MemoryRefreshSessionStore;

pub const SIGNING_KEY: &[u8] = b"integration-test-signing-key-0123456789abcdef";

pub fn fast_hasher() -> Arc<Argon2SecretHasher> {
    Arc::new(
        Argon2SecretHasher::new(HasherConfig {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        })
        .expect("Cheap argon2 parameters should be accepted."),
    )
}

pub fn codec() -> Arc<JwtAccessCodec> {
    Arc::new(
        JwtAccessCodec::new(JwtConfig {
            issuer: "tokenpair.test".to_string(),
            audience: "tokenpair-client".to_string(),
            algorithm: jsonwebtoken::Algorithm::HS512,
            access_ttl: Duration::from_secs(300),
            signing_key: SIGNING_KEY.to_vec(),
        })
        .expect("Test JWT configuration should be valid."),
    )
}

pub struct Harness {
    pub service: Arc<RealTokenService>,
    pub store: Arc<MemoryRefreshSessionStore>,
    pub hasher: Arc<Argon2SecretHasher>,
}

pub fn harness() -> Harness {
    harness_with_store(Arc::new(MemoryRefreshSessionStore::new()))
}

pub fn harness_with_store(store: Arc<MemoryRefreshSessionStore>) -> Harness {
    let hasher = fast_hasher();
    let service = Arc::new(RealTokenService::new(
        store.clone(),
        hasher.clone(),
        codec(),
        TokenServiceConfig::default(),
    ));
    Harness {
        service,
        store,
        hasher,
    }
}

/// Service over an arbitrary store, e.g. a failing test double.
pub fn service_over(
    store: Arc<dyn RefreshSessionStore>,
    store_timeout: Duration,
) -> RealTokenService {
    RealTokenService::new(
        store,
        fast_hasher(),
        codec(),
        TokenServiceConfig {
            store_timeout,
            ..TokenServiceConfig::default()
        },
    )
}

pub fn subject(raw: &str) -> Subject {
    Subject::new(raw).expect("Fixture subject should be valid.")
}
