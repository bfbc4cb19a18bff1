use crate::application_port::{AuthError, SecretHasher};
use crate::domain_model::RefreshSecret;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

/// Argon2id cost parameters. The defaults land in the tens of milliseconds
/// per hash on server hardware.
#[derive(Debug, Clone, Copy)]
pub struct HasherConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        HasherConfig {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Runs every hash and verification on the blocking pool so slow hashing
/// never stalls the async workers serving other subjects.
pub struct Argon2SecretHasher {
    argon2: Argon2<'static>,
}

impl Argon2SecretHasher {
    pub fn new(config: HasherConfig) -> Result<Self, argon2::Error> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )?;
        Ok(Argon2SecretHasher {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

fn join_error(e: tokio::task::JoinError) -> AuthError {
    AuthError::InternalError(format!("hashing task failed: {}", e))
}

#[async_trait::async_trait]
impl SecretHasher for Argon2SecretHasher {
    async fn hash_secret(&self, secret: &RefreshSecret) -> Result<String, AuthError> {
        let argon2 = self.argon2.clone();
        let secret = secret.clone();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(secret.expose(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AuthError::InternalError(e.to_string()))
        })
        .await
        .map_err(join_error)?
    }

    async fn verify_secret(
        &self,
        secret: &RefreshSecret,
        secret_hash: &str,
    ) -> Result<bool, AuthError> {
        let argon2 = self.argon2.clone();
        let secret = secret.clone();
        let secret_hash = secret_hash.to_owned();

        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&secret_hash).map_err(|e| {
                AuthError::InternalError(format!("invalid PHC hash: {}", e))
            })?;

            match argon2.verify_password(secret.expose(), &parsed) {
                Ok(_) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(AuthError::InternalError(format!("verify error: {}", e))),
            }
        })
        .await
        .map_err(join_error)?
    }
}
