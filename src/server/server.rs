use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::{Context, anyhow};
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub token_service: Arc<dyn TokenService>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let mut pool = None;
        let store: Arc<dyn RefreshSessionStore> = match settings.store.backend.as_str() {
            "memory" => {
                warn!("using in-memory refresh session store, sessions die with the process");
                Arc::new(MemoryRefreshSessionStore::new())
            }
            "redis" => {
                let dsn = settings
                    .store
                    .dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.dsn is required for the redis backend"))?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisRefreshSessionStore::new(
                    redis_manager,
                    settings.store.prefix.clone(),
                ))
            }
            "mysql" => {
                let dsn = settings
                    .store
                    .dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.dsn is required for the mysql backend"))?;
                let mysql_pool = Pool::<MySql>::connect(dsn).await?;
                pool = Some(mysql_pool.clone());
                Arc::new(MySqlRefreshSessionStore::new(mysql_pool))
            }
            other => return Err(anyhow!("Unknown store backend: {}", other)),
        };

        let hasher: Arc<dyn SecretHasher> = Arc::new(
            Argon2SecretHasher::new(HasherConfig {
                memory_kib: settings.hasher.memory_kib,
                iterations: settings.hasher.iterations,
                parallelism: settings.hasher.parallelism,
            })
            .map_err(|e| anyhow!("invalid hasher settings: {}", e))?,
        );

        let signing_key = std::env::var(&settings.token.signing_key_env)
            .with_context(|| {
                format!(
                    "signing key variable {} is not set",
                    settings.token.signing_key_env
                )
            })?
            .into_bytes();
        let algorithm = settings
            .token
            .algorithm
            .parse::<jsonwebtoken::Algorithm>()
            .map_err(|e| anyhow!("invalid token algorithm {}: {}", settings.token.algorithm, e))?;
        let codec: Arc<dyn AccessTokenCodec> = Arc::new(JwtAccessCodec::new(JwtConfig {
            issuer: settings.token.issuer.clone(),
            audience: settings.token.audience.clone(),
            algorithm,
            access_ttl: Duration::from_secs(settings.token.access_ttl_secs),
            signing_key,
        })?);

        let token_service: Arc<dyn TokenService> = Arc::new(RealTokenService::new(
            store,
            hasher,
            codec,
            TokenServiceConfig {
                refresh_ttl: Duration::from_secs(settings.token.refresh_ttl_secs),
                store_timeout: Duration::from_millis(settings.store.timeout_ms),
            },
        ));

        info!(backend = %settings.store.backend, "server started");

        Ok(Self {
            token_service,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
