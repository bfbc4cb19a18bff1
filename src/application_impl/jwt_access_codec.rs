use crate::application_port::{AccessToken, AccessTokenCodec, AuthError};
use crate::domain_model::Subject;
use crate::logger::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const MIN_SIGNING_KEY_LEN: usize = 32;

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub algorithm: Algorithm,
    pub access_ttl: Duration,
    pub signing_key: Vec<u8>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtConfigError {
    #[error("algorithm {0:?} is not an HMAC algorithm")]
    UnsupportedAlgorithm(Algorithm),
    #[error("signing key must be at least 32 bytes")]
    WeakKey,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String,
}

fn encode_access(
    subject: &Subject,
    cfg: &JwtConfig,
    key: &EncodingKey,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.access_ttl;
    let claims = AccessClaims {
        sub: subject.to_string(),
        exp: exp_dt.timestamp(),
        iat: iat_dt.timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        jti: uuid::Uuid::new_v4().to_string(),
    };
    let token = encode(&Header::new(cfg.algorithm), &claims, key)
        .map_err(|e| AuthError::SigningFailure(e.to_string()))?;
    Ok((token, exp_dt))
}

fn decode_access(
    token: &str,
    validation: &Validation,
    key: &DecodingKey,
) -> Result<AccessClaims, AuthError> {
    let data = decode::<AccessClaims>(token, key, validation).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => debug!("access token expired"),
            kind => debug!(?kind, "access token rejected"),
        }
        AuthError::Unauthenticated
    })?;
    Ok(data.claims)
}

/// HMAC-signed JWT access tokens. Keys are derived once at construction.
pub struct JwtAccessCodec {
    cfg: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAccessCodec {
    pub fn new(cfg: JwtConfig) -> Result<Self, JwtConfigError> {
        if !matches!(
            cfg.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(JwtConfigError::UnsupportedAlgorithm(cfg.algorithm));
        }
        if cfg.signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(JwtConfigError::WeakKey);
        }

        let mut validation = Validation::new(cfg.algorithm);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_audience(&[cfg.audience.clone()]);
        validation.set_issuer(&[cfg.issuer.clone()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        Ok(JwtAccessCodec {
            encoding_key: EncodingKey::from_secret(&cfg.signing_key),
            decoding_key: DecodingKey::from_secret(&cfg.signing_key),
            validation,
            cfg,
        })
    }
}

#[async_trait::async_trait]
impl AccessTokenCodec for JwtAccessCodec {
    async fn issue_access_token(
        &self,
        subject: &Subject,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_access(subject, &self.cfg, &self.encoding_key)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn verify_access_token(&self, token: &AccessToken) -> Result<Subject, AuthError> {
        let claims = decode_access(&token.0, &self.validation, &self.decoding_key)?;
        Subject::new(claims.sub).map_err(|_| AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: &[u8]) -> JwtConfig {
        JwtConfig {
            issuer: "tokenpair.test".to_string(),
            audience: "tokenpair-client".to_string(),
            algorithm: Algorithm::HS512,
            access_ttl: Duration::from_secs(300),
            signing_key: key.to_vec(),
        }
    }

    fn subject() -> Subject {
        Subject::new("u1").unwrap()
    }

    #[tokio::test]
    async fn issued_token_verifies_to_subject() {
        let codec = JwtAccessCodec::new(config(&[1u8; 64])).unwrap();
        let before = Utc::now();
        let (token, exp) = codec.issue_access_token(&subject()).await.unwrap();
        let after = Utc::now();

        assert!(exp >= before + Duration::from_secs(300));
        assert!(exp <= after + Duration::from_secs(300));
        assert_eq!(codec.verify_access_token(&token).await.unwrap(), subject());
    }

    #[tokio::test]
    async fn token_header_names_configured_algorithm() {
        let codec = JwtAccessCodec::new(config(&[1u8; 64])).unwrap();
        let (token, _) = codec.issue_access_token(&subject()).await.unwrap();
        let header = jsonwebtoken::decode_header(&token.0).unwrap();
        assert_eq!(header.alg, Algorithm::HS512);
    }

    #[tokio::test]
    async fn rejects_token_signed_with_other_key() {
        let codec = JwtAccessCodec::new(config(&[1u8; 64])).unwrap();
        let other = JwtAccessCodec::new(config(&[2u8; 64])).unwrap();
        let (token, _) = other.issue_access_token(&subject()).await.unwrap();

        assert!(matches!(
            codec.verify_access_token(&token).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let mut cfg = config(&[1u8; 64]);
        cfg.access_ttl = Duration::ZERO;
        let codec = JwtAccessCodec::new(cfg).unwrap();
        let (token, _) = codec.issue_access_token(&subject()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(matches!(
            codec.verify_access_token(&token).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let codec = JwtAccessCodec::new(config(&[1u8; 64])).unwrap();
        let result = codec
            .verify_access_token(&AccessToken("not.a.jwt".to_string()))
            .await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }

    #[test]
    fn refuses_weak_key_and_asymmetric_algorithm() {
        assert!(matches!(
            JwtAccessCodec::new(config(b"short")),
            Err(JwtConfigError::WeakKey)
        ));

        let mut cfg = config(&[1u8; 64]);
        cfg.algorithm = Algorithm::RS256;
        assert!(matches!(
            JwtAccessCodec::new(cfg),
            Err(JwtConfigError::UnsupportedAlgorithm(Algorithm::RS256))
        ));
    }
}
