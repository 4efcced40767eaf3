use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::ServiceError;
use crate::models::{Principal, Role, User};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: Role,
    exp: i64,
}

/// HS256 access tokens carrying the user id and role.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, expires_in_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(expires_in_hours),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, ServiceError> {
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|err| {
            error!(user_id = user.id, error = %err, "failed to sign access token");
            ServiceError::Internal
        })
    }

    pub fn verify(&self, token: &str) -> Result<Principal, ServiceError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|err| {
                debug!(error = %err, "rejected access token");
                ServiceError::Unauthorized
            })?;
        let user_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| ServiceError::Unauthorized)?;

        Ok(Principal {
            user_id,
            role: data.claims.role,
        })
    }
}
