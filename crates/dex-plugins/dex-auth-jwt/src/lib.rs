//! # dex-auth-jwt
//!
//! HS256 bearer-token implementation of `IdentityProvider`.
//! Tokens are issued by the hosted auth service; the admin flag lives in
//! `app_metadata.role`.

use async_trait::async_trait;
use dex_core::models::{Identity, Role};
use dex_core::traits::IdentityProvider;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
struct AppMetadata {
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    app_metadata: AppMetadata,
}

pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    /// Without an `audience`, the `aud` claim is not checked.
    pub fn new(secret: &SecretString, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    fn identify(&self, token: &str) -> Option<Identity> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|err| debug!(error = %err, "rejected bearer token"))
            .ok()?;

        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| debug!("token subject is not a UUID"))
            .ok()?;
        let role = match data.claims.app_metadata.role.as_deref() {
            Some("admin") => Role::Admin,
            _ => Role::User,
        };
        Some(Identity { id, role })
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn current_user(&self, bearer: Option<&str>) -> Option<Identity> {
        self.identify(bearer?)
    }
}
