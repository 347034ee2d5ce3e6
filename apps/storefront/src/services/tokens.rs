// apps/storefront/src/services/tokens.rs

//! Stateless JWT issuing and verification, injected through `AppState`.

use crate::errors::AppError;
use crate::models::User;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
  Access,
  Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// User id.
  pub sub: Uuid,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub token_type: TokenKind,
  pub iat: i64,
  pub exp: i64,
  pub jti: Uuid,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
  pub access: String,
  pub refresh: String,
}

pub struct TokenService {
  encoding_key: EncodingKey,
  decoding_key: DecodingKey,
  validation: Validation,
  access_ttl: Duration,
  refresh_ttl: Duration,
}

impl TokenService {
  pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
    Self {
      encoding_key: EncodingKey::from_secret(secret),
      decoding_key: DecodingKey::from_secret(secret),
      validation: Validation::default(),
      access_ttl,
      refresh_ttl,
    }
  }

  pub fn access_ttl(&self) -> Duration {
    self.access_ttl
  }

  pub fn refresh_ttl(&self) -> Duration {
    self.refresh_ttl
  }

  fn claims_for(&self, user: &User, kind: TokenKind) -> Claims {
    let now = Utc::now();
    let ttl = match kind {
      TokenKind::Access => self.access_ttl,
      TokenKind::Refresh => self.refresh_ttl,
    };
    Claims {
      sub: user.id,
      email: user.email.clone(),
      first_name: user.first_name.clone(),
      last_name: user.last_name.clone(),
      token_type: kind,
      iat: now.timestamp(),
      exp: (now + ttl).timestamp(),
      jti: Uuid::new_v4(),
    }
  }

  fn encode_claims(&self, claims: &Claims) -> Result<String, AppError> {
    encode(&Header::default(), claims, &self.encoding_key)
      .map_err(|e| AppError::Internal(format!("Failed to encode token: {}", e)))
  }

  #[instrument(name = "tokens::issue", skip(self, user), fields(user_id = %user.id, kind = ?kind))]
  pub fn issue(&self, user: &User, kind: TokenKind) -> Result<String, AppError> {
    self.encode_claims(&self.claims_for(user, kind))
  }

  pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AppError> {
    Ok(TokenPair {
      access: self.issue(user, TokenKind::Access)?,
      refresh: self.issue(user, TokenKind::Refresh)?,
    })
  }

  /// Decodes `token`, checking signature, expiry and that it is a `kind` token.
  pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
    let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
      .map(|data| data.claims)
      .map_err(|e| {
        debug!(error = %e, "Token rejected.");
        AppError::Auth("Token is invalid or expired".to_string())
      })?;
    if claims.token_type != kind {
      return Err(AppError::Auth("Token has wrong type".to_string()));
    }
    Ok(claims)
  }

  /// Mints a fresh access token carrying the identity of a verified refresh token.
  pub fn refresh_access(&self, refresh_token: &str) -> Result<String, AppError> {
    let refresh = self.verify(refresh_token, TokenKind::Refresh)?;
    let now = Utc::now();
    let claims = Claims {
      token_type: TokenKind::Access,
      iat: now.timestamp(),
      exp: (now + self.access_ttl).timestamp(),
      jti: Uuid::new_v4(),
      ..refresh
    };
    self.encode_claims(&claims)
  }
}

/// Random token for the double-submit CSRF check.
pub fn new_csrf_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}
