// apps/storefront/src/services/activation.rs

//! Signed, time-limited account activation tokens.
//!
//! A token is `"{issued_at_base36}-{mac}"` where `mac` is an HMAC-SHA256 over
//! the user's id, activity flag, password hash and the issue timestamp. The
//! flag flips on activation, which invalidates every token issued before.

use crate::models::User;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCheck {
  Valid,
  Expired,
  Invalid,
}

pub struct ActivationTokens {
  secret: Vec<u8>,
  ttl: Duration,
}

impl ActivationTokens {
  pub fn new(secret: &[u8], ttl: Duration) -> Self {
    Self {
      secret: secret.to_vec(),
      ttl,
    }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  fn mac_for(&self, user: &User, issued_at: i64) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
    mac.update(user.id.as_bytes());
    mac.update(if user.is_active { b"1" } else { b"0" });
    mac.update(user.password_hash.as_bytes());
    mac.update(issued_at.to_string().as_bytes());
    Some(mac)
  }

  pub fn make_token(&self, user: &User) -> String {
    self.make_token_at(user, Utc::now())
  }

  pub fn make_token_at(&self, user: &User, issued_at: DateTime<Utc>) -> String {
    let ts = issued_at.timestamp();
    let signature = self
      .mac_for(user, ts)
      .map(|mac| URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
      .unwrap_or_default();
    format!("{}-{}", to_base36(ts), signature)
  }

  pub fn check_token(&self, user: &User, token: &str) -> TokenCheck {
    self.check_token_at(user, token, Utc::now())
  }

  /// Signature first, then age: a forged token never reports `Expired`.
  pub fn check_token_at(&self, user: &User, token: &str, now: DateTime<Utc>) -> TokenCheck {
    let Some((ts_part, sig_part)) = token.split_once('-') else {
      return TokenCheck::Invalid;
    };
    let Some(issued_at) = from_base36(ts_part) else {
      return TokenCheck::Invalid;
    };
    let Ok(signature) = URL_SAFE_NO_PAD.decode(sig_part) else {
      return TokenCheck::Invalid;
    };
    let Some(mac) = self.mac_for(user, issued_at) else {
      return TokenCheck::Invalid;
    };
    if mac.verify_slice(&signature).is_err() {
      return TokenCheck::Invalid;
    }
    if now.timestamp() - issued_at > self.ttl.num_seconds() {
      return TokenCheck::Expired;
    }
    TokenCheck::Valid
  }
}

pub fn encode_uid(id: Uuid) -> String {
  URL_SAFE_NO_PAD.encode(id.to_string())
}

pub fn decode_uid(uidb64: &str) -> Option<Uuid> {
  let bytes = URL_SAFE_NO_PAD.decode(uidb64.trim_end_matches('=')).ok()?;
  let text = String::from_utf8(bytes).ok()?;
  Uuid::parse_str(&text).ok()
}

fn to_base36(value: i64) -> String {
  const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
  if value <= 0 {
    return "0".to_string();
  }
  let mut n = value as u64;
  let mut out = Vec::new();
  while n > 0 {
    out.push(DIGITS[(n % 36) as usize]);
    n /= 36;
  }
  out.reverse();
  String::from_utf8(out).unwrap_or_default()
}

fn from_base36(text: &str) -> Option<i64> {
  if text.is_empty() || text.len() > 12 {
    return None;
  }
  i64::from_str_radix(text, 36).ok().filter(|v| *v >= 0)
}
