// apps/storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Postgres URL, or `memory://` for the in-process store.
  pub database_url: String,
  pub db_max_connections: u32,
  pub app_base_url: String,
  pub frontend_verify_url: Option<String>,

  pub jwt_secret: String,
  pub access_token_ttl_minutes: i64,
  pub refresh_token_ttl_minutes: i64,
  pub jwt_auth_cookie: String,
  pub jwt_refresh_cookie: String,
  pub cookie_secure: bool,
  pub activation_ttl_minutes: i64,

  pub email_sender: String,
  pub seed_db: bool,
  /// When both are set, startup ensures an active staff account with these credentials.
  pub admin_email: Option<String>,
  pub admin_password: Option<String>,
  pub log_format: LogFormat,
}

fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    None => Ok(default),
    Some(value) => value
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, value, e))),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any `name -> value` source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| lookup(var_name).filter(|v| !v.trim().is_empty());
    let require = |var_name: &str| {
      get_env(var_name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_var("SERVER_PORT", get_env("SERVER_PORT"), 8080u16)?;
    let database_url = require("DATABASE_URL")?;
    let db_max_connections = parse_var("DB_MAX_CONNECTIONS", get_env("DB_MAX_CONNECTIONS"), 10u32)?;
    let app_base_url = get_env("APP_BASE_URL")
      .unwrap_or_else(|| format!("http://{}:{}", server_host, server_port))
      .trim_end_matches('/')
      .to_string();
    let frontend_verify_url = get_env("FRONTEND_VERIFY_URL");

    let jwt_secret = require("JWT_SECRET")?;
    let access_token_ttl_minutes = parse_var("ACCESS_TOKEN_TTL_MINUTES", get_env("ACCESS_TOKEN_TTL_MINUTES"), 5i64)?;
    let refresh_token_ttl_minutes =
      parse_var("REFRESH_TOKEN_TTL_MINUTES", get_env("REFRESH_TOKEN_TTL_MINUTES"), 1440i64)?;
    let jwt_auth_cookie = get_env("JWT_AUTH_COOKIE").unwrap_or_else(|| "access_token".to_string());
    let jwt_refresh_cookie = get_env("JWT_REFRESH_COOKIE").unwrap_or_else(|| "refresh_token".to_string());
    let cookie_secure = parse_var("COOKIE_SECURE", get_env("COOKIE_SECURE"), false)?;
    let activation_ttl_minutes = parse_var("ACTIVATION_TTL_MINUTES", get_env("ACTIVATION_TTL_MINUTES"), 15i64)?;

    for (name, minutes) in [
      ("ACCESS_TOKEN_TTL_MINUTES", access_token_ttl_minutes),
      ("REFRESH_TOKEN_TTL_MINUTES", refresh_token_ttl_minutes),
      ("ACTIVATION_TTL_MINUTES", activation_ttl_minutes),
    ] {
      if minutes <= 0 {
        return Err(AppError::Config(format!("{} must be positive, got {}", name, minutes)));
      }
    }

    let email_sender = get_env("EMAIL_SENDER").unwrap_or_else(|| "noreply@example.com".to_string());
    let seed_db = parse_var("SEED_DB", get_env("SEED_DB"), false)?;
    let admin_email = get_env("ADMIN_EMAIL").map(|e| e.trim().to_lowercase());
    let admin_password = get_env("ADMIN_PASSWORD");
    let log_format = match get_env("LOG_FORMAT").map(|v| v.to_ascii_lowercase()).as_deref() {
      None | Some("text") => LogFormat::Text,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT value '{}'", other))),
    };

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      db_max_connections,
      app_base_url,
      frontend_verify_url,
      jwt_secret,
      access_token_ttl_minutes,
      refresh_token_ttl_minutes,
      jwt_auth_cookie,
      jwt_refresh_cookie,
      cookie_secure,
      activation_ttl_minutes,
      email_sender,
      seed_db,
      admin_email,
      admin_password,
      log_format,
    })
  }

  pub fn uses_memory_store(&self) -> bool {
    self.database_url.starts_with("memory://")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| map.get(name).cloned()
  }

  #[test]
  fn defaults_apply_when_only_required_vars_are_set() {
    let cfg = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "memory://"), ("JWT_SECRET", "s3cret")])).unwrap();
    assert_eq!(cfg.server_host, "127.0.0.1");
    assert_eq!(cfg.server_port, 8080);
    assert_eq!(cfg.app_base_url, "http://127.0.0.1:8080");
    assert_eq!(cfg.access_token_ttl_minutes, 5);
    assert_eq!(cfg.refresh_token_ttl_minutes, 1440);
    assert_eq!(cfg.activation_ttl_minutes, 15);
    assert_eq!(cfg.jwt_auth_cookie, "access_token");
    assert_eq!(cfg.jwt_refresh_cookie, "refresh_token");
    assert_eq!(cfg.log_format, LogFormat::Text);
    assert!(!cfg.cookie_secure);
    assert!(!cfg.seed_db);
    assert!(cfg.admin_email.is_none());
    assert!(cfg.uses_memory_store());
  }

  #[test]
  fn missing_secret_is_a_config_error() {
    let err = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "memory://")])).unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("JWT_SECRET")));
  }

  #[test]
  fn invalid_values_are_rejected() {
    let bad_port = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "memory://"),
      ("JWT_SECRET", "s"),
      ("SERVER_PORT", "eighty"),
    ]));
    assert!(matches!(bad_port, Err(AppError::Config(m)) if m.contains("SERVER_PORT")));

    let zero_ttl = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "memory://"),
      ("JWT_SECRET", "s"),
      ("ACTIVATION_TTL_MINUTES", "0"),
    ]));
    assert!(matches!(zero_ttl, Err(AppError::Config(m)) if m.contains("ACTIVATION_TTL_MINUTES")));
  }

  #[test]
  fn overrides_are_read() {
    let cfg = AppConfig::from_lookup(lookup_from(&[
      ("DATABASE_URL", "postgres://localhost/shop"),
      ("JWT_SECRET", "s"),
      ("APP_BASE_URL", "https://shop.example.com/"),
      ("COOKIE_SECURE", "true"),
      ("LOG_FORMAT", "JSON"),
    ]))
    .unwrap();
    assert_eq!(cfg.app_base_url, "https://shop.example.com");
    assert!(cfg.cookie_secure);
    assert_eq!(cfg.log_format, LogFormat::Json);
    assert!(!cfg.uses_memory_store());
  }
}
