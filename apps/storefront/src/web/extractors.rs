// apps/storefront/src/web/extractors.rs

//! Request extractors resolving the calling user from a JWT.
//!
//! The token comes from `Authorization: Bearer` first, then from the access
//! cookie. Cookie-authenticated requests with an unsafe method must also
//! pass the double-submit CSRF check.

use crate::errors::AppError;
use crate::models::User;
use crate::services::tokens::TokenKind;
use crate::state::AppState;
use actix_web::{dev::Payload, http::Method, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[derive(Debug, Clone)]
pub struct StaffUser(pub User);

/// The caller when valid credentials were sent, `None` otherwise. Never fails.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

struct Credentials {
  token: String,
  via_cookie: bool,
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
  let header = req.headers().get(actix_web::http::header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = header.split_once(' ')?;
  if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
    return None;
  }
  Some(token.trim().to_string())
}

fn credentials(req: &HttpRequest, app_state: &AppState) -> Option<Credentials> {
  if let Some(token) = bearer_token(req) {
    return Some(Credentials {
      token,
      via_cookie: false,
    });
  }
  req.cookie(&app_state.config.jwt_auth_cookie).map(|c| Credentials {
    token: c.value().to_string(),
    via_cookie: true,
  })
}

fn is_safe_method(method: &Method) -> bool {
  matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

fn csrf_passes(req: &HttpRequest) -> bool {
  let cookie = req.cookie(CSRF_COOKIE).map(|c| c.value().to_string());
  let header = req.headers().get(CSRF_HEADER).and_then(|h| h.to_str().ok()).map(str::to_string);
  matches!((cookie, header), (Some(c), Some(h)) if !c.is_empty() && c == h)
}

fn app_state_of(req: &HttpRequest) -> Result<AppState, AppError> {
  req
    .app_data::<web::Data<AppState>>()
    .map(|data| data.get_ref().clone())
    .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))
}

async fn resolve_user(app_state: &AppState, token: &str) -> Result<User, AppError> {
  let claims = app_state.tokens.verify(token, TokenKind::Access)?;
  match app_state.store.find_user_by_id(claims.sub).await? {
    Some(user) if user.is_active => Ok(user),
    Some(user) => {
      warn!(user_id = %user.id, "Token presented for an inactive account.");
      Err(AppError::Auth("User is inactive.".to_string()))
    }
    None => Err(AppError::Auth("User not found.".to_string())),
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let app_state = app_state_of(req);
    let creds = app_state.as_ref().ok().and_then(|state| credentials(req, state));
    let csrf_required = !is_safe_method(req.method());
    let csrf_ok = csrf_passes(req);

    Box::pin(async move {
      let app_state = app_state?;
      let Some(creds) = creds else {
        return Err(AppError::Auth("Authentication credentials were not provided.".to_string()));
      };
      let user = resolve_user(&app_state, &creds.token).await?;
      if creds.via_cookie && csrf_required && !csrf_ok {
        warn!(user_id = %user.id, "CSRF check failed for cookie-authenticated request.");
        return Err(AppError::Forbidden("CSRF check failed.".to_string()));
      }
      debug!(user_id = %user.id, via_cookie = creds.via_cookie, "Request authenticated.");
      Ok(AuthenticatedUser(user))
    })
  }
}

impl FromRequest for StaffUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
    let authenticated = AuthenticatedUser::from_request(req, payload);
    Box::pin(async move {
      let AuthenticatedUser(user) = authenticated.await?;
      if !user.is_staff {
        return Err(AppError::Forbidden(
          "You do not have permission to perform this action.".to_string(),
        ));
      }
      Ok(StaffUser(user))
    })
  }
}

impl FromRequest for MaybeUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
    let authenticated = AuthenticatedUser::from_request(req, payload);
    Box::pin(async move { Ok(MaybeUser(authenticated.await.ok().map(|AuthenticatedUser(u)| u))) })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  #[test]
  fn bearer_header_is_parsed() {
    let req = TestRequest::default()
      .insert_header(("Authorization", "Bearer abc.def.ghi"))
      .to_http_request();
    assert_eq!(bearer_token(&req).as_deref(), Some("abc.def.ghi"));

    let basic = TestRequest::default()
      .insert_header(("Authorization", "Basic dXNlcjpwdw=="))
      .to_http_request();
    assert_eq!(bearer_token(&basic), None);
  }

  #[test]
  fn csrf_requires_matching_cookie_and_header() {
    let ok = TestRequest::post()
      .cookie(actix_web::cookie::Cookie::new(CSRF_COOKIE, "tok"))
      .insert_header((CSRF_HEADER, "tok"))
      .to_http_request();
    assert!(csrf_passes(&ok));

    let mismatch = TestRequest::post()
      .cookie(actix_web::cookie::Cookie::new(CSRF_COOKIE, "tok"))
      .insert_header((CSRF_HEADER, "other"))
      .to_http_request();
    assert!(!csrf_passes(&mismatch));
    assert!(!csrf_passes(&TestRequest::post().to_http_request()));
  }

  #[test]
  fn safe_methods() {
    assert!(is_safe_method(&Method::GET));
    assert!(!is_safe_method(&Method::POST));
    assert!(!is_safe_method(&Method::DELETE));
  }
}
