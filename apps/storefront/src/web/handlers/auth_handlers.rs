// apps/storefront/src/web/handlers/auth_handlers.rs

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use shopflow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines::contexts::{ActivationCtxData, RegistrationCtxData, SigninCtxData};
use crate::services::tokens::new_csrf_token;
use crate::state::AppState;
use crate::web::extractors::{AuthenticatedUser, CSRF_COOKIE};

#[derive(Deserialize, Debug)]
pub struct RegisterPayload {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  #[serde(default)]
  pub password: String,
  #[serde(default)]
  pub password2: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct RefreshPayload {
  pub refresh: Option<String>,
}

fn auth_cookie(config: &AppConfig, name: &str, value: String, ttl: chrono::Duration) -> Cookie<'static> {
  Cookie::build(name.to_string(), value)
    .path("/")
    .http_only(true)
    .secure(config.cookie_secure)
    .same_site(SameSite::Lax)
    .max_age(CookieDuration::seconds(ttl.num_seconds()))
    .finish()
}

fn removal_cookie(name: &str) -> Cookie<'static> {
  let mut cookie = Cookie::build(name.to_string(), "").path("/").finish();
  cookie.make_removal();
  cookie
}

#[instrument(name = "handler::register", skip(app_state, payload), fields(req_email = %payload.email))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let ctx = ContextData::new(RegistrationCtxData::new(
    app_state.get_ref().clone(),
    payload.email,
    payload.first_name,
    payload.last_name,
    payload.password,
    payload.password2,
  ));

  match app_state.flows.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let guard = ctx.read();
      let user_id = guard.created_user.as_ref().map(|u| u.id).ok_or_else(|| {
        AppError::Internal("Registration completed without creating a user.".to_string())
      })?;
      info!(%user_id, email_sent = guard.activation_email_sent, "Registration accepted.");
      Ok(HttpResponse::Created().json(json!({
        "detail": "User registered. Check your email to activate the account.",
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Registration pipeline stopped before completion.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::activate", skip(app_state, path))]
pub async fn activate_handler(
  app_state: web::Data<AppState>,
  path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
  let (uidb64, token) = path.into_inner();
  let ctx = ContextData::new(ActivationCtxData {
    app_state: app_state.get_ref().clone(),
    uidb64,
    token,
    user_id: None,
    user: None,
    activated: false,
  });

  match app_state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed if ctx.read().activated => {
      Ok(HttpResponse::Ok().json(json!({"detail": "Account activated."})))
    }
    _ => Err(AppError::PipelineHaltedByHandler),
  }
}

#[instrument(name = "handler::login", skip(app_state, payload), fields(req_email = %payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let ctx = ContextData::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.email.trim().to_lowercase(),
    password: payload.password,
    user: None,
    tokens: None,
  });

  match app_state.flows.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (user, pair) = {
        let guard = ctx.read();
        (guard.user.clone(), guard.tokens.clone())
      };
      let (Some(user), Some(pair)) = (user, pair) else {
        return Err(AppError::Internal("Sign-in completed without issuing tokens.".to_string()));
      };
      let config = &app_state.config;
      info!(user_id = %user.id, "Sign-in successful.");
      Ok(
        HttpResponse::Ok()
          .cookie(auth_cookie(
            config,
            &config.jwt_auth_cookie,
            pair.access.clone(),
            app_state.tokens.access_ttl(),
          ))
          .cookie(auth_cookie(
            config,
            &config.jwt_refresh_cookie,
            pair.refresh.clone(),
            app_state.tokens.refresh_ttl(),
          ))
          .json(json!({
            "user": user,
            "access": pair.access,
            "refresh": pair.refresh,
          })),
      )
    }
    Ok(PipelineResult::Stopped) => Err(AppError::PipelineHaltedByHandler),
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::refresh", skip_all)]
pub async fn refresh_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  payload: Option<web::Json<RefreshPayload>>,
) -> Result<HttpResponse, AppError> {
  let config = &app_state.config;
  let refresh_token = req
    .cookie(&config.jwt_refresh_cookie)
    .map(|c| c.value().to_string())
    .or_else(|| payload.and_then(|p| p.into_inner().refresh))
    .ok_or_else(|| AppError::Auth("Refresh token was not provided.".to_string()))?;

  let access = app_state.tokens.refresh_access(&refresh_token)?;
  Ok(
    HttpResponse::Ok()
      .cookie(auth_cookie(
        config,
        &config.jwt_auth_cookie,
        access.clone(),
        app_state.tokens.access_ttl(),
      ))
      .json(json!({"access": access})),
  )
}

#[instrument(name = "handler::logout", skip_all)]
pub async fn logout_handler(app_state: web::Data<AppState>) -> HttpResponse {
  HttpResponse::Ok()
    .cookie(removal_cookie(&app_state.config.jwt_auth_cookie))
    .cookie(removal_cookie(&app_state.config.jwt_refresh_cookie))
    .json(json!({"detail": "Logged out."}))
}

#[instrument(name = "handler::csrf", skip_all)]
pub async fn csrf_handler(app_state: web::Data<AppState>) -> HttpResponse {
  let token = new_csrf_token();
  let cookie = Cookie::build(CSRF_COOKIE, token.clone())
    .path("/")
    .secure(app_state.config.cookie_secure)
    .same_site(SameSite::Lax)
    .finish();
  HttpResponse::Ok().cookie(cookie).json(json!({"csrfToken": token}))
}

#[instrument(name = "handler::me", skip_all, fields(user_id = %auth_user.0.id))]
pub async fn me_handler(auth_user: AuthenticatedUser) -> HttpResponse {
  HttpResponse::Ok().json(auth_user.0)
}
