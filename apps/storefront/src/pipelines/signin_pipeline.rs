// apps/storefront/src/pipelines/signin_pipeline.rs

use crate::errors::{AppError, FieldErrors};
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use crate::state::AppState;
use shopflow::{ContextData, Pipeline, PipelineControl, Shopflow};
use std::sync::Arc;
use tracing::{event, warn, Level};

const BAD_CREDENTIALS: &str = "Invalid email or password.";

/// Sign-in failures answer 400, like any other rejected form.
pub fn register_signin_pipeline(flows: &Arc<Shopflow<AppError>>, _app_state: &AppState) {
  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("fetch_user_by_email", false, None),
    ("verify_user_password", false, None),
    ("require_active_account", false, None),
    ("issue_token_pair", false, None),
  ]);

  signin_p.on("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let mut errors = FieldErrors::new();
      {
        let guard = ctx_data.read();
        if guard.email.is_empty() {
          errors.add("email", "This field is required.");
        }
        if guard.password.is_empty() {
          errors.add("password", "This field is required.");
        }
      }
      errors.into_result()?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signin_p.on("fetch_user_by_email", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email, store) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.store.clone())
      };
      event!(Level::DEBUG, %email, "Fetching user for sign-in.");
      match store.find_user_by_email(&email).await? {
        Some(user) => {
          ctx_data.write().user = Some(user);
          Ok::<_, AppError>(PipelineControl::Continue)
        }
        None => {
          warn!(%email, "Sign-in for unknown email.");
          Err(AppError::Validation(BAD_CREDENTIALS.to_string()))
        }
      }
    })
  });

  signin_p.on("verify_user_password", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (stored_hash, password, user_id) = {
        let guard = ctx_data.read();
        (
          guard.user.as_ref().map(|u| u.password_hash.clone()),
          guard.password.clone(),
          guard.user.as_ref().map(|u| u.id),
        )
      };
      let Some(stored_hash) = stored_hash else {
        event!(Level::ERROR, "User missing from sign-in context at password check.");
        return Err(AppError::Internal("User unexpectedly missing for verification.".to_string()));
      };
      if !auth_service::verify_password(&stored_hash, &password)? {
        warn!(user_id = ?user_id, "Sign-in with wrong password.");
        return Err(AppError::Validation(BAD_CREDENTIALS.to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signin_p.on("require_active_account", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let active = ctx_data.read().user.as_ref().map_or(false, |u| u.is_active);
      if !active {
        return Err(AppError::Validation("Account is not activated.".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signin_p.on("issue_token_pair", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (user, tokens) = {
        let guard = ctx_data.read();
        (guard.user.clone(), guard.app_state.tokens.clone())
      };
      let user = user.ok_or_else(|| AppError::Internal("User unexpectedly missing for token issue.".to_string()))?;
      let pair = tokens.issue_pair(&user)?;
      event!(Level::INFO, user_id = %user.id, "Token pair issued.");
      ctx_data.write().tokens = Some(pair);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(signin_p);
  tracing::info!("Sign-in pipeline registered.");
}
