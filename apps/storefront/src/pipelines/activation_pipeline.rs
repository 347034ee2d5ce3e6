// apps/storefront/src/pipelines/activation_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::ActivationCtxData;
use crate::services::activation::{decode_uid, TokenCheck};
use crate::state::AppState;
use chrono::Utc;
use shopflow::{ContextData, Pipeline, PipelineControl, Shopflow};
use std::sync::Arc;
use tracing::{info, warn};

const INVALID_LINK: &str = "Invalid activation link.";
const ACTIVATION_EXPIRED: &str = "Activation window has elapsed. Please register again.";

pub fn register_activation_pipeline(flows: &Arc<Shopflow<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<ActivationCtxData, AppError>::new(&[
    ("decode_user_reference", false, None),
    ("load_pending_user", false, None),
    ("verify_activation_token", false, None),
    ("activate_account", false, None),
  ]);

  p.on("decode_user_reference", |ctx_data: ContextData<ActivationCtxData>| {
    Box::pin(async move {
      let uidb64 = ctx_data.read().uidb64.clone();
      let user_id = decode_uid(&uidb64).ok_or_else(|| {
        warn!(%uidb64, "Activation link carries an undecodable user reference.");
        AppError::Validation(INVALID_LINK.to_string())
      })?;
      ctx_data.write().user_id = Some(user_id);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("load_pending_user", |ctx_data: ContextData<ActivationCtxData>| {
    Box::pin(async move {
      let (user_id, store) = {
        let guard = ctx_data.read();
        (guard.user_id, guard.app_state.store.clone())
      };
      let user_id = user_id.ok_or_else(|| AppError::Validation(INVALID_LINK.to_string()))?;
      let user = store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Validation(INVALID_LINK.to_string()))?;
      ctx_data.write().user = Some(user);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("verify_activation_token", |ctx_data: ContextData<ActivationCtxData>| {
    Box::pin(async move {
      let (app_state, user, token) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user.clone(), guard.token.clone())
      };
      let user = user.ok_or_else(|| AppError::Validation(INVALID_LINK.to_string()))?;

      let window_elapsed = Utc::now() - user.date_joined >= app_state.activation.ttl();
      match app_state.activation.check_token(&user, &token) {
        TokenCheck::Invalid => {
          warn!(user_id = %user.id, "Activation token rejected.");
          Err(AppError::Validation("Invalid or expired token.".to_string()))
        }
        TokenCheck::Expired => Err(expire(&app_state).await),
        TokenCheck::Valid if window_elapsed => Err(expire(&app_state).await),
        TokenCheck::Valid => Ok::<_, AppError>(PipelineControl::Continue),
      }
    })
  });

  p.on("activate_account", |ctx_data: ContextData<ActivationCtxData>| {
    Box::pin(async move {
      let (user_id, store) = {
        let guard = ctx_data.read();
        (guard.user.as_ref().map(|u| u.id), guard.app_state.store.clone())
      };
      let user_id = user_id.ok_or_else(|| AppError::Validation(INVALID_LINK.to_string()))?;
      if !store.activate_user(user_id).await? {
        return Err(AppError::Validation(INVALID_LINK.to_string()));
      }
      info!(%user_id, "Account activated.");
      ctx_data.write().activated = true;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  tracing::info!("Activation pipeline registered.");
}

/// Purges stale inactive accounts and builds the "window elapsed" rejection.
async fn expire(app_state: &AppState) -> AppError {
  let cutoff = Utc::now() - app_state.activation.ttl();
  match app_state.store.purge_inactive_users(cutoff).await {
    Ok(purged) => info!(purged, "Activation expired; stale inactive accounts removed."),
    Err(e) => warn!(error = %e, "Activation expired; purging stale accounts failed."),
  }
  AppError::Validation(ACTIVATION_EXPIRED.to_string())
}
