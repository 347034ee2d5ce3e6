// apps/storefront/src/pipelines/registration_pipeline.rs

use crate::config::AppConfig;
use crate::errors::{AppError, FieldErrors};
use crate::models::NewUser;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{RegistrationCtxData, SendActivationEmailCtxData};
use crate::services::activation::encode_uid;
use crate::services::auth_service;
use crate::state::AppState;
use chrono::Utc;
use shopflow::{ContextData, Pipeline, PipelineControl, Shopflow};
use std::sync::Arc;
use tracing::{event, info, warn, Level};
use uuid::Uuid;

/// Link the user follows to activate: the frontend page when configured, otherwise the API route.
pub fn activation_link(config: &AppConfig, user_id: Uuid, token: &str) -> String {
  let uid = encode_uid(user_id);
  match &config.frontend_verify_url {
    Some(frontend) => format!("{}?uid={}&token={}", frontend, uid, token),
    None => format!("{}/api/v1/auth/activate/{}/{}", config.app_base_url, uid, token),
  }
}

pub fn register_registration_pipeline(flows: &Arc<Shopflow<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<RegistrationCtxData, AppError>::new(&[
    ("purge_stale_inactive_accounts", false, None),
    ("validate_registration_input", false, None),
    ("check_existing_account", false, None),
    ("create_inactive_user", false, None),
    ("send_activation_email", true, None),
  ]);

  p.on("purge_stale_inactive_accounts", |ctx_data: ContextData<RegistrationCtxData>| {
    Box::pin(async move {
      let app_state = ctx_data.read().app_state.clone();
      let cutoff = Utc::now() - app_state.activation.ttl();
      let purged = app_state.store.purge_inactive_users(cutoff).await?;
      if purged > 0 {
        info!(purged, "Removed inactive accounts past their activation window.");
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("validate_registration_input", |ctx_data: ContextData<RegistrationCtxData>| {
    Box::pin(async move {
      let mut errors = FieldErrors::new();
      {
        let guard = ctx_data.read();
        if guard.email.is_empty() {
          errors.add("email", "This field is required.");
        } else if !auth_service::is_valid_email(&guard.email) {
          errors.add("email", "Enter a valid email address.");
        }
        if guard.first_name.is_empty() {
          errors.add("first_name", "This field is required.");
        }
        if guard.last_name.is_empty() {
          errors.add("last_name", "This field is required.");
        }
        if guard.password != guard.password2 {
          errors.add("password", "Passwords do not match.");
        }
        for problem in auth_service::password_problems(&guard.password, &guard.email) {
          errors.add("password", problem);
        }
      }
      if !errors.is_empty() {
        warn!(%errors, "Registration input rejected.");
      }
      errors.into_result()?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("check_existing_account", |ctx_data: ContextData<RegistrationCtxData>| {
    Box::pin(async move {
      let (email, store) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.store.clone())
      };

      match store.find_user_by_email(&email).await? {
        Some(existing) if existing.is_active => {
          warn!(%email, "Registration attempted for an already active account.");
          Err(AppError::field("email", "A user with this email already exists."))
        }
        Some(stale) => {
          event!(Level::DEBUG, user_id = %stale.id, "Replacing inactive account with the same email.");
          store.delete_user(stale.id).await?;
          ctx_data.write().replaced_inactive_account = true;
          Ok(PipelineControl::Continue)
        }
        None => Ok::<_, AppError>(PipelineControl::Continue),
      }
    })
  });

  p.on("create_inactive_user", |ctx_data: ContextData<RegistrationCtxData>| {
    Box::pin(async move {
      let (new_user_fields, password, store) = {
        let guard = ctx_data.read();
        (
          (guard.email.clone(), guard.first_name.clone(), guard.last_name.clone()),
          guard.password.clone(),
          guard.app_state.store.clone(),
        )
      };
      let (email, first_name, last_name) = new_user_fields;

      let password_hash = auth_service::hash_password(&password)?;
      let user = store
        .create_user(&NewUser {
          email,
          first_name,
          last_name,
          password_hash,
          is_active: false,
          is_staff: false,
        })
        .await?;
      info!(user_id = %user.id, username = %user.username, "Inactive user created.");
      ctx_data.write().created_user = Some(user);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("send_activation_email", |ctx_data: ContextData<RegistrationCtxData>| {
    Box::pin(async move {
      let (app_state, user) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.created_user.clone())
      };
      let Some(user) = user else {
        return Err(AppError::Internal("Activation email requested before the user was created".to_string()));
      };

      let token = app_state.activation.make_token(&user);
      let link = activation_link(&app_state.config, user.id, &token);
      ctx_data.write().activation_link = Some(link.clone());

      let email_ctx = ContextData::new(SendActivationEmailCtxData {
        app_state,
        recipient_email: user.email.clone(),
        recipient_name: user.first_name.clone(),
        activation_link: link,
      });
      common_steps::send_activation_email_step(email_ctx).await?;
      ctx_data.write().activation_email_sent = true;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  tracing::info!("Registration pipeline registered.");
}
