// apps/storefront/src/pipelines/common_steps.rs

//! Email steps shared by the registration and checkout pipelines.

use crate::errors::AppError;
use crate::pipelines::contexts::{SendActivationEmailCtxData, SendOrderConfirmationEmailCtxData};
use crate::services::mailer::EmailMessage;
use shopflow::{ContextData, PipelineControl};
use tracing::{info, instrument, warn};

#[instrument(name = "common_step::send_activation_email", skip(ctx_data), err(Display))]
pub async fn send_activation_email_step(
  ctx_data: ContextData<SendActivationEmailCtxData>,
) -> Result<PipelineControl, AppError> {
  let (recipient_email, recipient_name, link, sender, mailer) = {
    let guard = ctx_data.read();
    (
      guard.recipient_email.clone(),
      guard.recipient_name.clone(),
      guard.activation_link.clone(),
      guard.app_state.config.email_sender.clone(),
      guard.app_state.mailer.clone(),
    )
  };

  let message = EmailMessage {
    to: recipient_email.clone(),
    from: sender,
    subject: "Account activation link".to_string(),
    body: format!(
      "Hi {},\n\nFollow this link to activate your account:\n{}\n\nThe link is valid for a limited time.",
      recipient_name, link
    ),
  };
  match mailer.send(message).await {
    Ok(sent_info) => {
      info!(to = %recipient_email, message_id = %sent_info.message_id, "Activation email sent.");
      Ok(PipelineControl::Continue)
    }
    Err(e) => {
      warn!(to = %recipient_email, error = %e, "Failed to send activation email.");
      Err(e)
    }
  }
}

#[instrument(name = "common_step::send_order_confirmation", skip(ctx_data), err(Display))]
pub async fn send_order_confirmation_email_step(
  ctx_data: ContextData<SendOrderConfirmationEmailCtxData>,
) -> Result<PipelineControl, AppError> {
  let (recipient_email, recipient_name, order_id, total_display, sender, mailer) = {
    let guard = ctx_data.read();
    (
      guard.recipient_email.clone(),
      guard.recipient_name.clone(),
      guard.order_id,
      guard.order_total_display.clone(),
      guard.app_state.config.email_sender.clone(),
      guard.app_state.mailer.clone(),
    )
  };

  let message = EmailMessage {
    to: recipient_email.clone(),
    from: sender,
    subject: format!("Your order #{} is confirmed", order_id),
    body: format!(
      "Hi {},\n\nYour order #{} for {} has been placed.\n\nThank you for your purchase!",
      recipient_name, order_id, total_display
    ),
  };
  match mailer.send(message).await {
    Ok(sent_info) => {
      info!(%order_id, message_id = %sent_info.message_id, "Order confirmation email sent.");
      Ok(PipelineControl::Continue)
    }
    Err(e) => {
      warn!(%order_id, error = %e, "Failed to send order confirmation email.");
      Err(e)
    }
  }
}
