use std::sync::Arc;
use futures_lite::StreamExt;
use lapin::options::{BasicAckOptions, BasicNackOptions};

use lingo_shared::errors::{AppError, ErrorCode};
use lingo_shared::types::event::{routing_keys, payloads, Event};

use crate::AppState;
use crate::services::profile_service;

/// Listen for auth.user.deleted events and purge the matching social account
pub async fn listen_user_deleted(state: Arc<AppState>) -> anyhow::Result<()> {
    let Some(rabbitmq) = state.events.rabbitmq() else {
        tracing::info!("event bus disabled, not listening for auth.user.deleted");
        return Ok(());
    };

    let mut consumer = rabbitmq.subscribe(
        "lingo-social.auth.user.deleted",
        &[routing_keys::AUTH_USER_DELETED],
    ).await?;

    tracing::info!("listening for auth.user.deleted events");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                let requeue = match serde_json::from_slice::<Event<payloads::UserDeleted>>(&delivery.data) {
                    Ok(event) => {
                        let user_id = event.data.user_id;
                        tracing::info!(user_id = %user_id, "received user.deleted event");

                        match profile_service::delete_account(&state, user_id).await {
                            Ok(_) => false,
                            Err(e) => {
                                let retry = is_transient(&e);
                                tracing::error!(
                                    error = %e,
                                    user_id = %user_id,
                                    retry,
                                    "failed to purge account"
                                );
                                retry
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to deserialize user.deleted event");
                        false
                    }
                };

                let settled = if requeue {
                    delivery
                        .nack(BasicNackOptions { requeue: true, ..Default::default() })
                        .await
                } else {
                    delivery.ack(BasicAckOptions::default()).await
                };
                if let Err(e) = settled {
                    tracing::warn!(error = %e, "failed to settle delivery");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "consumer error");
            }
        }
    }

    Ok(())
}

/// Failures worth redelivering: storage outages rather than bad input.
fn is_transient(err: &AppError) -> bool {
    match err {
        AppError::Database(_) | AppError::Internal(_) => true,
        AppError::Known { code, .. } => *code == ErrorCode::InternalError,
        AppError::Validation(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_are_redelivered() {
        assert!(is_transient(&AppError::Database(diesel::result::Error::BrokenTransactionManager)));
        assert!(is_transient(&AppError::internal("db pool error: timed out")));
        assert!(!is_transient(&AppError::new(ErrorCode::ProfileNotFound, "profile not found")));
        assert!(!is_transient(&AppError::Validation("bad payload".into())));
    }
}
