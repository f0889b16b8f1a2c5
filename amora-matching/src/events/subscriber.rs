use std::sync::Arc;

use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;

use amora_shared::types::event::{payloads, routing_keys, Event};

use crate::services::user_service;
use crate::AppState;

/// Listen for auth.user.registered events to create the user row and its
/// default rating.
pub async fn listen_user_registered(state: Arc<AppState>) -> anyhow::Result<()> {
    let consumer = state
        .rabbitmq
        .subscribe(
            "amora-matching.auth.user.registered",
            &[routing_keys::AUTH_USER_REGISTERED],
        )
        .await?;

    tracing::info!("listening for auth.user.registered events");

    let mut consumer = consumer;
    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                match serde_json::from_slice::<Event<payloads::UserRegistered>>(&delivery.data) {
                    Ok(event) => {
                        let data = &event.data;
                        tracing::info!(
                            user_id = %data.user_id,
                            email = %data.email,
                            "received user.registered event"
                        );

                        match user_service::create_user_with_rating(&state.db, data) {
                            Ok(user) => {
                                tracing::info!(user_id = %user.id, "user created with default rating");
                            }
                            Err(e) => {
                                tracing::error!(
                                    error = %e,
                                    user_id = %data.user_id,
                                    "failed to create user"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to deserialize user.registered event");
                    }
                }
                let _ = delivery.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "consumer error");
            }
        }
    }

    Ok(())
}
